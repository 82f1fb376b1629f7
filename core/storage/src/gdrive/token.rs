//! Lazily acquired, self-refreshing access tokens.

use tokio::sync::RwLock;

use showcase_common::{ConfigError, ProviderError, Secret};

use super::auth::{AuthConfig, AuthManager, Tokens};
use super::service_account::ServiceAccountSigner;
use crate::config::Endpoints;
use crate::credentials::DelegatedCredential;

/// How new access tokens are minted.
enum TokenSource {
    /// Refresh-token grant against the OAuth2 client.
    Delegated {
        auth: AuthManager,
        refresh_token: Secret,
    },
    /// JWT-bearer grant signed by a service account.
    Service {
        signer: ServiceAccountSigner,
        http: reqwest::Client,
    },
}

/// Token manager that fetches an access token on first use and refreshes it
/// when it expires.
///
/// Constructing a manager performs no network I/O.
pub struct TokenManager {
    source: TokenSource,
    tokens: RwLock<Option<Tokens>>,
}

impl TokenManager {
    /// Token manager backed by a delegated-consent refresh token.
    pub fn delegated(credential: DelegatedCredential, endpoints: &Endpoints) -> Result<Self, ConfigError> {
        let DelegatedCredential {
            client_id,
            client_secret,
            refresh_token,
        } = credential;

        let auth = AuthManager::new(
            AuthConfig {
                client_id,
                client_secret,
                redirect_url: None,
            },
            endpoints,
        )?;

        Ok(Self::with_source(TokenSource::Delegated {
            auth,
            refresh_token,
        }))
    }

    /// Token manager backed by a service account signer.
    pub fn service(signer: ServiceAccountSigner, user_agent: &str) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_source(TokenSource::Service { signer, http }))
    }

    fn with_source(source: TokenSource) -> Self {
        Self {
            source,
            tokens: RwLock::new(None),
        }
    }

    /// Name of the active strategy.
    pub fn strategy(&self) -> &'static str {
        match self.source {
            TokenSource::Delegated { .. } => "delegated",
            TokenSource::Service { .. } => "service",
        }
    }

    /// Get a valid access token, fetching or refreshing it if necessary.
    ///
    /// # Errors
    /// - `ProviderError::Authentication` if the token exchange is rejected
    /// - `ProviderError::Network` if the token endpoint is unreachable
    pub async fn get_access_token(&self) -> Result<Secret, ProviderError> {
        {
            let tokens = self.tokens.read().await;
            if let Some(tokens) = tokens.as_ref().filter(|t| !t.is_expired()) {
                return Ok(tokens.access_token.clone());
            }
        }

        let mut tokens = self.tokens.write().await;

        // Double-check after acquiring write lock
        if let Some(current) = tokens.as_ref().filter(|t| !t.is_expired()) {
            return Ok(current.access_token.clone());
        }

        tracing::debug!(strategy = self.strategy(), "Fetching access token");

        let fresh = self.fetch().await?;
        let access_token = fresh.access_token.clone();
        *tokens = Some(fresh);

        Ok(access_token)
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.tokens.write().await = None;
    }

    async fn fetch(&self) -> Result<Tokens, ProviderError> {
        match &self.source {
            TokenSource::Delegated {
                auth,
                refresh_token,
            } => auth.refresh_token(refresh_token).await,
            TokenSource::Service { signer, http } => signer.fetch_token(http).await,
        }
    }

    #[cfg(test)]
    pub(crate) async fn seed(&self, tokens: Tokens) {
        *self.tokens.write().await = Some(tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delegated_manager() -> TokenManager {
        TokenManager::delegated(
            DelegatedCredential {
                client_id: "client".to_string(),
                client_secret: Secret::new("secret"),
                refresh_token: Secret::new("refresh"),
            },
            &Endpoints::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let manager = delegated_manager();
        manager
            .seed(Tokens::new(
                Secret::new("cached-access"),
                None,
                std::time::Duration::from_secs(3600),
            ))
            .await;

        let token = manager.get_access_token().await.unwrap();
        assert_eq!(token.expose(), "cached-access");
    }

    #[tokio::test]
    async fn test_expired_token_triggers_refresh() {
        let mut endpoints = Endpoints::default();
        // Nothing listens on port 9; the refresh must be attempted and fail.
        endpoints.token_url = "http://127.0.0.1:9/token".to_string();

        let manager = TokenManager::delegated(
            DelegatedCredential {
                client_id: "client".to_string(),
                client_secret: Secret::new("secret"),
                refresh_token: Secret::new("refresh"),
            },
            &endpoints,
        )
        .unwrap();
        manager
            .seed(Tokens::new(
                Secret::new("stale"),
                None,
                std::time::Duration::from_secs(0),
            ))
            .await;

        let result = manager.get_access_token().await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let manager = delegated_manager();
        manager
            .seed(Tokens::new(
                Secret::new("cached-access"),
                None,
                std::time::Duration::from_secs(3600),
            ))
            .await;

        manager.invalidate().await;
        assert!(manager.tokens.read().await.is_none());
    }

    #[test]
    fn test_strategy_name() {
        assert_eq!(delegated_manager().strategy(), "delegated");
    }
}
