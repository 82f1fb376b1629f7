//! OAuth2 consent flow and refresh-token exchange for Google Drive.

use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::http::StatusCode;
use oauth2::{
    AsyncHttpClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, HttpClientError, HttpRequest, HttpResponse, RedirectUrl,
    RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
};

use showcase_common::{ConfigError, ProviderError, Secret};

use crate::config::Endpoints;

/// Drive scope limited to files created by this app.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Redirect URL used by the bootstrap flow when none is configured.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:5000/oauth2callback";

/// Lifetime assumed when the provider does not report one.
const DEFAULT_TOKEN_LIFETIME: std::time::Duration = std::time::Duration::from_secs(3600);

type GoogleClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Classify a non-success answer from a token endpoint.
///
/// Outages and throttling stay transient; anything else means the grant or
/// the client was rejected.
pub(crate) fn token_endpoint_error(status: u16, body: &str) -> ProviderError {
    let message = format!("Token endpoint returned {}: {}", status, body.trim());
    match status {
        429 => ProviderError::RateLimited(message),
        500..=599 => ProviderError::Api { status, message },
        _ => ProviderError::Authentication(message),
    }
}

/// Transport of the oauth2 token exchanges.
#[derive(Debug, thiserror::Error)]
enum TokenTransportError {
    #[error(transparent)]
    Http(#[from] HttpClientError<oauth2::reqwest::Error>),

    /// Answered before oauth2 tries to read it as a grant error.
    #[error("Token endpoint returned {status}")]
    Status { status: u16, body: String },
}

/// Send a token request, diverting 429 and 5xx answers away from the
/// grant-error parser.
async fn send_token_request(
    http: &oauth2::reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, TokenTransportError> {
    let response = http.call(request).await?;
    let status = response.status();

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TokenTransportError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(response.body()).into_owned(),
        });
    }

    Ok(response)
}

fn token_error(
    context: &str,
    err: RequestTokenError<TokenTransportError, BasicErrorResponse>,
) -> ProviderError {
    match err {
        RequestTokenError::Request(TokenTransportError::Status { status, body }) => {
            token_endpoint_error(status, &body)
        }
        RequestTokenError::Request(TokenTransportError::Http(e)) => {
            ProviderError::Network(format!("{}: {}", context, e))
        }
        RequestTokenError::ServerResponse(e) => {
            ProviderError::Authentication(format!("{}: {}", context, e))
        }
        RequestTokenError::Parse(e, _) => {
            ProviderError::MalformedResponse(format!("{}: {}", context, e))
        }
        RequestTokenError::Other(e) => ProviderError::Authentication(format!("{}: {}", context, e)),
    }
}

/// Access token with expiration tracking.
#[derive(Debug, Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: Secret,
    /// Refresh token, when the exchange returned one.
    pub refresh_token: Option<Secret>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    pub fn new(access_token: Secret, refresh_token: Option<Secret>, expires_in: std::time::Duration) -> Self {
        let expires_at =
            Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1));

        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Check if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        // Consider expired if less than 5 minutes remaining
        self.expires_at < Utc::now() + Duration::minutes(5)
    }
}

/// OAuth2 client settings for the delegated-consent app.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: Secret,
    /// Only needed for the consent flow; refreshing works without it.
    pub redirect_url: Option<String>,
}

/// OAuth2 manager for Google's consent and token endpoints.
pub struct AuthManager {
    client: GoogleClient,
    http: oauth2::reqwest::Client,
    config: AuthConfig,
}

impl AuthManager {
    /// Create a new authentication manager.
    ///
    /// # Errors
    /// - `ConfigError::MissingField` if the client ID or secret is empty
    /// - `ConfigError::Invalid` if an endpoint or the redirect URL is malformed
    pub fn new(config: AuthConfig, endpoints: &Endpoints) -> Result<Self, ConfigError> {
        if config.client_id.trim().is_empty() {
            return Err(ConfigError::MissingField("GOOGLE_CLIENT_ID"));
        }
        if config.client_secret.is_empty() {
            return Err(ConfigError::MissingField("GOOGLE_CLIENT_SECRET"));
        }

        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.expose().to_string()))
            .set_auth_uri(
                AuthUrl::new(endpoints.auth_url.clone())
                    .map_err(|e| ConfigError::Invalid(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(endpoints.token_url.clone())
                    .map_err(|e| ConfigError::Invalid(format!("Invalid token URL: {}", e)))?,
            );

        if let Some(redirect) = &config.redirect_url {
            client = client.set_redirect_uri(
                RedirectUrl::new(redirect.clone())
                    .map_err(|e| ConfigError::Invalid(format!("Invalid redirect URL: {}", e)))?,
            );
        }

        // Following redirects from the token endpoint would open an SSRF hole.
        let http = oauth2::reqwest::ClientBuilder::new()
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            http,
            config,
        })
    }

    /// Generate the authorization URL for the operator to visit.
    ///
    /// Returns the URL and a CSRF token that should be verified on callback.
    pub fn authorization_url(&self) -> (String, String) {
        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(DRIVE_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        (auth_url.to_string(), csrf_token.secret().clone())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    /// - `ProviderError::Authentication` if the code is rejected or no refresh
    ///   token was issued
    pub async fn exchange_code(&self, code: &str) -> Result<Tokens, ProviderError> {
        let http = |request: HttpRequest| {
            let client = self.http.clone();
            async move { send_token_request(&client, request).await }
        };
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.trim().to_string()))
            .request_async(&http)
            .await
            .map_err(|e| token_error("Token exchange failed", e))?;

        let refresh_token = token_result
            .refresh_token()
            .ok_or_else(|| {
                ProviderError::Authentication(
                    "No refresh token received. Ensure 'offline' access and 'consent' prompt were requested.".to_string(),
                )
            })?
            .secret()
            .clone();

        Ok(Tokens::new(
            Secret::new(token_result.access_token().secret().clone()),
            Some(Secret::new(refresh_token)),
            token_result.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME),
        ))
    }

    /// Mint a fresh access token from a refresh token.
    ///
    /// # Errors
    /// - `ProviderError::Authentication` if the refresh token is invalid or revoked
    /// - `ProviderError::Network` if the token endpoint is unreachable
    /// - `ProviderError::Api` / `RateLimited` if it is down or throttling
    pub async fn refresh_token(&self, refresh_token: &Secret) -> Result<Tokens, ProviderError> {
        let http = |request: HttpRequest| {
            let client = self.http.clone();
            async move { send_token_request(&client, request).await }
        };
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.expose().to_string()))
            .request_async(&http)
            .await
            .map_err(|e| token_error("Token refresh failed", e))?;

        // Google normally keeps the original refresh token.
        let refresh = token_result
            .refresh_token()
            .map(|t| Secret::new(t.secret().clone()))
            .unwrap_or_else(|| refresh_token.clone());

        Ok(Tokens::new(
            Secret::new(token_result.access_token().secret().clone()),
            Some(refresh),
            token_result.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME),
        ))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
