//! Storage configuration.
//!
//! The configuration is assembled once at process start, from environment
//! variables or a JSON file, and passed explicitly to the storage layer.

use serde::Deserialize;
use std::path::Path;

use showcase_common::{ConfigError, Result, Secret};

use crate::credentials::ServiceCredential;

/// OAuth2 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Google Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const DEFAULT_USER_AGENT: &str = concat!("showcase-storage/", env!("CARGO_PKG_VERSION"));

/// Remote endpoints used by the Drive client and the token exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
    pub upload_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }
}

/// Raw credential fields as found in configuration.
///
/// Every field is optional here; [`CredentialSource::resolve`] decides which
/// strategy is active and validates it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialSource {
    /// OAuth2 client ID of the delegated-consent app.
    pub client_id: Option<String>,
    /// OAuth2 client secret of the delegated-consent app.
    pub client_secret: Option<Secret>,
    /// Long-lived refresh token minted with the bootstrap tool.
    pub refresh_token: Option<Secret>,

    pub project_id: Option<String>,
    /// Service account email, used as the JWT issuer.
    pub client_email: Option<String>,
    /// PEM private key; literal `\n` sequences are accepted.
    pub private_key: Option<Secret>,
    pub private_key_id: Option<String>,
    pub service_client_id: Option<String>,
    pub cert_url: Option<String>,
}

impl CredentialSource {
    /// Fill the service identity fields from a service account key, keeping
    /// any value that is already set.
    pub fn merge_service_key(&mut self, key: ServiceCredential) {
        let ServiceCredential {
            project_id,
            client_email,
            private_key,
            private_key_id,
            client_id,
            cert_url,
        } = key;

        if self.client_email.is_none() {
            self.client_email = Some(client_email);
        }
        if self.private_key.is_none() {
            self.private_key = Some(private_key);
        }
        self.project_id = self.project_id.take().or(project_id);
        self.private_key_id = self.private_key_id.take().or(private_key_id);
        self.service_client_id = self.service_client_id.take().or(client_id);
        self.cert_url = self.cert_url.take().or(cert_url);
    }
}

/// Complete storage layer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub credentials: CredentialSource,
    /// Drive folder new assets are created in. `None` uses the identity's
    /// default location.
    pub folder_id: Option<String>,
    pub endpoints: Endpoints,
    pub user_agent: Option<String>,
}

impl StorageConfig {
    /// Build the configuration from process environment variables.
    ///
    /// # Errors
    /// - `GOOGLE_APPLICATION_CREDENTIALS` points at an unreadable or invalid key file
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut credentials = CredentialSource {
            client_id: var("GOOGLE_CLIENT_ID"),
            client_secret: var("GOOGLE_CLIENT_SECRET").map(Secret::from),
            refresh_token: var("GOOGLE_REFRESH_TOKEN").map(Secret::from),
            project_id: var("GOOGLE_PROJECT_ID"),
            client_email: var("GOOGLE_CLIENT_EMAIL"),
            private_key: var("GOOGLE_PRIVATE_KEY").map(Secret::from),
            private_key_id: var("GOOGLE_PRIVATE_KEY_ID"),
            service_client_id: var("GOOGLE_SERVICE_CLIENT_ID"),
            cert_url: var("GOOGLE_CLIENT_CERT_URL"),
        };

        if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            credentials.merge_service_key(ServiceCredential::from_key_file(&path)?);
        }

        Ok(Self {
            credentials,
            folder_id: var("GOOGLE_DRIVE_FOLDER_ID"),
            endpoints: Endpoints::default(),
            user_agent: None,
        })
    }

    /// Load the configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json(&raw)
    }

    /// Parse the configuration from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw)
            .map_err(|e| ConfigError::Invalid(format!("Invalid storage config: {}", e)))?;

        if config.folder_id.as_deref().is_some_and(|f| f.trim().is_empty()) {
            config.folder_id = None;
        }

        Ok(config)
    }

    /// Set the parent folder for new assets.
    pub fn with_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}
