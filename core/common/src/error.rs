//! Error taxonomy for the asset storage layer.
//!
//! Errors are split by operation so callers can apply different policies:
//! an upload failure aborts the surrounding request, a delete failure is
//! downgraded to a warning.

use thiserror::Error;

/// Deployment misconfiguration. Never retryable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required credential or setting is absent or empty.
    #[error("Missing configuration field: {0}")]
    MissingField(&'static str),

    /// The service identity private key could not be parsed.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// Any other malformed configuration value (URLs, config files).
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failure reported by the remote provider or the transport in front of it.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, timeout, or body streaming failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Token exchange failed or the access token was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The identity is not allowed to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The target resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Quota or rate limit exceeded.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered with something we could not decode.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether repeating the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Upload operation failure.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Caller bug: empty payload or empty name.
    #[error("Invalid upload argument: {0}")]
    InvalidArgument(String),

    #[error("Storage is misconfigured: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Upload to provider failed: {0}")]
    ProviderFailure(#[source] ProviderError),
}

impl UploadError {
    /// Only provider-side transient failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderFailure(cause) => cause.is_transient(),
            _ => false,
        }
    }
}

/// Delete operation failure.
///
/// Callers are expected to log `ProviderFailure` and carry on rather than
/// abort the record deletion that triggered it.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("Storage is misconfigured: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Delete from provider failed: {0}")]
    ProviderFailure(#[source] ProviderError),
}

/// Connectivity probe failure.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Storage is misconfigured: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Provider check failed: {0}")]
    ProviderFailure(#[source] ProviderError),
}

/// Result alias for configuration-level operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
