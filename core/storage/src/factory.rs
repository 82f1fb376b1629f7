//! Storage client factory.

use std::sync::Arc;

use showcase_common::ConfigError;

use crate::config::StorageConfig;
use crate::credentials::CredentialProvider;
use crate::gdrive::DriveClient;
use crate::provider::ClientFactory;

/// Builds a new [`DriveClient`] on every call.
///
/// Nothing is memoized, so a handle can never outlive the credentials it was
/// built from. Building one is cheap next to the request that follows.
#[derive(Debug, Clone)]
pub struct DriveClientFactory {
    provider: CredentialProvider,
}

impl DriveClientFactory {
    pub fn new(config: Arc<StorageConfig>) -> Self {
        Self {
            provider: CredentialProvider::new(config),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        self.provider.config()
    }
}

impl ClientFactory for DriveClientFactory {
    type Client = DriveClient;

    fn get_client(&self) -> Result<DriveClient, ConfigError> {
        self.provider.acquire_client()
    }
}
