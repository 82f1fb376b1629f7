//! Upload and delete operations exposed to the CRUD handlers.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

use showcase_common::{
    AssetDescriptor, CheckError, DeleteError, ProviderError, UploadError, UploadRequest,
};

use crate::config::StorageConfig;
use crate::factory::DriveClientFactory;
use crate::gdrive;
use crate::provider::{ClientFactory, DriveApi, DriveFile, NewFile};

/// Stateless asset storage.
///
/// Every operation asks the factory for a fresh client, so concurrent calls
/// share nothing but the provider's own rate limits.
pub struct AssetStorage<F = DriveClientFactory> {
    factory: F,
    folder_id: Option<String>,
}

impl AssetStorage<DriveClientFactory> {
    /// Storage backed by Google Drive with the given configuration.
    pub fn from_config(config: StorageConfig) -> Self {
        let folder_id = config.folder_id.clone();
        Self::new(DriveClientFactory::new(Arc::new(config)), folder_id)
    }
}

impl<F: ClientFactory> AssetStorage<F> {
    pub fn new(factory: F, folder_id: Option<String>) -> Self {
        Self {
            factory,
            folder_id: folder_id.filter(|f| !f.trim().is_empty()),
        }
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref()
    }

    /// Upload a payload and return its descriptor.
    ///
    /// # Preconditions
    /// - `payload` and `name` are non-empty
    ///
    /// # Errors
    /// - `UploadError::InvalidArgument` before any provider contact
    /// - `UploadError::Configuration` if no client can be built
    /// - `UploadError::ProviderFailure` for anything the provider reports
    pub async fn upload(
        &self,
        payload: impl Into<Bytes>,
        name: &str,
        mime_type: &str,
    ) -> Result<AssetDescriptor, UploadError> {
        let request = UploadRequest::new(payload, name, mime_type)?;
        self.upload_request(request).await
    }

    /// Upload an already validated request.
    pub async fn upload_request(
        &self,
        request: UploadRequest,
    ) -> Result<AssetDescriptor, UploadError> {
        let client = self.factory.get_client()?;

        let (payload, name, mime_type) = request.into_parts();
        let size = payload.len();
        let file = NewFile::new(name, mime_type, self.folder_id.as_deref());

        let created = client
            .create_file(&file, payload)
            .await
            .map_err(UploadError::ProviderFailure)?;
        let descriptor = to_descriptor(created, &file.name).map_err(UploadError::ProviderFailure)?;

        info!(id = %descriptor.id, name = %descriptor.name, bytes = size, "Uploaded asset");
        Ok(descriptor)
    }

    /// Delete an asset. Deleting nothing, or something already gone, succeeds.
    ///
    /// # Errors
    /// - `DeleteError::Configuration` if no client can be built
    /// - `DeleteError::ProviderFailure` for provider failures other than not-found
    pub async fn remove(&self, asset_id: Option<&str>) -> Result<(), DeleteError> {
        let Some(asset_id) = asset_id.filter(|id| !id.trim().is_empty()) else {
            return Ok(());
        };

        let client = self.factory.get_client()?;

        match client.delete_file(asset_id).await {
            Ok(()) => {
                info!(id = %asset_id, "Deleted asset");
                Ok(())
            }
            Err(ProviderError::NotFound(_)) => {
                tracing::debug!(id = %asset_id, "Asset already absent");
                Ok(())
            }
            Err(e) => Err(DeleteError::ProviderFailure(e)),
        }
    }

    /// Delete an asset as a cleanup step that must not fail the caller.
    ///
    /// Failures are logged as warnings. Returns whether the asset is known to
    /// be gone.
    pub async fn remove_best_effort(&self, asset_id: Option<&str>) -> bool {
        match self.remove(asset_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(id = asset_id.unwrap_or_default(), error = %e, "Failed to delete asset from storage");
                false
            }
        }
    }

    /// Prove the credentials work by listing at most one file.
    pub async fn check(&self) -> Result<Vec<DriveFile>, CheckError> {
        let client = self.factory.get_client()?;
        client.list_files(1).await.map_err(CheckError::ProviderFailure)
    }
}

/// Normalize a created file into a descriptor, synthesizing missing links.
pub fn to_descriptor(file: DriveFile, fallback_name: &str) -> Result<AssetDescriptor, ProviderError> {
    let id = file.id.trim().to_string();
    if id.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "Provider returned a file without an ID".to_string(),
        ));
    }

    let name = if file.name.is_empty() {
        fallback_name.to_string()
    } else {
        file.name
    };
    let non_empty = |link: Option<String>| link.filter(|l| !l.trim().is_empty());

    Ok(AssetDescriptor {
        view_link: non_empty(file.web_view_link).unwrap_or_else(|| gdrive::view_link(&id)),
        download_link: non_empty(file.web_content_link)
            .unwrap_or_else(|| gdrive::download_link(&id)),
        name,
        id,
    })
}
