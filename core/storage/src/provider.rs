//! Provider seam: the remote file API and the factory that builds handles to it.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use showcase_common::{ConfigError, ProviderError};

/// Result type for calls that reach the provider.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Fields requested back from `files.create`; nothing else is returned.
pub const UPLOAD_FIELDS: &str = "id,name,webViewLink,webContentLink";

/// Metadata of a file about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFile {
    pub name: String,
    #[serde(skip)]
    pub mime_type: String,
    /// Parent folder IDs. Empty means the identity's default location.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl NewFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
        }
    }
}

/// The subset of a Drive file resource this crate asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
}

/// Remote file operations.
///
/// Implementations handle their own authentication; callers only see
/// [`ProviderError`]s.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Create a file with its content in one request.
    ///
    /// # Postconditions
    /// - Returns at least the file ID; links may be absent
    async fn create_file(&self, file: &NewFile, payload: Bytes) -> ProviderResult<DriveFile>;

    /// Delete a file permanently.
    ///
    /// # Errors
    /// - `ProviderError::NotFound` if no such file exists
    async fn delete_file(&self, file_id: &str) -> ProviderResult<()>;

    /// List up to `page_size` files visible to the identity.
    async fn list_files(&self, page_size: u32) -> ProviderResult<Vec<DriveFile>>;
}

/// Builds a fresh [`DriveApi`] handle for every operation.
pub trait ClientFactory: Send + Sync {
    type Client: DriveApi;

    /// # Errors
    /// - `ConfigError` if the configured credentials are unusable
    fn get_client(&self) -> Result<Self::Client, ConfigError>;
}
