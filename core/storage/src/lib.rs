//! Asset storage for the showcase backend, persisted in Google Drive.
//!
//! CRUD handlers call [`AssetStorage::upload`] before persisting a record
//! that references an asset, and [`AssetStorage::remove`] (or
//! [`AssetStorage::remove_best_effort`]) when the asset is replaced or its
//! record deleted.
//!
//! # Design Principles
//! - One credential strategy per deployment, chosen at client construction
//! - Stateless: a fresh client per operation, no bookkeeping of assets
//! - Streaming uploads over the caller's buffer, no intermediate copies
//! - Idempotent deletes: deleting nothing or something already gone succeeds

pub mod config;
pub mod credentials;
pub mod factory;
pub mod gdrive;
pub mod memory;
pub mod provider;
pub mod retry;
pub mod storage;

pub use config::{CredentialSource, Endpoints, StorageConfig};
pub use credentials::{
    normalize_private_key, CredentialConfig, CredentialProvider, DelegatedCredential,
    ServiceCredential,
};
pub use factory::DriveClientFactory;
pub use memory::MemoryDrive;
pub use provider::{ClientFactory, DriveApi, DriveFile, NewFile};
pub use retry::UploadRetry;
pub use storage::AssetStorage;

pub use showcase_common::{
    AssetDescriptor, CheckError, ConfigError, DeleteError, ProviderError, Secret, UploadError,
    UploadRequest,
};
