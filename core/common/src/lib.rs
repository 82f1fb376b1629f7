//! Common types shared by the showcase asset storage crates.
//!
//! This crate holds the error taxonomy and the value types that cross the
//! boundary between the storage layer and the CRUD handlers that call it.

pub mod error;
pub mod types;

pub use error::{CheckError, ConfigError, DeleteError, ProviderError, Result, UploadError};
pub use types::{AssetDescriptor, Secret, UploadRequest};
