//! Google Drive backend.
//!
//! This module provides:
//! - OAuth2 consent flow and refresh-token exchange
//! - Service account JWT assertions
//! - Lazy, self-refreshing access tokens
//! - Streaming multipart uploads and idempotent deletes

pub mod auth;
pub mod client;
pub mod media;
pub mod service_account;
pub mod token;

pub use auth::{AuthConfig, AuthManager, Tokens, DRIVE_SCOPE};
pub use client::DriveClient;
pub use media::MultipartBody;
pub use service_account::ServiceAccountSigner;
pub use token::TokenManager;

/// Public download link for a Drive file.
pub fn download_link(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", file_id)
}

/// Preview page for a Drive file.
pub fn view_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", file_id)
}
