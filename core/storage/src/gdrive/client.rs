//! Google Drive API client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Body, Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use showcase_common::{ConfigError, ProviderError};

use super::media::MultipartBody;
use super::token::TokenManager;
use crate::config::Endpoints;
use crate::provider::{DriveApi, DriveFile, NewFile, ProviderResult, UPLOAD_FIELDS};

/// Response from listing files.
#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

/// Google Drive API client.
///
/// Cheap to build: no request is made until an operation is called.
pub struct DriveClient {
    http: Client,
    token_manager: Arc<TokenManager>,
    api_base: Url,
    upload_base: Url,
}

fn parse_base(raw: &str, name: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::Invalid(format!("Invalid {} '{}': {}", name, raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Invalid(format!("Invalid {} '{}'", name, raw)));
    }
    Ok(url)
}

impl DriveClient {
    /// Create a new Drive client.
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if an endpoint is malformed or the HTTP client
    ///   cannot be built
    pub fn new(
        token_manager: Arc<TokenManager>,
        endpoints: &Endpoints,
        user_agent: &str,
    ) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            token_manager,
            api_base: parse_base(&endpoints.api_base, "API base URL")?,
            upload_base: parse_base(&endpoints.upload_base, "upload base URL")?,
        })
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    /// Build `{base}/files[/{id}]` with the ID percent-encoded as a path segment.
    fn files_url(base: &Url, file_id: Option<&str>) -> Url {
        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("files");
            if let Some(id) = file_id {
                segments.push(id);
            }
        }
        url
    }

    /// Get authorization header.
    async fn auth_header(&self) -> ProviderResult<String> {
        let token = self.token_manager.get_access_token().await?;
        Ok(format!("Bearer {}", token.expose()))
    }

    /// Map a non-success response onto the error taxonomy.
    async fn error_from(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let (message, reasons) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (
                envelope.error.message,
                envelope
                    .error
                    .errors
                    .into_iter()
                    .map(|e| e.reason)
                    .collect::<Vec<_>>(),
            ),
            Err(_) => (body, Vec::new()),
        };

        let rate_limited = reasons
            .iter()
            .any(|r| r == "rateLimitExceeded" || r == "userRateLimitExceeded");

        match status {
            StatusCode::NOT_FOUND => ProviderError::NotFound(message),
            StatusCode::UNAUTHORIZED => {
                // A rejected token is useless; fetch a new one next time.
                self.token_manager.invalidate().await;
                ProviderError::Authentication(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
            StatusCode::FORBIDDEN if rate_limited => ProviderError::RateLimited(message),
            StatusCode::FORBIDDEN => ProviderError::PermissionDenied(message),
            _ => ProviderError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Decode a successful response, or map the failure.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ProviderResult<T> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))
        } else {
            Err(self.error_from(response).await)
        }
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn create_file(&self, file: &NewFile, payload: Bytes) -> ProviderResult<DriveFile> {
        let url = Self::files_url(&self.upload_base, None);
        let auth = self.auth_header().await?;

        let metadata = serde_json::to_value(file)
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to serialize metadata: {}", e)))?;
        let body = MultipartBody::new(&metadata, &file.mime_type, payload)?;

        tracing::debug!(
            name = %file.name,
            bytes = body.content_length(),
            "Uploading file to Drive"
        );

        let response = self
            .http
            .post(url)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, body.content_type())
            .header(header::CONTENT_LENGTH, body.content_length())
            .query(&[
                ("uploadType", "multipart"),
                ("fields", UPLOAD_FIELDS),
                ("supportsAllDrives", "true"),
            ])
            .body(Body::wrap_stream(body.into_stream()))
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to upload file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn delete_file(&self, file_id: &str) -> ProviderResult<()> {
        let url = Self::files_url(&self.api_base, Some(file_id));
        let auth = self.auth_header().await?;

        let response = self
            .http
            .delete(url)
            .header(header::AUTHORIZATION, auth)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to delete file: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.error_from(response).await)
        }
    }

    async fn list_files(&self, page_size: u32) -> ProviderResult<Vec<DriveFile>> {
        let url = Self::files_url(&self.api_base, None);
        let auth = self.auth_header().await?;
        let page_size = page_size.clamp(1, 1000).to_string();

        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, auth)
            .query(&[
                ("pageSize", page_size.as_str()),
                ("fields", "files(id,name,webViewLink,webContentLink)"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to list files: {}", e)))?;

        let list: FileListResponse = self.handle_response(response).await?;
        Ok(list.files)
    }
}
