//! Types shared between the storage layer and its callers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::UploadError;

/// Normalized result of a successful upload.
///
/// `id` is the only field needed to delete the asset later; callers persist
/// it next to the record that owns the asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    /// Provider-assigned identifier.
    pub id: String,
    /// Name the asset was stored under.
    pub name: String,
    /// Link to the provider's preview page.
    pub view_link: String,
    /// Direct download link.
    pub download_link: String,
}

/// A validated upload: non-empty payload and non-empty name.
#[derive(Clone)]
pub struct UploadRequest {
    payload: Bytes,
    name: String,
    mime_type: String,
}

impl UploadRequest {
    /// Build an upload request.
    ///
    /// # Errors
    /// - `UploadError::InvalidArgument` if `payload` or `name` is empty, or
    ///   `mime_type` contains control characters
    pub fn new(
        payload: impl Into<Bytes>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Result<Self, UploadError> {
        let payload = payload.into();
        let name = name.into();

        if payload.is_empty() {
            return Err(UploadError::InvalidArgument(
                "File payload is empty".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(UploadError::InvalidArgument(
                "File name is required".to_string(),
            ));
        }

        let mime_type = mime_type.into();
        // Written verbatim into a multipart part header.
        if mime_type.chars().any(char::is_control) {
            return Err(UploadError::InvalidArgument(
                "MIME type contains control characters".to_string(),
            ));
        }
        let mime_type = if mime_type.trim().is_empty() {
            "application/octet-stream".to_string()
        } else {
            mime_type
        };

        Ok(Self {
            payload,
            name,
            mime_type,
        })
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Split into parts without copying the payload.
    pub fn into_parts(self) -> (Bytes, String, String) {
        (self.payload, self.name, self.mime_type)
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("payload", &format_args!("[{} bytes]", self.payload.len()))
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Credential material that must never be logged.
///
/// `Debug` and `Display` are redacted and the contents are zeroized on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw secret. Keep the borrow short.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_rejects_empty_payload() {
        let result = UploadRequest::new(Vec::new(), "x.png", "image/png");
        assert!(matches!(result, Err(UploadError::InvalidArgument(_))));
    }

    #[test]
    fn test_upload_request_rejects_empty_name() {
        let result = UploadRequest::new(b"data".to_vec(), "", "image/png");
        assert!(matches!(result, Err(UploadError::InvalidArgument(_))));

        let result = UploadRequest::new(b"data".to_vec(), "   ", "image/png");
        assert!(matches!(result, Err(UploadError::InvalidArgument(_))));
    }

    #[test]
    fn test_upload_request_defaults_mime_type() {
        let request = UploadRequest::new(b"data".to_vec(), "blob", "").unwrap();
        assert_eq!(request.mime_type(), "application/octet-stream");
        assert_eq!(request.payload().len(), 4);
    }

    #[test]
    fn test_upload_request_rejects_header_breaking_mime_type() {
        for mime in [
            "text/plain\r\n\r\nINJECTED\r\n--fake",
            "image/png\nX-Extra: 1",
            "text/plain\0",
        ] {
            let result = UploadRequest::new(b"x".to_vec(), "a.txt", mime);
            assert!(matches!(result, Err(UploadError::InvalidArgument(_))), "{:?}", mime);
        }

        let request =
            UploadRequest::new(b"x".to_vec(), "a.txt", "text/plain; charset=utf-8").unwrap();
        assert_eq!(request.mime_type(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_upload_request_debug_hides_payload() {
        let request = UploadRequest::new(b"top secret".to_vec(), "a.txt", "text/plain").unwrap();
        let debug = format!("{:?}", request);
        assert!(debug.contains("[10 bytes]"));
        assert!(!debug.contains("top secret"));
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("1//refresh-token");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert!(!format!("{:?}", secret).contains("refresh"));
        assert_eq!(secret.expose(), "1//refresh-token");
    }

    #[test]
    fn test_secret_deserializes_transparently() {
        let secret: Secret = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(secret.expose(), "abc");
        assert!(!secret.is_empty());
        assert!(Secret::new("  ").is_empty());
    }

    #[test]
    fn test_descriptor_uses_camel_case() {
        let descriptor = AssetDescriptor {
            id: "abc123".to_string(),
            name: "logo.png".to_string(),
            view_link: "https://drive.google.com/file/d/abc123/view".to_string(),
            download_link: "https://drive.google.com/uc?export=download&id=abc123".to_string(),
        };

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["viewLink"], descriptor.view_link);
        assert_eq!(json["downloadLink"], descriptor.download_link);
    }
}
