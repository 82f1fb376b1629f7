//! Streaming `multipart/related` body for Drive media uploads.
//!
//! The payload is never copied: it is handed to the transport as a sequence
//! of zero-copy [`Bytes`] views of at most [`CHUNK_SIZE`] bytes, framed by a
//! metadata part and a closing boundary.

use bytes::Bytes;
use futures::{stream, Stream};
use uuid::Uuid;

use showcase_common::ProviderError;

/// Largest slice handed to the transport per read.
pub const CHUNK_SIZE: usize = 256 * 1024; // 256KB

/// Multipart body: JSON metadata part followed by the media part.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    head: Bytes,
    payload: Bytes,
    tail: Bytes,
}

impl MultipartBody {
    /// Frame `payload` with its metadata.
    pub fn new(
        metadata: &serde_json::Value,
        mime_type: &str,
        payload: Bytes,
    ) -> Result<Self, ProviderError> {
        let boundary = format!("showcase-{}", Uuid::new_v4().simple());

        let metadata_json = serde_json::to_string(metadata).map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to serialize metadata: {}", e))
        })?;

        let head = format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
            b = boundary,
            meta = metadata_json,
            mime = mime_type,
        );
        let tail = format!("\r\n--{}--", boundary);

        Ok(Self {
            boundary,
            head: Bytes::from(head),
            payload,
            tail: Bytes::from(tail),
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }

    /// Exact number of bytes the stream will yield.
    pub fn content_length(&self) -> u64 {
        (self.head.len() + self.payload.len() + self.tail.len()) as u64
    }

    /// Pull-based stream over the framed body.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
        let parts = std::iter::once(self.head)
            .chain(PayloadChunks::new(self.payload, CHUNK_SIZE))
            .chain(std::iter::once(self.tail));

        stream::iter(parts.map(Ok))
    }
}

/// Splits a buffer into zero-copy chunks of at most `chunk_size` bytes.
struct PayloadChunks {
    remaining: Bytes,
    chunk_size: usize,
}

impl PayloadChunks {
    fn new(payload: Bytes, chunk_size: usize) -> Self {
        Self {
            remaining: payload,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Iterator for PayloadChunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining.is_empty() {
            return None;
        }
        let len = self.chunk_size.min(self.remaining.len());
        Some(self.remaining.split_to(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(body: MultipartBody) -> (Vec<Bytes>, Vec<u8>) {
        let chunks: Vec<Bytes> = body
            .into_stream()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        let joined = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        (chunks, joined)
    }

    #[tokio::test]
    async fn test_multipart_framing() {
        let metadata = serde_json::json!({ "name": "greeting.txt" });
        let body = MultipartBody::new(&metadata, "text/plain", Bytes::from_static(b"hello")).unwrap();
        let boundary = body.boundary().to_string();
        let expected_len = body.content_length();

        assert_eq!(
            body.content_type(),
            format!("multipart/related; boundary={}", boundary)
        );

        let (_, joined) = collect(body).await;
        let text = String::from_utf8(joined).unwrap();

        assert_eq!(text.len() as u64, expected_len);
        assert!(text.starts_with(&format!("--{}\r\n", boundary)));
        assert!(text.contains("{\"name\":\"greeting.txt\"}"));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(text.ends_with(&format!("--{}--", boundary)));
    }

    #[tokio::test]
    async fn test_large_payload_is_chunked_without_copy() {
        let payload = Bytes::from(vec![7u8; CHUNK_SIZE * 2 + 10]);
        let payload_ptr = payload.as_ptr();
        let metadata = serde_json::json!({ "name": "big.bin" });

        let body = MultipartBody::new(&metadata, "application/octet-stream", payload).unwrap();
        let (chunks, _) = collect(body).await;

        // head + 3 payload chunks + tail
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[1].len(), CHUNK_SIZE);
        assert_eq!(chunks[2].len(), CHUNK_SIZE);
        assert_eq!(chunks[3].len(), 10);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_SIZE.max(chunks[0].len())));
        // The first payload chunk points into the caller's buffer.
        assert_eq!(chunks[1].as_ptr(), payload_ptr);
    }

    #[test]
    fn test_boundaries_are_unique() {
        let metadata = serde_json::json!({});
        let a = MultipartBody::new(&metadata, "text/plain", Bytes::from_static(b"a")).unwrap();
        let b = MultipartBody::new(&metadata, "text/plain", Bytes::from_static(b"b")).unwrap();
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_payload_chunks_exact_multiple() {
        let chunks: Vec<Bytes> = PayloadChunks::new(Bytes::from(vec![0u8; 8]), 4).collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 4));
    }
}
