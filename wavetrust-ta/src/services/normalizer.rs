//! Transport normalization
//!
//! Turns one of several input encodings into a single normalized
//! `RawArtifact`: a structured payload carrying a base64 blob, a structured
//! payload carrying a remote URL, or a raw byte stream. Whatever the
//! transport, the rest of the pipeline only ever sees the artifact.
//!
//! The size ceiling is evaluated exactly once, after the full artifact is
//! materialized; remote fetches additionally enforce the ceiling
//! incrementally while streaming so an oversized transfer is aborted
//! mid-flight instead of buffered to completion.

use crate::types::RawArtifact;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use wavetrust_common::config::Limits;

/// Transport normalization errors
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Malformed base64 in the structured payload
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Neither blob nor url supplied
    #[error("no data source")]
    NoSource,

    /// Decoded or received payload was empty
    #[error("empty payload")]
    EmptyPayload,

    /// Remote URL could not be fetched
    #[error("remote fetch failed: {0}")]
    FetchFailed(String),

    /// Remote transfer exceeded the byte ceiling mid-stream
    #[error("remote payload too large")]
    RemoteTooLarge,

    /// Materialized artifact exceeds the configured maximum
    #[error("payload too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },
}

/// Structured analyze request body
///
/// Exactly one data source is required. When both are supplied the inline
/// blob wins and the URL is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64-encoded audio bytes
    pub blob: Option<String>,
    /// Remote URL to fetch the audio from
    pub url: Option<String>,
    /// Original filename, echoed into report metadata
    pub filename: Option<String>,
    /// Declared mime type; sniffed from magic bytes when absent
    pub mimetype: Option<String>,
}

/// Transport normalizer
pub struct TransportNormalizer {
    http: reqwest::Client,
    limits: Limits,
}

impl TransportNormalizer {
    /// Create a normalizer sharing the service HTTP client
    pub fn new(http: reqwest::Client, limits: Limits) -> Self {
        Self { http, limits }
    }

    /// Normalize a structured payload (base64 blob or remote URL)
    pub async fn from_request(&self, request: AnalyzeRequest) -> Result<RawArtifact, NormalizeError> {
        let bytes = match (&request.blob, &request.url) {
            (Some(blob), _) => BASE64
                .decode(blob.trim())
                .map_err(|e| NormalizeError::InvalidEncoding(e.to_string()))?,
            (None, Some(url)) => self.fetch_remote(url).await?,
            (None, None) => return Err(NormalizeError::NoSource),
        };

        self.finalize(bytes, request.mimetype, request.filename)
    }

    /// Normalize a raw byte body
    ///
    /// An audio-tagged content type is taken as the declared mime; anything
    /// else falls back to magic-byte sniffing.
    pub fn from_raw_body(
        &self,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<RawArtifact, NormalizeError> {
        let declared = content_type
            .filter(|ct| ct.starts_with("audio/"))
            .map(str::to_string);
        self.finalize(bytes, declared, None)
    }

    /// Fetch a remote artifact with a bounded timeout and streaming cap
    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, NormalizeError> {
        let deadline = Duration::from_secs(self.limits.fetch_timeout_secs);
        match tokio::time::timeout(deadline, self.fetch_remote_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(NormalizeError::FetchFailed(format!(
                "timed out after {}s",
                self.limits.fetch_timeout_secs
            ))),
        }
    }

    async fn fetch_remote_inner(&self, url: &str) -> Result<Vec<u8>, NormalizeError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| NormalizeError::FetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NormalizeError::FetchFailed(format!("status {}", status)));
        }

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| NormalizeError::FetchFailed(e.to_string()))?;
            if bytes.len() + chunk.len() > self.limits.max_payload_bytes {
                // Abort mid-transfer once the ceiling is exceeded
                return Err(NormalizeError::RemoteTooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(url, size = bytes.len(), "Remote artifact fetched");
        Ok(bytes)
    }

    /// Apply the emptiness and size checks shared by all transports and
    /// resolve the final mime type
    fn finalize(
        &self,
        bytes: Vec<u8>,
        declared_mime: Option<String>,
        filename: Option<String>,
    ) -> Result<RawArtifact, NormalizeError> {
        if bytes.is_empty() {
            return Err(NormalizeError::EmptyPayload);
        }
        if bytes.len() > self.limits.max_payload_bytes {
            return Err(NormalizeError::TooLarge {
                size: bytes.len(),
                limit: self.limits.max_payload_bytes,
            });
        }

        let mime = declared_mime
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| sniff_mime(&bytes));

        Ok(RawArtifact::new(bytes, mime, filename))
    }
}

/// Infer a mime type from leading magic bytes
fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
