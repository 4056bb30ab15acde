//! Core types and trait definitions for the trust analysis pipeline
//!
//! The pipeline stages share three request-scoped types: `RawArtifact`
//! (normalized input), `ExternalSignal` (one per configured upstream), and
//! the `ClassifierUpstream` trait every external classifier adapter
//! implements for uniform parallel execution.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Normalized audio artifact
///
/// Produced once per request by the transport normalizer and owned
/// exclusively by that request. The byte sequence is immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct RawArtifact {
    bytes: Vec<u8>,
    mime: String,
    filename: Option<String>,
}

impl RawArtifact {
    /// Create a new artifact from normalized bytes
    ///
    /// Size and emptiness checks happen in the normalizer before this is
    /// called; the artifact itself is a plain immutable record.
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            filename,
        }
    }

    /// Artifact bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared or sniffed mime type (never empty)
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Original filename, if the caller supplied one
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Artifact size in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Result of one external classifier call
///
/// A failed, timed-out, or score-less upstream yields `succeeded: false`
/// with `score: None` -- never an error and never a fabricated score.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalSignal {
    /// Upstream name from configuration
    pub source: String,
    /// Whether a usable numeric score was obtained
    pub succeeded: bool,
    /// Normalized score in [0.0, 1.0] when succeeded
    pub score: Option<f64>,
    /// Raw upstream response payload for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
    /// Wall time spent on this call in milliseconds
    pub latency_ms: u64,
}

impl ExternalSignal {
    /// Build the neutral signal recorded for a failed or timed-out call
    pub fn failed(source: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            source: source.into(),
            succeeded: false,
            score: None,
            raw: None,
            latency_ms,
        }
    }
}

/// Successful classification from an upstream
#[derive(Debug, Clone)]
pub struct Classification {
    /// Score normalized into [0.0, 1.0]
    pub score: f64,
    /// Raw response payload
    pub raw: Option<serde_json::Value>,
}

/// External classifier call errors
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Transport-level failure (connect, TLS, read)
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status or malformed body
    #[error("upstream error: {0}")]
    Api(String),

    /// Response parsed but carried no extractable numeric score
    #[error("no numeric score in response")]
    NoScore,
}

/// External classifier upstream
///
/// Adapters implement this trait for uniform fan-out execution. The
/// aggregator enforces `timeout()` around every `classify` call, so
/// implementations do not need their own deadline handling.
#[async_trait::async_trait]
pub trait ClassifierUpstream: Send + Sync {
    /// Upstream name for signal provenance
    fn name(&self) -> &str;

    /// Per-call timeout enforced by the aggregator
    fn timeout(&self) -> Duration;

    /// Classify the artifact
    ///
    /// # Errors
    /// Returns `ClassifyError` on any failure; the aggregator recovers
    /// every error into a neutral signal for this source only.
    async fn classify(&self, artifact: &RawArtifact) -> Result<Classification, ClassifyError>;
}
