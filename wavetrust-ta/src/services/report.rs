//! Report assembly and sink forwarding
//!
//! Combines artifact metadata, the feature set, external signals, and the
//! trust score into one immutable result record. The content hash over the
//! exact bytes received is the stable identity of the artifact,
//! independent of filename or declared mime type.
//!
//! The optional sink forward is fire-and-forget: dispatched to a detached
//! task with its own failure domain, logged on failure, and never allowed
//! to block or affect the response returned to the caller.

use crate::services::features::FeatureSet;
use crate::services::scorer::TrustScore;
use crate::types::{ExternalSignal, RawArtifact};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;
use wavetrust_common::config::SinkConfig;
use wavetrust_common::hash;

/// Artifact metadata recorded on every report
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMetadata {
    /// SHA-256 hex digest of the exact bytes received
    pub sha256: String,
    /// Artifact size in bytes
    pub size_bytes: usize,
    /// Declared or sniffed mime type
    pub mime: String,
    /// Original filename when supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Final analysis result returned to the caller
///
/// Immutable once assembled.
#[derive(Debug, Clone, Serialize)]
pub struct TrustReport {
    /// Unique id of this analysis run
    pub report_id: Uuid,
    /// Artifact identity and transport metadata
    pub metadata: ArtifactMetadata,
    /// Locally computed heuristics
    pub features: FeatureSet,
    /// One signal per configured upstream
    pub external_signals: Vec<ExternalSignal>,
    /// Composite score with breakdown
    pub trust_score: TrustScore,
    /// Assembly timestamp
    pub processed_at: DateTime<Utc>,
}

/// Report assembler with optional sink forwarding
pub struct ReportAssembler {
    http: reqwest::Client,
    sink: Option<SinkConfig>,
}

impl ReportAssembler {
    /// Create an assembler sharing the service HTTP client
    pub fn new(http: reqwest::Client, sink: Option<SinkConfig>) -> Self {
        Self { http, sink }
    }

    /// Assemble the final report
    pub fn assemble(
        &self,
        artifact: &RawArtifact,
        features: FeatureSet,
        external_signals: Vec<ExternalSignal>,
        trust_score: TrustScore,
    ) -> TrustReport {
        TrustReport {
            report_id: Uuid::new_v4(),
            metadata: ArtifactMetadata {
                sha256: hash::sha256_hex(artifact.bytes()),
                size_bytes: artifact.size(),
                mime: artifact.mime().to_string(),
                filename: artifact.filename().map(str::to_string),
            },
            features,
            external_signals,
            trust_score,
            processed_at: Utc::now(),
        }
    }

    /// Forward a serialized copy of the report to the configured sink
    ///
    /// Returns immediately; the POST runs on a detached task. Failures are
    /// logged and swallowed.
    pub fn forward(&self, report: &TrustReport) {
        let Some(sink) = &self.sink else {
            return;
        };

        let payload = match serde_json::to_value(report) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Report serialization for sink failed");
                return;
            }
        };

        let http = self.http.clone();
        let url = sink.url.clone();
        let timeout = Duration::from_secs(sink.timeout_secs);
        let report_id = report.report_id;

        tokio::spawn(async move {
            match http.post(&url).timeout(timeout).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%report_id, "Report forwarded to sink");
                }
                Ok(response) => {
                    warn!(%report_id, status = %response.status(), "Sink rejected report");
                }
                Err(e) => {
                    warn!(%report_id, error = %e, "Sink forward failed");
                }
            }
        });
    }
}
