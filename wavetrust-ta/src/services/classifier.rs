//! HTTP adapter for external classifier upstreams
//!
//! Each configured upstream gets one adapter instance. The adapter carries
//! the artifact either as a raw binary body or as a base64-wrapped JSON
//! payload, then normalizes whatever response shape the upstream speaks
//! into a single score in [0.0, 1.0].
//!
//! Inability to extract a numeric score is an error, handled identically
//! to a transport failure by the aggregator -- it must never turn into a
//! silent `score = 0` masquerading as "confirmed clean".

use crate::types::{Classification, ClassifierUpstream, ClassifyError, RawArtifact};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use std::time::Duration;
use wavetrust_common::config::{RequestEncoding, ResponseShape, UpstreamConfig};

/// Labels that mark a detection result as synthetic/manipulated
const SYNTHETIC_LABELS: &[&str] = &["synthetic", "fake", "spoof", "generated", "deepfake", "ai"];

/// HTTP classifier upstream adapter
pub struct HttpClassifier {
    config: UpstreamConfig,
    http: reqwest::Client,
}

impl HttpClassifier {
    /// Create an adapter for one configured upstream
    pub fn new(config: UpstreamConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

#[async_trait::async_trait]
impl ClassifierUpstream for HttpClassifier {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn classify(&self, artifact: &RawArtifact) -> Result<Classification, ClassifyError> {
        let mut request = match self.config.encoding {
            RequestEncoding::Binary => self
                .http
                .post(&self.config.url)
                .header(reqwest::header::CONTENT_TYPE, artifact.mime())
                .body(artifact.bytes().to_vec()),
            RequestEncoding::Base64Json => self.http.post(&self.config.url).json(&json!({
                "audio": BASE64.encode(artifact.bytes()),
                "mimetype": artifact.mime(),
                "filename": artifact.filename(),
            })),
        };

        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Api(format!("status {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Api(format!("malformed response: {}", e)))?;

        let score = extract_score(self.config.shape, &body).ok_or(ClassifyError::NoScore)?;

        Ok(Classification {
            score: score.clamp(0.0, 1.0),
            raw: Some(body),
        })
    }
}

/// Extract a numeric score from a response body per the upstream's shape
///
/// Returns `None` when the declared field is absent, non-numeric, or
/// non-finite; the caller treats that as a failed signal.
pub fn extract_score(shape: ResponseShape, body: &Value) -> Option<f64> {
    let score = match shape {
        ResponseShape::Score => body.get("score")?.as_f64()?,
        ResponseShape::Probability => body.get("probability")?.as_f64()?,
        ResponseShape::Labels => {
            let labels = body.get("labels")?.as_array()?;
            labels
                .iter()
                .filter(|entry| {
                    entry
                        .get("label")
                        .and_then(Value::as_str)
                        .map(is_synthetic_label)
                        .unwrap_or(false)
                })
                .filter_map(|entry| entry.get("score").and_then(Value::as_f64))
                .filter(|score| score.is_finite())
                .fold(None, |best: Option<f64>, score| {
                    Some(best.map_or(score, |b| b.max(score)))
                })?
        }
        // Transcription output carries no numeric signal
        ResponseShape::Transcript => return None,
    };

    score.is_finite().then_some(score)
}

fn is_synthetic_label(label: &str) -> bool {
    let label = label.to_ascii_lowercase();
    SYNTHETIC_LABELS.iter().any(|marker| label.contains(marker))
}
