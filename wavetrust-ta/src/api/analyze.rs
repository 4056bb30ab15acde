//! Analysis API handler
//!
//! POST /analyze accepts either a structured JSON payload (base64 blob or
//! remote URL) or a raw byte body tagged with an audio-like content type.
//! The handler runs the full pipeline and returns the assembled report;
//! scoring either completes fully (accepting degraded external signals) or
//! the request fails before scoring starts.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::features::FeatureSet;
use crate::services::normalizer::{AnalyzeRequest, TransportNormalizer};
use crate::services::report::TrustReport;
use crate::services::scorer::CompositeScorer;
use crate::AppState;

/// POST /analyze response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: TrustReport,
}

/// POST /analyze
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AnalyzeResponse>> {
    let started = Instant::now();

    let normalizer = TransportNormalizer::new(state.http.clone(), state.config.limits.clone());
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let artifact = if content_type.starts_with("application/json") {
        let request: AnalyzeRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
        normalizer.from_request(request).await?
    } else {
        let declared = (!content_type.is_empty()).then_some(content_type);
        normalizer.from_raw_body(body.to_vec(), declared)?
    };

    let features = FeatureSet::extract(artifact.bytes());
    let external_signals = state.aggregator.collect(&artifact).await;
    let trust_score =
        CompositeScorer::new(state.config.scoring.clone()).score(&features, &external_signals);

    let report = state
        .assembler
        .assemble(&artifact, features, external_signals, trust_score);
    state.assembler.forward(&report);

    info!(
        sha256 = %report.metadata.sha256,
        size = report.metadata.size_bytes,
        composite = report.trust_score.composite,
        method = %report.trust_score.method,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis complete"
    );

    Ok(Json(AnalyzeResponse { ok: true, report }))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}
