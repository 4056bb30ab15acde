//! wavetrust-ta library interface
//!
//! Exposes the pipeline stages and router for integration testing.

pub mod api;
pub mod error;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use wavetrust_common::config::ServiceConfig;

use crate::services::aggregator::SignalAggregator;
use crate::services::classifier::HttpClassifier;
use crate::services::report::ReportAssembler;
use crate::types::ClassifierUpstream;

/// Application state shared across handlers
///
/// Everything here is immutable after startup; concurrent requests share
/// nothing mutable.
#[derive(Clone)]
pub struct AppState {
    /// Validated startup configuration
    pub config: Arc<ServiceConfig>,
    /// Shared HTTP client for remote fetches, upstreams, and the sink
    pub http: reqwest::Client,
    /// External signal aggregator over configured upstreams
    pub aggregator: Arc<SignalAggregator>,
    /// Report assembler with optional sink
    pub assembler: Arc<ReportAssembler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build application state from validated configuration
    pub fn from_config(config: ServiceConfig) -> Self {
        let http = reqwest::Client::new();

        let upstreams: Vec<Arc<dyn ClassifierUpstream>> = config
            .upstreams
            .iter()
            .map(|upstream| {
                Arc::new(HttpClassifier::new(upstream.clone(), http.clone()))
                    as Arc<dyn ClassifierUpstream>
            })
            .collect();

        let aggregator = Arc::new(SignalAggregator::new(upstreams));
        let assembler = Arc::new(ReportAssembler::new(http.clone(), config.sink.clone()));

        Self {
            config: Arc::new(config),
            http,
            aggregator,
            assembler,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    // JSON transports wrap the artifact in base64 (+33%) plus envelope
    // overhead; the artifact-level ceiling is enforced by the normalizer
    let body_limit = state.config.limits.max_payload_bytes * 2 + 1024;

    Router::new()
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
