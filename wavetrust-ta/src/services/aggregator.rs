//! External signal aggregation
//!
//! Dispatches every configured upstream call concurrently and joins on all
//! of them (fan-out/fan-in). Each call is bounded by its upstream's timeout;
//! a timeout or error on one upstream cancels that call only and degrades
//! it to a neutral signal, never affecting siblings or the request.
//!
//! Zero configured upstreams is a normal, fully supported mode: the
//! aggregator returns an empty signal set immediately.

use crate::types::{ClassifierUpstream, ExternalSignal, RawArtifact};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Parallel signal aggregator over configured upstreams
pub struct SignalAggregator {
    upstreams: Vec<Arc<dyn ClassifierUpstream>>,
}

impl SignalAggregator {
    /// Create an aggregator over the given upstreams
    pub fn new(upstreams: Vec<Arc<dyn ClassifierUpstream>>) -> Self {
        Self { upstreams }
    }

    /// Number of configured upstreams
    pub fn count(&self) -> usize {
        self.upstreams.len()
    }

    /// Collect one signal per upstream, concurrently
    ///
    /// Waits for every call to settle (success, error, or timeout) before
    /// returning; no partial aggregation is observable to the caller.
    /// Results preserve upstream configuration order.
    pub async fn collect(&self, artifact: &RawArtifact) -> Vec<ExternalSignal> {
        let calls = self.upstreams.iter().map(|upstream| {
            let upstream = Arc::clone(upstream);
            async move {
                let started = Instant::now();
                let outcome =
                    tokio::time::timeout(upstream.timeout(), upstream.classify(artifact)).await;
                let latency_ms = started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(Ok(classification)) => {
                        debug!(
                            upstream = upstream.name(),
                            score = classification.score,
                            latency_ms,
                            "External classification succeeded"
                        );
                        ExternalSignal {
                            source: upstream.name().to_string(),
                            succeeded: true,
                            score: Some(classification.score),
                            raw: classification.raw,
                            latency_ms,
                        }
                    }
                    Ok(Err(e)) => {
                        warn!(
                            upstream = upstream.name(),
                            error = %e,
                            latency_ms,
                            "External classification failed (isolated to this source)"
                        );
                        ExternalSignal::failed(upstream.name(), latency_ms)
                    }
                    Err(_) => {
                        warn!(
                            upstream = upstream.name(),
                            latency_ms,
                            "External classification timed out"
                        );
                        ExternalSignal::failed(upstream.name(), latency_ms)
                    }
                }
            }
        });

        join_all(calls).await
    }
}
