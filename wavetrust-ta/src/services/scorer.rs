//! Composite trust scoring
//!
//! Deterministic weighted combination of the strongest external classifier
//! score, the raw byte entropy, and the local heuristic risk. Weights come
//! from validated startup configuration, keeping the scorer pure and
//! independently testable. The composite is clamped to [0.0, 1.0] and any
//! non-finite component contributes zero rather than propagating.

use crate::services::features::FeatureSet;
use crate::types::ExternalSignal;
use serde::Serialize;
use std::collections::BTreeMap;
use wavetrust_common::config::ScoringWeights;

/// Method tag when the external classifier contribution dominates
pub const METHOD_EXTERNAL: &str = "external-classifier";
/// Method tag when entropy/silence/dynamic-range heuristics dominate
pub const METHOD_HEURISTICS: &str = "signal-heuristics";
/// Method tag when the encoder trace contribution dominates
pub const METHOD_FINGERPRINT: &str = "encoder-fingerprint";

/// Risk contribution of repeated digital silence runs
const SILENCE_RISK: f64 = 0.5;
/// Risk contribution of an over-compressed dynamic range
const LOW_RANGE_RISK: f64 = 0.3;
/// Risk contribution of a software encoder trace
const ENCODER_TRACE_RISK: f64 = 0.2;

/// Final bounded trust/risk value with its breakdown
#[derive(Debug, Clone, Serialize)]
pub struct TrustScore {
    /// Composite score in [0.0, 1.0]; higher means more likely synthetic
    pub composite: f64,
    /// Which signal source dominated the composite
    pub method: String,
    /// Weighted contribution per signal source, plus raw per-upstream
    /// scores under `external:<name>` keys
    pub breakdown: BTreeMap<String, f64>,
}

/// Composite scorer
pub struct CompositeScorer {
    weights: ScoringWeights,
}

impl CompositeScorer {
    /// Create a scorer with the configured weights
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Merge heuristic and external signals into one bounded score
    ///
    /// The external component uses the strongest score among succeeded
    /// signals (0.0 when none succeeded, which makes the composite depend
    /// only on local heuristics). The dominant component decides the
    /// method tag; exact ties resolve external > heuristics > fingerprint,
    /// except that a zero contribution never dominates.
    pub fn score(&self, features: &FeatureSet, signals: &[ExternalSignal]) -> TrustScore {
        let strongest_external = signals
            .iter()
            .filter(|s| s.succeeded)
            .filter_map(|s| s.score)
            .filter(|s| s.is_finite())
            .fold(0.0, f64::max);

        let mut silence_range_risk = 0.0;
        if features.digital_silence_detected {
            silence_range_risk += SILENCE_RISK;
        }
        if features.low_dynamic_range() {
            silence_range_risk += LOW_RANGE_RISK;
        }
        let fingerprint_risk = if features.encoder_signature.is_some() {
            ENCODER_TRACE_RISK
        } else {
            0.0
        };

        let external_part = finite_or_zero(self.weights.external * strongest_external);
        let entropy_part = finite_or_zero(self.weights.entropy * features.entropy);
        let silence_part = finite_or_zero(self.weights.heuristic * silence_range_risk);
        let fingerprint_part = finite_or_zero(self.weights.heuristic * fingerprint_risk);

        let composite =
            (external_part + entropy_part + silence_part + fingerprint_part).clamp(0.0, 1.0);

        let heuristic_part = entropy_part + silence_part;
        let method = if external_part > 0.0
            && external_part >= heuristic_part
            && external_part >= fingerprint_part
        {
            METHOD_EXTERNAL
        } else if heuristic_part >= fingerprint_part {
            METHOD_HEURISTICS
        } else {
            METHOD_FINGERPRINT
        };

        let mut breakdown = BTreeMap::new();
        breakdown.insert("external".to_string(), external_part);
        breakdown.insert("entropy".to_string(), entropy_part);
        breakdown.insert("silence-dynamic-range".to_string(), silence_part);
        breakdown.insert("encoder-fingerprint".to_string(), fingerprint_part);
        for signal in signals {
            if let (true, Some(score)) = (signal.succeeded, signal.score) {
                breakdown.insert(format!("external:{}", signal.source), score);
            }
        }

        TrustScore {
            composite,
            method: method.to_string(),
            breakdown,
        }
    }
}

/// Guard against NaN/infinity leaking into the composite
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::features::AudioFormat;

    fn features(entropy: f64, silence: bool, dynamic_range: u8, encoder: bool) -> FeatureSet {
        FeatureSet {
            entropy,
            zero_byte_ratio: 0.0,
            digital_silence_detected: silence,
            dynamic_range,
            format: AudioFormat::Unknown,
            encoder_signature: encoder.then(|| "Lavf".to_string()),
            wav_info: None,
        }
    }

    fn signal(source: &str, score: f64) -> ExternalSignal {
        ExternalSignal {
            source: source.to_string(),
            succeeded: true,
            score: Some(score),
            raw: None,
            latency_ms: 10,
        }
    }

    #[test]
    fn test_composite_stays_in_bounds() {
        let scorer = CompositeScorer::new(ScoringWeights::default());
        let score = scorer.score(
            &features(1.0, true, 0, true),
            &[signal("a", 1.0), signal("b", 1.0)],
        );
        assert!(score.composite <= 1.0);
        assert!(score.composite >= 0.0);
    }

    #[test]
    fn test_clamped_with_oversized_weights() {
        let scorer = CompositeScorer::new(ScoringWeights {
            external: 5.0,
            entropy: 5.0,
            heuristic: 5.0,
        });
        let score = scorer.score(&features(1.0, true, 0, true), &[signal("a", 1.0)]);
        assert_eq!(score.composite, 1.0);
    }

    #[test]
    fn test_fallback_never_reports_external() {
        let scorer = CompositeScorer::new(ScoringWeights::default());

        let unconfigured = scorer.score(&features(0.8, true, 10, false), &[]);
        assert_ne!(unconfigured.method, METHOD_EXTERNAL);

        let all_failed = scorer.score(
            &features(0.8, true, 10, false),
            &[ExternalSignal::failed("a", 5), ExternalSignal::failed("b", 5)],
        );
        assert_ne!(all_failed.method, METHOD_EXTERNAL);

        // With no usable external signal the composite depends only on
        // the heuristics, so both cases agree exactly
        assert_eq!(unconfigured.composite, all_failed.composite);
    }

    #[test]
    fn test_strongest_external_wins() {
        let scorer = CompositeScorer::new(ScoringWeights::default());
        let score = scorer.score(
            &features(0.1, false, 200, false),
            &[signal("weak", 0.2), signal("strong", 0.9), signal("mid", 0.5)],
        );
        assert_eq!(score.method, METHOD_EXTERNAL);
        assert_eq!(score.breakdown["external"], 0.65 * 0.9);
        assert_eq!(score.breakdown["external:strong"], 0.9);
    }

    #[test]
    fn test_failed_signal_is_not_a_zero_score() {
        let scorer = CompositeScorer::new(ScoringWeights::default());
        let with_failed = scorer.score(
            &features(0.5, false, 200, false),
            &[ExternalSignal::failed("down", 100)],
        );
        let without = scorer.score(&features(0.5, false, 200, false), &[]);
        assert_eq!(with_failed.composite, without.composite);
        assert!(!with_failed.breakdown.contains_key("external:down"));
    }

    #[test]
    fn test_nan_entropy_contributes_zero() {
        let scorer = CompositeScorer::new(ScoringWeights::default());
        let score = scorer.score(&features(f64::NAN, false, 200, false), &[]);
        assert!(score.composite.is_finite());
        assert_eq!(score.breakdown["entropy"], 0.0);
    }

    #[test]
    fn test_tie_prefers_external() {
        // external 0.5 * 0.2 = 0.1 exactly equals entropy 0.25 * 0.4
        let scorer = CompositeScorer::new(ScoringWeights {
            external: 0.5,
            entropy: 0.25,
            heuristic: 0.1,
        });
        let score = scorer.score(&features(0.4, false, 200, false), &[signal("a", 0.2)]);
        assert_eq!(score.method, METHOD_EXTERNAL);
    }

    #[test]
    fn test_fingerprint_dominates_when_only_trace() {
        let scorer = CompositeScorer::new(ScoringWeights {
            external: 0.65,
            entropy: 0.0,
            heuristic: 0.1,
        });
        let score = scorer.score(&features(0.9, false, 200, true), &[]);
        assert_eq!(score.method, METHOD_FINGERPRINT);
    }

    #[test]
    fn test_minimal_input_scores() {
        // Single-byte artifact: entropy 0, silent heuristics only
        let scorer = CompositeScorer::new(ScoringWeights::default());
        let score = scorer.score(&features(0.0, false, 0, false), &[]);
        assert!((0.0..=1.0).contains(&score.composite));
        assert_eq!(score.method, METHOD_HEURISTICS);
    }
}
