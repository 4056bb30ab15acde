//! Configuration loading and validation
//!
//! Configuration is resolved once at startup and never mutated afterward.
//! File path resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `WAVETRUST_TA_CONFIG` environment variable (handled by the CLI layer)
//! 3. `wavetrust-ta.toml` in the working directory
//! 4. Compiled defaults (no upstreams, no sink)
//!
//! Example `wavetrust-ta.toml`:
//!
//! ```toml
//! port = 5731
//!
//! [limits]
//! max_payload_bytes = 20971520
//! fetch_timeout_secs = 15
//!
//! [scoring]
//! external = 0.65
//! entropy = 0.25
//! heuristic = 0.10
//!
//! [[upstreams]]
//! name = "spectral-net"
//! url = "https://classifier.example.com/v1/detect"
//! shape = "probability"
//! encoding = "binary"
//! timeout_secs = 10
//!
//! [[upstreams]]
//! name = "voice-lab"
//! url = "https://api.voicelab.example.com/analyze"
//! shape = "labels"
//! encoding = "base64-json"
//! api_key = "secret"
//!
//! [sink]
//! url = "https://hooks.example.com/trust-reports"
//! timeout_secs = 5
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default HTTP port for the trust analysis service
pub const DEFAULT_PORT: u16 = 5731;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_payload_bytes() -> usize {
    20 * 1024 * 1024 // 20 MiB
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_sink_timeout_secs() -> u64 {
    5
}

/// Service configuration loaded at startup
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Payload and network limits
    #[serde(default)]
    pub limits: Limits,

    /// Composite score weighting
    #[serde(default)]
    pub scoring: ScoringWeights,

    /// External classifier upstreams (zero or more)
    #[serde(default)]
    pub upstreams: Vec<UpstreamConfig>,

    /// Optional report sink (fire-and-forget forward)
    #[serde(default)]
    pub sink: Option<SinkConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            limits: Limits::default(),
            scoring: ScoringWeights::default(),
            upstreams: Vec::new(),
            sink: None,
        }
    }
}

/// Payload and network limits
#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    /// Maximum accepted artifact size in bytes
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Timeout for fetching a remote artifact URL
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Composite score weighting
///
/// Weights are multipliers, not shares: the composite is clamped to
/// [0.0, 1.0] after summation, so they are not required to sum to 1.0.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringWeights {
    /// Weight of the strongest external classifier score
    pub external: f64,

    /// Weight of the raw byte entropy
    pub entropy: f64,

    /// Weight of the local heuristic risk (silence runs, dynamic range,
    /// encoder traces)
    pub heuristic: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            external: 0.65,
            entropy: 0.25,
            heuristic: 0.10,
        }
    }
}

/// Response shape of an external classifier
///
/// Upstreams disagree on how they report results; each configured upstream
/// declares which shape its responses follow so the score extraction can
/// stay shape-agnostic everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseShape {
    /// `{"score": 0.87, ...}`
    Score,
    /// `{"probability": 0.87, ...}`
    Probability,
    /// `{"labels": [{"label": "synthetic", "score": 0.87}, ...]}`
    Labels,
    /// Free-text transcription; carries no numeric signal
    Transcript,
}

/// How the artifact is carried in the upstream request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RequestEncoding {
    /// Raw bytes as the request body
    #[default]
    Binary,
    /// JSON body with a base64-encoded `audio` field
    Base64Json,
}

/// Configuration for one external classifier upstream
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Unique upstream name, used in signal provenance and breakdowns
    pub name: String,

    /// Endpoint URL
    pub url: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,

    /// Response shape for score extraction
    pub shape: ResponseShape,

    /// Request body encoding
    #[serde(default)]
    pub encoding: RequestEncoding,

    /// Optional bearer token
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Configuration for the optional report sink
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Endpoint URL receiving serialized trust reports
    pub url: String,

    /// Timeout for the forward request
    #[serde(default = "default_sink_timeout_secs")]
    pub timeout_secs: u64,
}

impl ServiceConfig {
    /// Validate configuration invariants
    ///
    /// Rejects non-finite or negative weights, zero limits, and malformed
    /// upstream entries. Called once at startup so the pipeline can treat
    /// configuration as trusted afterward.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("scoring.external", self.scoring.external),
            ("scoring.entropy", self.scoring.entropy),
            ("scoring.heuristic", self.scoring.heuristic),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.limits.max_payload_bytes == 0 {
            return Err(Error::Config(
                "limits.max_payload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.limits.fetch_timeout_secs == 0 {
            return Err(Error::Config(
                "limits.fetch_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for upstream in &self.upstreams {
            if upstream.name.trim().is_empty() {
                return Err(Error::Config("upstream name must not be empty".to_string()));
            }
            if !seen.insert(upstream.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate upstream name: {}",
                    upstream.name
                )));
            }
            if !upstream.url.starts_with("http://") && !upstream.url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "upstream {} has invalid URL: {}",
                    upstream.name, upstream.url
                )));
            }
            if upstream.timeout_secs == 0 {
                return Err(Error::Config(format!(
                    "upstream {} timeout_secs must be greater than zero",
                    upstream.name
                )));
            }
        }

        if let Some(sink) = &self.sink {
            if !sink.url.starts_with("http://") && !sink.url.starts_with("https://") {
                return Err(Error::Config(format!("sink has invalid URL: {}", sink.url)));
            }
            if sink.timeout_secs == 0 {
                return Err(Error::Config(
                    "sink timeout_secs must be greater than zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Load and validate the service configuration
///
/// A missing file is not an error: the service runs with compiled defaults
/// (no upstreams, no sink), which is a normal, fully supported mode.
pub fn load_service_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("wavetrust-ta.toml"));

    let config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
        let config: ServiceConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?;
        info!("Configuration loaded from {}", path.display());
        config
    } else {
        info!(
            "No config file at {}, using compiled defaults",
            path.display()
        );
        ServiceConfig::default()
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.upstreams.is_empty());
        assert!(config.sink.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            port = 6000

            [limits]
            max_payload_bytes = 1048576
            fetch_timeout_secs = 20

            [scoring]
            external = 0.7
            entropy = 0.2
            heuristic = 0.1

            [[upstreams]]
            name = "spectral-net"
            url = "https://classifier.example.com/v1/detect"
            shape = "probability"

            [[upstreams]]
            name = "voice-lab"
            url = "https://api.voicelab.example.com/analyze"
            shape = "labels"
            encoding = "base64-json"
            api_key = "secret"
            timeout_secs = 30

            [sink]
            url = "https://hooks.example.com/trust-reports"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 6000);
        assert_eq!(config.limits.max_payload_bytes, 1048576);
        assert_eq!(config.upstreams.len(), 2);
        assert_eq!(config.upstreams[0].shape, ResponseShape::Probability);
        assert_eq!(config.upstreams[0].encoding, RequestEncoding::Binary);
        assert_eq!(config.upstreams[0].timeout_secs, 10);
        assert_eq!(config.upstreams[1].encoding, RequestEncoding::Base64Json);
        assert_eq!(config.upstreams[1].timeout_secs, 30);
        assert_eq!(config.sink.as_ref().unwrap().timeout_secs, 5);
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = ServiceConfig::default();
        config.scoring.entropy = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_weight() {
        let mut config = ServiceConfig::default();
        config.scoring.external = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_upstream_names() {
        let toml = r#"
            [[upstreams]]
            name = "dup"
            url = "https://a.example.com"
            shape = "score"

            [[upstreams]]
            name = "dup"
            url = "https://b.example.com"
            shape = "score"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_upstream_url() {
        let toml = r#"
            [[upstreams]]
            name = "bad"
            url = "ftp://nope.example.com"
            shape = "score"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config =
            load_service_config(Some(Path::new("/nonexistent/wavetrust-ta.toml"))).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
