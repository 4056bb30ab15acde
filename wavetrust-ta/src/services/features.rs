//! Byte-level heuristic feature extraction
//!
//! Pure function over artifact bytes: deterministic, CPU-only, no I/O and
//! no shared state. For identical input bytes the output is bit-identical
//! across invocations, which is the primary property the test suite checks.
//!
//! The heuristics target traces synthetic audio tends to leave behind:
//! unnaturally perfect silence runs that a microphone noise floor never
//! produces, over-compressed dynamic range, and textual encoder signatures
//! indicating the file passed through a generic transcoding tool rather
//! than a hardware capture pipeline.

use serde::{Deserialize, Serialize};

/// Stride between sampled bytes for the silence and dynamic range scans
const SAMPLE_STRIDE: usize = 16;

/// Consecutive flat samples that complete one silence segment
const FLAT_RUN_SAMPLES: usize = 64;

/// Completed silence segments required to flag digital silence
const SILENCE_SEGMENTS: usize = 3;

/// Dynamic range below this indicates over-compression
const LOW_DYNAMIC_RANGE: u8 = 30;

/// Leading bytes scanned for textual encoder traces
const ENCODER_SCAN_WINDOW: usize = 512;

/// Known software muxer/encoder signatures
///
/// Presence is a medium-weight risk signal, not a certainty: plenty of
/// legitimate files pass through ffmpeg too.
const ENCODER_TRACES: &[&str] = &["Lavf", "Lavc", "LAME", "libsndfile", "SoX"];

/// Container format guessed from leading magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Unknown,
}

/// Structured WAV header fields
///
/// Decoded directly from the canonical 44-byte RIFF layout. Malformed or
/// truncated headers degrade to `None` on the feature set, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavInfo {
    /// Channel count from the fmt chunk
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Byte rate (bytes per second of audio)
    pub byte_rate: u32,
    /// Duration derived as data chunk size / byte rate
    pub duration_seconds: f64,
}

/// Derived, read-only heuristic record
///
/// Computed once from the artifact bytes and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Shannon entropy over the byte histogram, normalized to [0.0, 1.0]
    pub entropy: f64,

    /// Fraction of bytes equal to zero, in [0.0, 1.0]
    pub zero_byte_ratio: f64,

    /// Whether repeated perfectly-flat runs were found in the sampled bytes
    pub digital_silence_detected: bool,

    /// max(byte) - min(byte) over the sampled bytes
    pub dynamic_range: u8,

    /// Container format guess from magic bytes
    pub format: AudioFormat,

    /// Matched encoder/muxer signature, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder_signature: Option<String>,

    /// Structured WAV header fields when the format is WAV
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wav_info: Option<WavInfo>,
}

impl FeatureSet {
    /// Extract all heuristic features from artifact bytes
    pub fn extract(bytes: &[u8]) -> Self {
        let format = detect_format(bytes);
        let (digital_silence_detected, dynamic_range) = scan_sampled(bytes);

        Self {
            entropy: round3(normalized_entropy(bytes)),
            zero_byte_ratio: round3(zero_byte_ratio(bytes)),
            digital_silence_detected,
            dynamic_range,
            format,
            encoder_signature: find_encoder_trace(bytes),
            wav_info: if format == AudioFormat::Wav {
                parse_wav_header(bytes)
            } else {
                None
            },
        }
    }

    /// Whether the dynamic range indicates over-compression
    pub fn low_dynamic_range(&self) -> bool {
        self.dynamic_range < LOW_DYNAMIC_RANGE
    }
}

/// Shannon entropy over the 256-bucket byte histogram, divided by 8
/// (the maximum possible per-byte entropy)
///
/// Defined as 0.0 for an empty buffer.
fn normalized_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }

    let mut histogram = [0u64; 256];
    for &b in bytes {
        histogram[b as usize] += 1;
    }

    let total = bytes.len() as f64;
    let mut entropy = 0.0;
    for &count in &histogram {
        if count > 0 {
            let p = count as f64 / total;
            entropy -= p * p.log2();
        }
    }

    entropy / 8.0
}

/// Fraction of bytes equal to zero
fn zero_byte_ratio(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let zeros = bytes.iter().filter(|&&b| b == 0).count();
    zeros as f64 / bytes.len() as f64
}

/// Strided scan producing silence detection and dynamic range together
///
/// Samples every `SAMPLE_STRIDE`th byte. A run of `FLAT_RUN_SAMPLES`
/// consecutive flat values (0x00 for unsigned PCM silence, 0x80 for the
/// signed convention) completes one silence segment; `SILENCE_SEGMENTS`
/// completed segments flag the artifact.
fn scan_sampled(bytes: &[u8]) -> (bool, u8) {
    let mut run = 0usize;
    let mut segments = 0usize;
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sampled_any = false;

    for &b in bytes.iter().step_by(SAMPLE_STRIDE) {
        sampled_any = true;
        min = min.min(b);
        max = max.max(b);

        if b == 0x00 || b == 0x80 {
            run += 1;
            if run >= FLAT_RUN_SAMPLES {
                segments += 1;
                run = 0;
            }
        } else {
            run = 0;
        }
    }

    let dynamic_range = if sampled_any { max - min } else { 0 };
    (segments >= SILENCE_SEGMENTS, dynamic_range)
}

/// Guess the container format from leading magic bytes
fn detect_format(bytes: &[u8]) -> AudioFormat {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        AudioFormat::Wav
    } else if bytes.len() >= 3 && &bytes[0..3] == b"ID3" {
        AudioFormat::Mp3
    } else if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0 {
        // Bare MPEG frame sync (11 set bits)
        AudioFormat::Mp3
    } else if bytes.len() >= 4 && &bytes[0..4] == b"fLaC" {
        AudioFormat::Flac
    } else {
        AudioFormat::Unknown
    }
}

/// Scan the leading window for known textual encoder traces
fn find_encoder_trace(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(ENCODER_SCAN_WINDOW)];
    for trace in ENCODER_TRACES {
        let needle = trace.as_bytes();
        if window.len() >= needle.len() && window.windows(needle.len()).any(|w| w == needle) {
            return Some((*trace).to_string());
        }
    }
    None
}

/// Decode fixed-offset WAV header fields from the canonical RIFF layout
///
/// Returns `None` for anything that deviates: truncated header, missing
/// fmt/data chunk tags at their canonical offsets, or a zero byte rate.
fn parse_wav_header(bytes: &[u8]) -> Option<WavInfo> {
    if bytes.len() < 44 {
        return None;
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return None;
    }

    let channels = u16::from_le_bytes([bytes[22], bytes[23]]);
    let sample_rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
    let byte_rate = u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]);
    let data_size = u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);

    if channels == 0 || sample_rate == 0 || byte_rate == 0 {
        return None;
    }

    Some(WavInfo {
        channels,
        sample_rate,
        byte_rate,
        duration_seconds: f64::from(data_size) / f64::from(byte_rate),
    })
}

/// Round to 3 decimal places
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
