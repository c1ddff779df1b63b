//! Typed config sections, one per TOML table.

use serde::{Deserialize, Serialize};

/// Quantization grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Grid step in seconds.
    /// Default: 0.125
    #[serde(default = "GridConfig::default_step")]
    pub step: f64,

    /// Voice slots per frame, and the polyphony a piece must reach.
    /// Default: 4
    #[serde(default = "GridConfig::default_voices")]
    pub voices: usize,
}

impl GridConfig {
    fn default_step() -> f64 {
        0.125
    }

    fn default_voices() -> usize {
        4
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            step: Self::default_step(),
            voices: Self::default_voices(),
        }
    }
}

/// Voice classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Share of a track's note occurrences that must fall inside a voice
    /// range for the track to count as that voice.
    /// Default: 0.9
    #[serde(default = "ClassifyConfig::default_threshold")]
    pub threshold: f64,
}

impl ClassifyConfig {
    fn default_threshold() -> f64 {
        0.9
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
        }
    }
}

/// Excerpt lengths, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Default: 15
    #[serde(default = "SegmentConfig::default_min_len")]
    pub min_len: f64,

    /// Default: 90
    #[serde(default = "SegmentConfig::default_max_len")]
    pub max_len: f64,

    /// Preferred excerpts per piece.
    /// Default: 5
    #[serde(default = "SegmentConfig::default_part_count")]
    pub part_count: usize,
}

impl SegmentConfig {
    fn default_min_len() -> f64 {
        15.0
    }

    fn default_max_len() -> f64 {
        90.0
    }

    fn default_part_count() -> usize {
        5
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_len: Self::default_min_len(),
            max_len: Self::default_max_len(),
            part_count: Self::default_part_count(),
        }
    }
}

/// Train/test/valid split.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Shuffle seed. Unset means a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
