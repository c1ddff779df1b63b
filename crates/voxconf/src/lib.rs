//! Configuration loading for voxgrid.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/voxgrid/config.toml` (system)
//! 2. `~/.config/voxgrid/config.toml` (user)
//! 3. `./voxgrid.toml` (local override), or the path passed on the command line
//! 4. Environment variables (`VOXGRID_*`)
//!
//! A file only needs the keys it changes; everything else keeps the value
//! from earlier layers.
//!
//! # Example Config
//!
//! ```toml
//! [grid]
//! step = 0.125
//! voices = 4
//!
//! [classify]
//! threshold = 0.9
//!
//! [segment]
//! min_len = 15.0
//! max_len = 90.0
//! part_count = 5
//!
//! [dataset]
//! seed = 42
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{ClassifyConfig, DatasetConfig, GridConfig, SegmentConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid config value {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Complete voxgrid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VoxConfig {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub classify: ClassifyConfig,

    #[serde(default)]
    pub segment: SegmentConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl VoxConfig {
    /// Load configuration from every layer and report where values came
    /// from. `config_path` replaces the local `./voxgrid.toml`.
    ///
    /// Values are not validated here: callers layer their own overrides on
    /// top and then call [`VoxConfig::validate`].
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = VoxConfig::default();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }

        for path in loader::discover_config_files_with_override(config_path) {
            loader::overlay_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: String| {
            Err(ConfigError::Invalid {
                key: key.to_string(),
                message,
            })
        };
        if !(self.grid.step.is_finite() && self.grid.step > 0.0) {
            return invalid("grid.step", format!("must be positive, got {}", self.grid.step));
        }
        if self.grid.voices == 0 {
            return invalid("grid.voices", "must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.classify.threshold) {
            return invalid(
                "classify.threshold",
                format!("must be within 0..=1, got {}", self.classify.threshold),
            );
        }
        if !(self.segment.min_len.is_finite() && self.segment.min_len > 0.0) {
            return invalid(
                "segment.min_len",
                format!("must be positive, got {}", self.segment.min_len),
            );
        }
        if !(self.segment.max_len.is_finite() && self.segment.max_len >= self.segment.min_len) {
            return invalid(
                "segment.max_len",
                format!(
                    "must be at least min_len {}, got {}",
                    self.segment.min_len, self.segment.max_len
                ),
            );
        }
        if self.segment.part_count == 0 {
            return invalid("segment.part_count", "must be at least 1".to_string());
        }
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# voxgrid configuration\n\n");

        output.push_str("[grid]\n");
        output.push_str(&format!("step = {:?}\n", self.grid.step));
        output.push_str(&format!("voices = {}\n", self.grid.voices));

        output.push_str("\n[classify]\n");
        output.push_str(&format!("threshold = {:?}\n", self.classify.threshold));

        output.push_str("\n[segment]\n");
        output.push_str(&format!("min_len = {:?}\n", self.segment.min_len));
        output.push_str(&format!("max_len = {:?}\n", self.segment.max_len));
        output.push_str(&format!("part_count = {}\n", self.segment.part_count));

        output.push_str("\n[dataset]\n");
        match self.dataset.seed {
            Some(seed) => output.push_str(&format!("seed = {}\n", seed)),
            None => output.push_str("# seed = 42\n"),
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            toml::Value::String(self.telemetry.log_level.clone())
        ));

        output
    }
}
