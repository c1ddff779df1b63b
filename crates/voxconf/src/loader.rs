//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, VoxConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/voxgrid/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("voxgrid/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("voxgrid.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Apply the keys present in a TOML file to `config`.
pub fn overlay_file(config: &mut VoxConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    overlay_toml(config, &contents, path)
}

/// Apply the keys present in a TOML string to `config`.
///
/// Integers are accepted where floats are expected. Keys of the wrong type
/// are rejected.
fn overlay_toml(config: &mut VoxConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let wrong_type = |key: &str, expected: &str| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{key} must be {expected}"),
    };

    if let Some(grid) = table.get("grid").and_then(|v| v.as_table()) {
        if let Some(v) = grid.get("step") {
            config.grid.step = as_float(v).ok_or_else(|| wrong_type("grid.step", "a number"))?;
        }
        if let Some(v) = grid.get("voices") {
            config.grid.voices =
                as_count(v).ok_or_else(|| wrong_type("grid.voices", "a non-negative integer"))?;
        }
    }

    if let Some(classify) = table.get("classify").and_then(|v| v.as_table()) {
        if let Some(v) = classify.get("threshold") {
            config.classify.threshold =
                as_float(v).ok_or_else(|| wrong_type("classify.threshold", "a number"))?;
        }
    }

    if let Some(segment) = table.get("segment").and_then(|v| v.as_table()) {
        if let Some(v) = segment.get("min_len") {
            config.segment.min_len =
                as_float(v).ok_or_else(|| wrong_type("segment.min_len", "a number"))?;
        }
        if let Some(v) = segment.get("max_len") {
            config.segment.max_len =
                as_float(v).ok_or_else(|| wrong_type("segment.max_len", "a number"))?;
        }
        if let Some(v) = segment.get("part_count") {
            config.segment.part_count = as_count(v)
                .ok_or_else(|| wrong_type("segment.part_count", "a non-negative integer"))?;
        }
    }

    if let Some(dataset) = table.get("dataset").and_then(|v| v.as_table()) {
        if let Some(v) = dataset.get("seed") {
            let seed = v
                .as_integer()
                .and_then(|i| u64::try_from(i).ok())
                .ok_or_else(|| wrong_type("dataset.seed", "a non-negative integer"))?;
            config.dataset.seed = Some(seed);
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level") {
            config.telemetry.log_level = v
                .as_str()
                .ok_or_else(|| wrong_type("telemetry.log_level", "a string"))?
                .to_string();
        }
    }

    Ok(())
}

fn as_float(value: &toml::Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn as_count(value: &toml::Value) -> Option<usize> {
    value.as_integer().and_then(|i| usize::try_from(i).ok())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut VoxConfig, sources: &mut ConfigSources) {
    apply_overrides(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from any key lookup. Unparseable values are ignored.
pub fn apply_overrides(
    config: &mut VoxConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let take = |key: &str| {
        let value = lookup(key)?;
        Some((key.to_string(), value))
    };

    if let Some((key, v)) = take("VOXGRID_STEP") {
        if let Ok(step) = v.parse() {
            config.grid.step = step;
            sources.env_overrides.push(key);
        }
    }
    if let Some((key, v)) = take("VOXGRID_VOICES") {
        if let Ok(voices) = v.parse() {
            config.grid.voices = voices;
            sources.env_overrides.push(key);
        }
    }
    if let Some((key, v)) = take("VOXGRID_THRESHOLD") {
        if let Ok(threshold) = v.parse() {
            config.classify.threshold = threshold;
            sources.env_overrides.push(key);
        }
    }
    if let Some((key, v)) = take("VOXGRID_MIN_LEN") {
        if let Ok(len) = v.parse() {
            config.segment.min_len = len;
            sources.env_overrides.push(key);
        }
    }
    if let Some((key, v)) = take("VOXGRID_MAX_LEN") {
        if let Ok(len) = v.parse() {
            config.segment.max_len = len;
            sources.env_overrides.push(key);
        }
    }
    if let Some((key, v)) = take("VOXGRID_PART_COUNT") {
        if let Ok(count) = v.parse() {
            config.segment.part_count = count;
            sources.env_overrides.push(key);
        }
    }
    if let Some((key, v)) = take("VOXGRID_SEED") {
        if let Ok(seed) = v.parse() {
            config.dataset.seed = Some(seed);
            sources.env_overrides.push(key);
        }
    }
    if let Some((key, v)) = take("VOXGRID_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push(key);
    }
    // Also support RUST_LOG
    if let Some((key, v)) = take("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(toml: &str) -> Result<VoxConfig, ConfigError> {
        let mut config = VoxConfig::default();
        overlay_toml(&mut config, toml, Path::new("test.toml"))?;
        Ok(config)
    }

    #[test]
    fn test_cli_path_replaces_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "").unwrap();
        let files = discover_config_files_with_override(Some(&path));
        assert_eq!(files.last(), Some(&path));
        assert!(!files.iter().any(|f| f == Path::new("voxgrid.toml")));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = parse("[grid]\nstep = 0.25\n").unwrap();
        assert_eq!(config.grid.step, 0.25);
        // Other values should be defaults
        assert_eq!(config.grid.voices, 4);
        assert_eq!(config.segment.part_count, 5);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[grid]
step = 0.5
voices = 3

[classify]
threshold = 0.75

[segment]
min_len = 10
max_len = 60.5
part_count = 4

[dataset]
seed = 1234

[telemetry]
log_level = "debug"
"#;
        let config = parse(toml).unwrap();

        assert_eq!(config.grid.step, 0.5);
        assert_eq!(config.grid.voices, 3);
        assert_eq!(config.classify.threshold, 0.75);
        assert_eq!(config.segment.min_len, 10.0);
        assert_eq!(config.segment.max_len, 60.5);
        assert_eq!(config.segment.part_count, 4);
        assert_eq!(config.dataset.seed, Some(1234));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_wrong_types_are_parse_errors() {
        assert!(matches!(
            parse("[grid]\nvoices = \"four\"\n"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(parse("[dataset]\nseed = -1\n").is_err());
        assert!(parse("not toml at all [").is_err());
    }

    #[test]
    fn test_later_files_only_override_their_keys() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.toml");
        let second = dir.path().join("b.toml");
        std::fs::write(&first, "[grid]\nstep = 0.25\nvoices = 5\n").unwrap();
        std::fs::write(&second, "[grid]\nvoices = 4\n").unwrap();

        let mut config = VoxConfig::default();
        overlay_file(&mut config, &first).unwrap();
        overlay_file(&mut config, &second).unwrap();
        assert_eq!(config.grid.step, 0.25);
        assert_eq!(config.grid.voices, 4);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            overlay_file(&mut VoxConfig::default(), &dir.path().join("nope.toml")),
            Err(ConfigError::FileRead { .. })
        ));
    }

    #[test]
    fn test_overrides_apply_and_are_recorded() {
        let vars: HashMap<&str, &str> = [
            ("VOXGRID_STEP", "0.0625"),
            ("VOXGRID_SEED", "99"),
            ("VOXGRID_VOICES", "many"),
            ("VOXGRID_LOG_LEVEL", "voxgrid=debug"),
        ]
        .into_iter()
        .collect();

        let mut config = VoxConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides(&mut config, &mut sources, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.grid.step, 0.0625);
        assert_eq!(config.dataset.seed, Some(99));
        assert_eq!(config.grid.voices, 4);
        assert_eq!(config.telemetry.log_level, "voxgrid=debug");
        assert_eq!(
            sources.env_overrides,
            vec!["VOXGRID_STEP", "VOXGRID_SEED", "VOXGRID_LOG_LEVEL"]
        );
    }
}
