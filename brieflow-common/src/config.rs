//! Configuration file resolution and TOML loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/brieflow/<file_name>`)
//! 4. None: caller falls back to built-in defaults

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Logging configuration shared by all Brieflow binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted log lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve which config file to load, if any
///
/// Returns `Ok(None)` when no source names a file and no per-user file exists.
/// A path named explicitly (CLI or environment) must exist.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_existing(path.to_path_buf(), "command line");
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return require_existing(PathBuf::from(path), env_var_name);
        }
    }

    // Priority 3: Per-user config directory
    if let Some(path) = default_config_dir().map(|d| d.join(file_name)) {
        if path.exists() {
            debug!("Using per-user config file: {}", path.display());
            return Ok(Some(path));
        }
    }

    Ok(None)
}

fn require_existing(path: PathBuf, source: &str) -> Result<Option<PathBuf>> {
    if path.exists() {
        info!("Config file from {}: {}", source, path.display());
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "Config file named by {} not found: {}",
            source,
            path.display()
        )))
    }
}

/// Platform config directory for Brieflow (`~/.config/brieflow` on Linux)
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("brieflow"))
}

/// Read and deserialize a TOML config file
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Read an environment variable, treating empty/whitespace values as absent
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    #[serial]
    fn test_cli_argument_has_priority() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::env::set_var("BRIEFLOW_TEST_CONFIG", "/does/not/exist.toml");

        let resolved =
            resolve_config_path(Some(file.path()), "BRIEFLOW_TEST_CONFIG", "x.toml").unwrap();
        assert_eq!(resolved, Some(file.path().to_path_buf()));

        std::env::remove_var("BRIEFLOW_TEST_CONFIG");
    }

    #[test]
    #[serial]
    fn test_env_var_used_when_no_cli_argument() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::env::set_var("BRIEFLOW_TEST_CONFIG", file.path());

        let resolved = resolve_config_path(None, "BRIEFLOW_TEST_CONFIG", "x.toml").unwrap();
        assert_eq!(resolved, Some(file.path().to_path_buf()));

        std::env::remove_var("BRIEFLOW_TEST_CONFIG");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_path_is_error() {
        std::env::set_var("BRIEFLOW_TEST_CONFIG", "/definitely/missing/brieflow.toml");
        let result = resolve_config_path(None, "BRIEFLOW_TEST_CONFIG", "x.toml");
        assert!(matches!(result, Err(Error::Config(_))));
        std::env::remove_var("BRIEFLOW_TEST_CONFIG");
    }

    #[test]
    fn test_load_toml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"brieflow\"\n[logging]\nlevel = \"debug\"").unwrap();

        let sample: Sample = load_toml_config(file.path()).unwrap();
        assert_eq!(sample.name, "brieflow");
        assert_eq!(sample.logging.level, "debug");
        assert!(!sample.logging.json);
    }

    #[test]
    fn test_load_toml_config_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = ").unwrap();

        let result: Result<Sample> = load_toml_config(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_env_non_empty() {
        std::env::set_var("BRIEFLOW_TEST_BLANK", "   ");
        assert_eq!(env_non_empty("BRIEFLOW_TEST_BLANK"), None);
        std::env::set_var("BRIEFLOW_TEST_BLANK", " key ");
        assert_eq!(env_non_empty("BRIEFLOW_TEST_BLANK"), Some("key".to_string()));
        std::env::remove_var("BRIEFLOW_TEST_BLANK");
    }
}
