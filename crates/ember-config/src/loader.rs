//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `~/.ember/config.toml` (or `$EMBER_HOME/config.toml`)
//! 3. Merge the explicit file, if any
//! 4. Apply `EMBER_*` environment overrides
//! 5. Deserialize merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Config files larger than this are refused.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Load the configuration with layered file precedence.
///
/// `home_override` is treated as the ember directory itself, bypassing
/// home-directory discovery and `EMBER_HOME`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

pub(crate) fn load_with_env(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Config> {
    // 1. Embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    // 2. User config.
    let user_config = if let Some(home) = home_override {
        let path = home.join("config.toml");
        try_load_file(&path)?.map(|overlay| (overlay, path))
    } else {
        let user_path = home_directory()?.join(".ember").join("config.toml");
        if let Some(overlay) = try_load_file(&user_path)? {
            Some((overlay, user_path))
        } else if let Some(ember_home) = env_vars.get("EMBER_HOME") {
            let alt_path = PathBuf::from(ember_home).join("config.toml");
            try_load_file(&alt_path)?.map(|overlay| (overlay, alt_path))
        } else {
            None
        }
    };
    if let Some((overlay, path)) = user_config {
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded user config");
    }

    // 3. Explicit config. Unlike the discovered layers it must exist.
    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded explicit config");
    }

    // 4. Environment.
    let env_count = apply_env_overrides(&mut merged, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    // 5–6. Deserialize and validate.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or
/// validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_bounded(path)?;
    parse(&path.display().to_string(), &content)
}

/// Parse and validate a config document. Missing keys take their defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the document cannot be parsed or validated.
pub fn parse(origin: &str, content: &str) -> ConfigResult<Config> {
    let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse a TOML file, returning `Ok(None)` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, skipping");
        return Ok(None);
    }
    let content = read_bounded(path)?;
    let value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

fn read_bounded(path: &Path) -> ConfigResult<String> {
    // Check file size before reading to prevent OOM.
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                metadata.len()
            ),
        });
    }
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_parse_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_with_env(None, Some(dir.path()), &no_env()).unwrap();
        assert_eq!(config.runtime.id, "interpreter");
        assert_eq!(config.runtime.default_id, "interpreter");
        assert!(config.runtime.host.starts_with("ember "));
        assert!(!config.runtime.disable_legacy_features);
        assert_eq!(config.tasks.max_pending, 5000);
        assert_eq!(config.tasks.tick_ms, 50);
        assert_eq!(config.events.queue_capacity, 256);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_embedded_defaults_match_struct_defaults() {
        let embedded: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        let built = Config::default();
        assert_eq!(embedded.runtime.id, built.runtime.id);
        assert_eq!(embedded.runtime.host, built.runtime.host);
        assert_eq!(embedded.tasks.max_pending, built.tasks.max_pending);
        assert_eq!(embedded.events.queue_capacity, built.events.queue_capacity);
    }

    #[test]
    fn test_user_then_explicit_then_env() {
        let home = tempfile::tempdir().unwrap();
        fs::write(
            home.path().join("config.toml"),
            "[runtime]\nid = \"user\"\nhost = \"user-host\"\n[tasks]\ntick_ms = 10\n",
        )
        .unwrap();
        let explicit = home.path().join("machine.toml");
        fs::write(&explicit, "[runtime]\nid = \"explicit\"\n").unwrap();

        let config = load_with_env(Some(&explicit), Some(home.path()), &no_env()).unwrap();
        assert_eq!(config.runtime.id, "explicit");
        // Keys the explicit file does not name survive from the user layer.
        assert_eq!(config.runtime.host, "user-host");
        assert_eq!(config.tasks.tick_ms, 10);
        assert_eq!(config.tasks.max_pending, 5000);

        let env: HashMap<String, String> =
            [("EMBER_RUNTIME".to_owned(), "env".to_owned())].into();
        let config = load_with_env(Some(&explicit), Some(home.path()), &env).unwrap();
        assert_eq!(config.runtime.id, "env");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join("nope.toml");
        let err = load_with_env(Some(&missing), Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_malformed_user_file_is_parse_error() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("config.toml"), "[runtime\nid = ").unwrap();
        let err = load_with_env(None, Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.toml");
        fs::write(&path, "#".repeat(1_100_000)).unwrap();
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_load_file_uses_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "[events]\nqueue_capacity = 8\n").unwrap();
        let config = load_file(&path).unwrap();
        assert_eq!(config.events.queue_capacity, 8);
        assert_eq!(config.tasks.max_pending, 5000);
    }

    #[test]
    fn test_invalid_merged_value_fails_validation() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("config.toml"), "[tasks]\ntick_ms = 0\n").unwrap();
        let err = load_with_env(None, Some(home.path()), &no_env()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "tasks.tick_ms"
        ));
    }

    #[test]
    fn test_deep_merge_replaces_arrays() {
        let mut base: toml::Value =
            toml::from_str("[logging]\ndirectives = [\"a\"]\nlevel = \"info\"\n").unwrap();
        let overlay: toml::Value = toml::from_str("[logging]\ndirectives = [\"b\"]\n").unwrap();
        deep_merge(&mut base, &overlay);
        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].as_str(), Some("b"));
        assert_eq!(base["logging"]["level"].as_str(), Some("info"));
    }
}
