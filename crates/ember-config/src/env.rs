//! Environment variable overrides.
//!
//! Only `EMBER_*` variables are read. They are applied after every file
//! layer, so they win over all of them.

use std::collections::HashMap;

/// Environment variables consulted by the loader, and the dotted config
/// field each one sets.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("EMBER_RUNTIME", "runtime.id"),
    ("EMBER_DEFAULT_RUNTIME", "runtime.default_id"),
    ("EMBER_LOG", "logging.level"),
];

/// Snapshot the `EMBER_*` environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("EMBER_"))
        .collect()
}

/// Apply overrides from `env_vars` onto a merged config tree.
///
/// Empty values are ignored. Returns how many fields were set.
pub fn apply_env_overrides(merged: &mut toml::Value, env_vars: &HashMap<String, String>) -> usize {
    let mut applied = Vec::new();
    for (var, field) in ENV_OVERRIDES {
        let Some(value) = env_vars.get(*var).filter(|v| !v.is_empty()) else {
            continue;
        };
        if set_field(merged, field, toml::Value::String(value.clone())) {
            applied.push(*field);
        }
    }
    applied.len()
}

fn set_field(root: &mut toml::Value, dotted: &str, value: toml::Value) -> bool {
    let Some((section, key)) = dotted.split_once('.') else {
        return false;
    };
    let Some(root) = root.as_table_mut() else {
        return false;
    };
    let section = root
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    match section.as_table_mut() {
        Some(table) => {
            table.insert(key.to_owned(), value);
            true
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut merged: toml::Value = toml::from_str("[runtime]\nid = \"a\"\n").unwrap();
        let count = apply_env_overrides(&mut merged, &vars(&[("EMBER_RUNTIME", "b")]));
        assert_eq!(count, 1);
        assert_eq!(merged["runtime"]["id"].as_str(), Some("b"));
    }

    #[test]
    fn test_overrides_create_missing_sections() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        apply_env_overrides(&mut merged, &vars(&[("EMBER_LOG", "debug")]));
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn test_empty_and_unrelated_vars_ignored() {
        let mut merged: toml::Value = toml::from_str("[runtime]\nid = \"a\"\n").unwrap();
        let count = apply_env_overrides(
            &mut merged,
            &vars(&[("EMBER_RUNTIME", ""), ("EMBER_UNKNOWN", "x")]),
        );
        assert_eq!(count, 0);
        assert_eq!(merged["runtime"]["id"].as_str(), Some("a"));
    }
}
