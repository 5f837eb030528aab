//! Config files: YAML or JSON, read into a [`ConfigTree`].

use std::path::Path;

use serde_json::Value;
use sheetguard_engine::ConfigTree;

use crate::IoError;

/// Parse a config file. `.json` is read as JSON, anything else as YAML.
pub fn read_config(path: &Path) -> Result<ConfigTree, IoError> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let root: Value = if is_json {
        serde_json::from_str(&text)?
    } else {
        serde_yaml::from_str(&text)?
    };
    Ok(ConfigTree::new(root))
}

/// Like [`read_config`], but a missing or broken file yields the defaults.
pub fn load_config(path: Option<&Path>) -> ConfigTree {
    let Some(path) = path else {
        return ConfigTree::default();
    };
    match read_config(path) {
        Ok(tree) => {
            tracing::debug!(path = %path.display(), "config loaded");
            tree
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "config unreadable; using defaults");
            ConfigTree::default()
        }
    }
}
