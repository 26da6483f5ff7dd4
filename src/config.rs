use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Slot key used when the config does not name one.
pub const DEFAULT_SLOT_KEY: &str = "organizationData";

/// Debounce window for slot change events
const DEFAULT_WATCH_DEBOUNCE_MS: u64 = 250;

/// How duplicate names / expertise pairs are handled on insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniquenessPolicy {
    /// Accept duplicates; the startup deduplication pass reconciles them.
    #[default]
    Deferred,
    /// Adding an existing key returns the existing record; an update that
    /// would collide with another record is rejected.
    Enforced,
}

/// What soft-deleting a referenced Operation or Machine does to the
/// process-expertise rows that name it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Soft-delete the referencing expertise rows too.
    #[default]
    Cascade,
    /// Refuse the delete while active rows reference it.
    Block,
    /// Delete anyway and leave the expertise rows dangling.
    Allow,
}

/// Configuration stored in ~/.orgref/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Directory holding the slot file. Defaults to ~/.orgref.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_slot_key")]
    pub slot_key: String,
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,
    #[serde(default)]
    pub uniqueness: UniquenessPolicy,
    #[serde(default)]
    pub reference_policy: ReferencePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            slot_key: default_slot_key(),
            watch_debounce_ms: default_watch_debounce_ms(),
            uniqueness: UniquenessPolicy::default(),
            reference_policy: ReferencePolicy::default(),
        }
    }
}

fn default_slot_key() -> String {
    DEFAULT_SLOT_KEY.to_string()
}

fn default_watch_debounce_ms() -> u64 {
    DEFAULT_WATCH_DEBOUNCE_MS
}

impl StoreConfig {
    /// Resolve the data directory, falling back to ~/.orgref.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, StoreError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => state_dir(),
        }
    }
}

/// Get the state directory (~/.orgref)
pub fn state_dir() -> Result<PathBuf, StoreError> {
    let home = dirs::home_dir().ok_or(StoreError::HomeDirNotFound)?;
    Ok(home.join(".orgref"))
}

/// Get the canonical config file path (~/.orgref/config.json)
pub fn config_path() -> Result<PathBuf, StoreError> {
    Ok(state_dir()?.join("config.json"))
}

/// Load configuration from ~/.orgref/config.json.
///
/// A missing file yields defaults; a present but unparsable file is an error.
pub fn load_config() -> Result<StoreConfig, StoreError> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<StoreConfig, StoreError> {
    if !path.exists() {
        log::debug!("Config: {} not found, using defaults", path.display());
        return Ok(StoreConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: StoreConfig = serde_json::from_str(&content)
        .map_err(|e| StoreError::Config(format!("{}: {}", path.display(), e)))?;

    if config.slot_key.trim().is_empty() {
        return Err(StoreError::Config("slotKey must not be empty".into()));
    }

    Ok(config)
}

/// Load the config at `path` (or defaults), apply the mutator, and write it back.
pub fn create_or_update_config(
    path: &Path,
    mutator: impl FnOnce(&mut StoreConfig),
) -> Result<StoreConfig, StoreError> {
    let mut config = load_config_from(path)?;
    mutator(&mut config);

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let content = serde_json::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config_from(&temp.path().join("config.json")).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.slot_key, "organizationData");
        assert_eq!(config.uniqueness, UniquenessPolicy::Deferred);
        assert_eq!(config.reference_policy, ReferencePolicy::Cascade);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "uniqueness": "enforced", "referencePolicy": "block" }"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.uniqueness, UniquenessPolicy::Enforced);
        assert_eq!(config.reference_policy, ReferencePolicy::Block);
        assert_eq!(config.watch_debounce_ms, 250);
    }

    #[test]
    fn test_unparsable_config_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "uniqueness": "sometimes" }"#).unwrap();

        let result = load_config_from(&path);
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_empty_slot_key_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "slotKey": "  " }"#).unwrap();

        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_create_or_update_config_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");

        let written = create_or_update_config(&path, |c| {
            c.data_dir = Some(PathBuf::from("/srv/hr"));
            c.uniqueness = UniquenessPolicy::Enforced;
        })
        .unwrap();

        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(written, reloaded);
        assert_eq!(reloaded.data_dir, Some(PathBuf::from("/srv/hr")));
    }
}
