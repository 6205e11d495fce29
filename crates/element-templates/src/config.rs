//! Engine configuration
//!
//! Loaded from JSON; every field has a default so a partial file (or none
//! at all) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TemplateError};

/// Tunables of the element templates engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Number of commands kept for undo
    pub max_undo: usize,
    /// Mark messages created for a template with the template id
    pub stamp_messages: bool,
    /// Upper bound of condition re-evaluation rounds during one apply
    pub max_condition_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_undo: bpmn_document::DEFAULT_MAX_COMMANDS,
            stamp_messages: true,
            max_condition_passes: 8,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No engine config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_undo == 0 {
            return Err(TemplateError::Config("maxUndo must be at least 1".into()));
        }
        if self.max_condition_passes == 0 {
            return Err(TemplateError::Config(
                "maxConditionPasses must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "maxUndo": 5 }"#).unwrap();
        assert_eq!(config.max_undo, 5);
        assert!(config.stamp_messages);
        assert_eq!(config.max_condition_passes, 8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = EngineConfig::from_json_str(r#"{ "maxUndo": 0 }"#);
        assert!(matches!(result, Err(TemplateError::Config(_))));

        let result = EngineConfig::from_json_str("not json");
        assert!(matches!(result, Err(TemplateError::Serialization(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "stampMessages": false }}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert!(!config.stamp_messages);
        assert_eq!(config.max_undo, 100);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("engine.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_unreadable_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::load(dir.path());
        assert!(matches!(result, Err(TemplateError::Io(_))));
    }
}
