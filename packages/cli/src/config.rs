use atelier_editor::{DocumentKind, EditorConfig, TypeRegistry, DEFAULT_MAX_LEVELS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "atelier.config.json";

/// Atelier configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Hierarchy rules documents are opened with
    #[serde(default = "default_document")]
    pub document: DocumentKind,

    /// Registry file with the component types. Built-in types when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,

    #[serde(default)]
    pub history: HistoryOptions,
}

fn default_document() -> DocumentKind {
    DocumentKind::Grouped
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOptions {
    /// Undo groups kept; 0 keeps everything
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

fn default_max_levels() -> usize {
    DEFAULT_MAX_LEVELS
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            max_levels: default_max_levels(),
        }
    }
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Absolute path to the registry file, if one is configured
    pub fn registry_path(&self, cwd: &Path) -> Option<PathBuf> {
        self.registry.as_ref().map(|registry| cwd.join(registry))
    }

    pub fn load_registry(&self, cwd: &Path) -> anyhow::Result<TypeRegistry> {
        match self.registry_path(cwd) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading type registry");
                Ok(TypeRegistry::load(&path)?)
            }
            None => Ok(TypeRegistry::builtin()),
        }
    }

    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            max_history: self.history.max_levels,
            ..EditorConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document: default_document(),
            registry: None,
            history: HistoryOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "document": "rooted",
            "registry": "types.json",
            "history": { "maxLevels": 20 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.document, DocumentKind::Rooted);
        assert_eq!(config.registry_path(Path::new("/work")), Some(PathBuf::from("/work/types.json")));
        assert_eq!(config.editor_config().max_history, 20);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.document, DocumentKind::Grouped);
        assert!(config.registry.is_none());
        assert_eq!(config.history.max_levels, DEFAULT_MAX_LEVELS);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.document, DocumentKind::Grouped);
        assert!(!config.load_registry(dir.path()).unwrap().is_empty());
    }
}
