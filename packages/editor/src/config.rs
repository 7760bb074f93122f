use atelier_history::DEFAULT_MAX_LEVELS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-document editing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// History groups kept for undo; 0 keeps everything
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Restrict creatable component types. `None` allows every registered type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_types: Option<BTreeSet<String>>,

    /// Type the first item of a rooted document must have
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_type: Option<String>,
}

fn default_max_history() -> usize {
    DEFAULT_MAX_LEVELS
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_LEVELS,
            allowed_types: None,
            root_type: None,
        }
    }
}

impl EditorConfig {
    pub fn allows_type(&self, type_name: &str) -> bool {
        self.allowed_types
            .as_ref()
            .map_or(true, |allowed| allowed.contains(type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.max_history, 100);
        assert!(config.allows_type("Anything"));
    }

    #[test]
    fn test_allowed_types() {
        let config: EditorConfig =
            serde_json::from_str(r#"{ "maxHistory": 5, "allowedTypes": ["Widget"], "rootType": "Scene" }"#).unwrap();
        assert_eq!(config.max_history, 5);
        assert!(config.allows_type("Widget"));
        assert!(!config.allows_type("Light"));
        assert_eq!(config.root_type.as_deref(), Some("Scene"));
    }
}
