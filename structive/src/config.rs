//! Per-component configuration.

use serde::{Deserialize, Serialize};

/// How a component attaches its content to its host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShadowRootMode {
    /// Decide per host: behaves as `open` for custom tags.
    #[default]
    Auto,
    /// Mount under a dedicated shadow-root child.
    Open,
    /// Mount directly under the host element.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    pub shadow_root_mode: ShadowRootMode,
    /// Record a change ledger for this component.
    pub enable_diagnostics: bool,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            shadow_root_mode: ShadowRootMode::Auto,
            enable_diagnostics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: ComponentConfig =
            serde_json::from_str(r#"{ "shadow_root_mode": "none" }"#).unwrap();
        assert_eq!(config.shadow_root_mode, ShadowRootMode::None);
        assert!(!config.enable_diagnostics);
        let config: ComponentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.shadow_root_mode, ShadowRootMode::Auto);
    }
}
