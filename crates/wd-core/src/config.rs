//! Editor configuration.
//!
//! An explicitly constructed value injected into the canvas and the codec.
//! Deserializes from the `config.json` layout; every section and field is
//! optional and falls back to the built-in defaults.

use crate::color::{self, Color};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Class name used when no classes are configured.
pub const FALLBACK_CLASS: &str = "Generic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: f32,
    #[serde(with = "color::as_array")]
    pub color: Color,
    pub enabled_by_default: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 10.0,
            color: Color::rgb(200, 200, 200),
            enabled_by_default: true,
        }
    }
}

/// A named node class and the color it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeClass {
    pub name: String,
    #[serde(with = "color::as_array")]
    pub color: Color,
}

impl NodeClass {
    fn new(name: &str, color: Color) -> Self {
        Self {
            name: name.to_string(),
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub size: f32,
    #[serde(with = "color::as_array")]
    pub default_color: Color,
    #[serde(with = "color::as_array")]
    pub highlighted_color: Color,
    #[serde(with = "color::as_array")]
    pub border_color: Color,
    #[serde(with = "color::as_array")]
    pub border_color_selected: Color,
    pub border_width: f32,
    pub selected_border_width: f32,
    pub classes: Vec<NodeClass>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            size: 30.0,
            default_color: Color::rgb(100, 150, 200),
            highlighted_color: Color::rgb(150, 200, 255),
            border_color: Color::rgb(50, 100, 150),
            border_color_selected: Color::rgb(200, 0, 0),
            border_width: 2.0,
            selected_border_width: 3.0,
            classes: vec![
                NodeClass::new("5V", Color::rgb(255, 0, 0)),
                NodeClass::new("GRD", Color::rgb(0, 0, 0)),
                NodeClass::new("SDA", Color::rgb(0, 0, 255)),
                NodeClass::new("SCL", Color::rgb(0, 255, 0)),
                NodeClass::new("PWM", Color::rgb(255, 255, 0)),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    #[serde(with = "color::as_array")]
    pub default_color: Color,
    pub width: f32,
    pub hitbox_distance: f32,
    /// Routing mode for newly drawn connections.
    pub orthogonal_by_default: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_color: Color::rgb(100, 100, 100),
            width: 2.0,
            hitbox_distance: 10.0,
            orthogonal_by_default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f32,
    pub max: f32,
    pub increment: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 5.0,
            increment: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub snap_to_grid_enabled: bool,
    pub antialiasing_enabled: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            snap_to_grid_enabled: false,
            antialiasing_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum undo depth. 0 keeps every command.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 500 }
    }
}

/// The full editor configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub grid: GridConfig,
    pub node: NodeConfig,
    pub connection: ConnectionConfig,
    pub zoom: ZoomConfig,
    pub features: FeatureConfig,
    pub history: HistoryConfig,
}

impl EditorConfig {
    /// Strict parse: malformed JSON is an error.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from disk, falling back to defaults when the file is missing or
    /// malformed.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("config file {} not readable ({e}), using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_json_str(&text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("error parsing config file {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Configured classes, or a single `Generic` class when none are set.
    pub fn classes(&self) -> Vec<NodeClass> {
        if self.node.classes.is_empty() {
            vec![NodeClass::new(FALLBACK_CLASS, Color::rgb(150, 150, 150))]
        } else {
            self.node.classes.clone()
        }
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes().into_iter().map(|c| c.name).collect()
    }

    /// The first configured class.
    pub fn default_class(&self) -> String {
        self.node
            .classes
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| FALLBACK_CLASS.to_string())
    }

    /// Color for a class; unknown classes get the node default color.
    pub fn class_color(&self, class_name: &str) -> Color {
        self.classes()
            .iter()
            .find(|c| c.name == class_name)
            .map(|c| c.color)
            .unwrap_or(self.node.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtin_table() {
        let config = EditorConfig::default();
        assert_eq!(config.grid.size, 10.0);
        assert_eq!(config.node.size, 30.0);
        assert_eq!(config.connection.hitbox_distance, 10.0);
        assert_eq!(config.default_class(), "5V");
        assert_eq!(config.class_color("GRD"), Color::rgb(0, 0, 0));
        assert_eq!(config.class_color("nope"), Color::rgb(100, 150, 200));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = EditorConfig::from_json_str(
            r#"{ "grid": { "size": 25 }, "node": { "classes": [ { "name": "CAN", "color": [1, 2, 3] } ] } }"#,
        )
        .unwrap();
        assert_eq!(config.grid.size, 25.0);
        assert!(config.grid.enabled_by_default);
        assert_eq!(config.node.size, 30.0);
        assert_eq!(config.class_names(), vec!["CAN".to_string()]);
        assert_eq!(config.class_color("CAN"), Color::rgb(1, 2, 3));
    }

    #[test]
    fn empty_class_list_falls_back_to_generic() {
        let config = EditorConfig::from_json_str(r#"{ "node": { "classes": [] } }"#).unwrap();
        assert_eq!(config.default_class(), FALLBACK_CLASS);
        assert_eq!(config.class_names(), vec![FALLBACK_CLASS.to_string()]);
    }

    #[test]
    fn load_missing_or_malformed_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.json");
        assert_eq!(EditorConfig::load(&missing), EditorConfig::default());

        std::fs::write(&missing, "{ not json").unwrap();
        assert_eq!(EditorConfig::load(&missing), EditorConfig::default());
        assert!(EditorConfig::from_json_str("{ not json").is_err());
    }
}
