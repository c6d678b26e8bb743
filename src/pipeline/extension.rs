//! Console-owned extension stored inside a node's opaque config.
//!
//! The backend treats `config` as opaque. The console reserves the `ui` key
//! for its own state (currently only the manual canvas position) and keeps
//! everything else untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Position;

/// Reserved config key holding the console extension.
pub const UI_KEY: &str = "ui";

/// Typed view of `config.ui`.
///
/// Keys other than `position` written by other consoles are carried in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiExtension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UiExtension {
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.extra.is_empty()
    }

    /// Read the extension from a config value. A missing or malformed `ui`
    /// entry yields an empty extension.
    pub fn read(config: &Value) -> Self {
        config
            .get(UI_KEY)
            .and_then(|ui| serde_json::from_value::<UiExtension>(ui.clone()).ok())
            .unwrap_or_default()
    }
}

/// Split a backend config into operator config (without `ui`) and the
/// console extension.
///
/// Non-object configs are replaced by an empty object.
pub fn split_config(config: &Value) -> (Map<String, Value>, UiExtension) {
    let mut map = match config {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let ui = map
        .remove(UI_KEY)
        .and_then(|ui| serde_json::from_value::<UiExtension>(ui).ok())
        .unwrap_or_default();
    (map, ui)
}

/// Re-attach the extension to an operator config.
pub fn join_config(mut config: Map<String, Value>, ui: &UiExtension) -> Value {
    config.remove(UI_KEY);
    if !ui.is_empty() {
        if let Ok(value) = serde_json::to_value(ui) {
            config.insert(UI_KEY.to_string(), value);
        }
    }
    Value::Object(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_removes_ui_key() {
        let config = json!({
            "condition": "age > 30",
            "ui": { "position": { "x": 10.0, "y": 20.0 } }
        });
        let (map, ui) = split_config(&config);
        assert!(!map.contains_key(UI_KEY));
        assert_eq!(map["condition"], json!("age > 30"));
        assert_eq!(ui.position, Some(Position::new(10.0, 20.0)));
    }

    #[test]
    fn test_join_preserves_unknown_ui_keys() {
        let config = json!({
            "ui": { "position": { "x": 1.0, "y": 2.0 }, "collapsed": true }
        });
        let (map, mut ui) = split_config(&config);
        ui.position = Some(Position::new(5.0, 6.0));
        let joined = join_config(map, &ui);
        assert_eq!(joined["ui"]["collapsed"], json!(true));
        assert_eq!(joined["ui"]["position"]["x"], json!(5.0));
    }

    #[test]
    fn test_empty_extension_is_not_written() {
        let joined = join_config(Map::new(), &UiExtension::default());
        assert_eq!(joined, json!({}));
    }

    #[test]
    fn test_malformed_ui_is_ignored() {
        let config = json!({ "ui": "not an object", "k": 1 });
        let (map, ui) = split_config(&config);
        assert!(ui.is_empty());
        assert_eq!(map.len(), 1);
        assert!(UiExtension::read(&config).is_empty());
    }

    #[test]
    fn test_non_object_config_becomes_empty() {
        let (map, ui) = split_config(&json!([1, 2, 3]));
        assert!(map.is_empty());
        assert!(ui.is_empty());
    }
}
