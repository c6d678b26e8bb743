//! Node property editor
//!
//! Edits one selected node. The raw JSON text of the operator config is the
//! editor's single buffer: structured form edits parse it, merge one
//! top-level key and re-serialize, so keys the form does not know survive.
//! Malformed text is tolerated while typing and rejected on apply.
//!
//! The reserved `ui` key never appears in the buffer. Position and other
//! console state stay on the node and are re-attached when saving.

pub mod forms;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, StudioError};
use crate::pipeline::extension::UI_KEY;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{NodePatch, VisualNode};
use crate::pipeline::store::GraphStore;
use crate::pipeline::taxonomy::rederive_operator_type;
use crate::types::OperatorType;

pub use forms::{fields_for, hydrate, FieldKind, FieldSpec, FieldValue, FormField};

/// Pretty-print a config for the raw JSON view.
pub fn config_to_text(config: &Map<String, Value>) -> String {
    serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".to_string())
}

/// Parse raw JSON text into an operator config object.
///
/// Blank text is an empty config. A `ui` key typed by hand is dropped.
pub fn parse_config(text: &str) -> Result<Map<String, Value>> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_str(text)
        .map_err(|e| StudioError::validation(format!("Invalid JSON: {e}")))?;
    match value {
        Value::Object(mut map) => {
            if map.remove(UI_KEY).is_some() {
                warn!("Ignored reserved `ui` key in raw config");
            }
            Ok(map)
        }
        other => Err(StudioError::validation(format!(
            "Config must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone)]
struct Selection {
    node_id: NodeId,
    label: String,
    operator_type: OperatorType,
    /// Class as stored on the node when it was selected or last applied
    applied_class: Option<String>,
    operator_class: Option<String>,
    raw: String,
}

/// Editor panel state for the selected node.
#[derive(Debug, Clone, Default)]
pub struct PropertyEditor {
    selection: Option<Selection>,
    error: Option<String>,
    confirm_delete: bool,
}

impl PropertyEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate the editor from a node. Discards any unapplied edits.
    pub fn open(&mut self, node: &VisualNode) {
        self.selection = Some(Selection {
            node_id: node.id.clone(),
            label: node.data.label.clone(),
            operator_type: node.data.operator_type.clone(),
            applied_class: node.data.operator_class.clone(),
            operator_class: node.data.operator_class.clone(),
            raw: config_to_text(&node.data.config),
        });
        self.error = None;
        self.confirm_delete = false;
        debug!(node = %node.id, "Property editor opened");
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selection.as_ref().map(|s| &s.node_id)
    }

    pub fn is_open(&self) -> bool {
        self.selection.is_some()
    }

    /// Visible inline error, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn selection(&self) -> Result<&Selection> {
        self.selection
            .as_ref()
            .ok_or_else(|| StudioError::validation("No node selected"))
    }

    fn selection_mut(&mut self) -> Result<&mut Selection> {
        self.selection
            .as_mut()
            .ok_or_else(|| StudioError::validation("No node selected"))
    }

    pub fn label(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.label.as_str())
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> Result<()> {
        self.selection_mut()?.label = label.into();
        Ok(())
    }

    pub fn operator_class(&self) -> Option<&str> {
        self.selection
            .as_ref()
            .and_then(|s| s.operator_class.as_deref())
    }

    /// Change the class. The operator type is re-derived on apply.
    pub fn set_operator_class(&mut self, class: Option<String>) -> Result<()> {
        let class = class
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.selection_mut()?.operator_class = class;
        Ok(())
    }

    /// Operator type the node will have after apply.
    pub fn derived_operator_type(&self) -> Option<OperatorType> {
        self.selection.as_ref().map(|s| {
            rederive_operator_type(
                &s.operator_type,
                s.applied_class.as_deref(),
                s.operator_class.as_deref(),
            )
        })
    }

    pub fn raw_text(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.raw.as_str())
    }

    /// Replace the raw JSON buffer. Malformed text is accepted here.
    pub fn edit_raw(&mut self, text: impl Into<String>) -> Result<()> {
        self.selection_mut()?.raw = text.into();
        Ok(())
    }

    /// Parse error of the current buffer, without recording it.
    pub fn parse_error(&self) -> Option<String> {
        let selection = self.selection.as_ref()?;
        parse_config(&selection.raw).err().map(|e| e.to_string())
    }

    /// Structured fields hydrated from the buffer.
    ///
    /// While the buffer is malformed the fields hydrate from an empty config.
    pub fn fields(&self) -> Vec<FormField> {
        match &self.selection {
            Some(s) => {
                let config = parse_config(&s.raw).unwrap_or_default();
                hydrate(s.operator_class.as_deref(), &config)
            }
            None => Vec::new(),
        }
    }

    /// Merge-write one top-level key into the buffer.
    ///
    /// Refused while the buffer is malformed; the buffer is left as typed
    /// and the parse error becomes the visible error.
    pub fn set_field(&mut self, key: &str, value: FieldValue) -> Result<()> {
        self.merge_key(key, value.to_json())
    }

    pub fn merge_key(&mut self, key: &str, value: Value) -> Result<()> {
        if key == UI_KEY {
            return Err(StudioError::validation("`ui` is reserved for the console"));
        }
        let mut config = match parse_config(&self.selection()?.raw) {
            Ok(config) => config,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err);
            }
        };
        config.insert(key.to_string(), value);
        self.selection_mut()?.raw = config_to_text(&config);
        self.error = None;
        Ok(())
    }

    /// Build the update for the store from the current buffer.
    pub fn build_patch(&self) -> Result<NodePatch> {
        let selection = self.selection()?;
        let config = parse_config(&selection.raw)?;
        let operator_type = rederive_operator_type(
            &selection.operator_type,
            selection.applied_class.as_deref(),
            selection.operator_class.as_deref(),
        );
        Ok(NodePatch {
            label: Some(selection.label.clone()),
            operator_type: Some(operator_type),
            operator_class: Some(selection.operator_class.clone()),
            config: Some(config),
            position: None,
        })
    }

    /// Validate the buffer and write the edits into the store.
    ///
    /// On failure the node is unchanged, the error is kept for inline display
    /// and also returned.
    pub fn apply(&mut self, store: &mut GraphStore) -> Result<()> {
        let result = self
            .build_patch()
            .and_then(|patch| {
                let node_id = self.selection()?.node_id.clone();
                let operator_type = patch.operator_type.clone();
                store.update_node(&node_id, patch)?;
                Ok(operator_type)
            });

        match result {
            Ok(operator_type) => {
                if let Some(selection) = self.selection.as_mut() {
                    selection.applied_class = selection.operator_class.clone();
                    if let Some(operator_type) = operator_type {
                        selection.operator_type = operator_type;
                    }
                    if let Ok(config) = parse_config(&selection.raw) {
                        selection.raw = config_to_text(&config);
                    }
                    debug!(node = %selection.node_id, "Applied node properties");
                }
                self.error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Rejected node properties");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    // ── Delete with confirmation ────────────────────────────────────

    pub fn request_delete(&mut self) -> Result<()> {
        self.selection()?;
        self.confirm_delete = true;
        Ok(())
    }

    pub fn is_delete_pending(&self) -> bool {
        self.confirm_delete
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    /// Delete the selected node after a request. Returns the number of
    /// edges removed with it.
    pub fn confirm_delete(&mut self, store: &mut GraphStore) -> Result<usize> {
        if !self.confirm_delete {
            return Err(StudioError::validation("Delete was not requested"));
        }
        let node_id = self.selection()?.node_id.clone();
        match store.delete_node(&node_id) {
            Ok(removed) => {
                self.close();
                Ok(removed)
            }
            Err(err) => {
                self.confirm_delete = false;
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}
