//! Visual graph elements and their mapping to the backend schema.
//!
//! A [`VisualNode`] shares its id with the backend `node_id`. Its kind is
//! derived on demand from the operator type, and its position lives in the
//! `ui` config extension when persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::overlay::VisualState;
use crate::pipeline::extension::{join_config, split_config, UiExtension};
use crate::pipeline::id::{edge_id, NodeId};
use crate::pipeline::taxonomy::{to_visual_kind, VisualKind};
use crate::types::{OperatorType, PipelineEdge, PipelineNode, PipelineVersion, Position};

/// Payload of a visual node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    pub operator_type: OperatorType,
    pub operator_class: Option<String>,
    /// Operator config without the reserved `ui` key
    pub config: Map<String, Value>,
    /// `ui` keys the console does not interpret
    #[serde(default)]
    pub ui_extra: Map<String, Value>,
    /// Execution state, only set on run-overlay graphs
    #[serde(default)]
    pub status: Option<VisualState>,
    /// Top-left corner; `None` until laid out or placed
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub source_asset_id: Option<i64>,
    #[serde(default)]
    pub destination_asset_id: Option<i64>,
}

/// A node as the canvas sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    pub id: NodeId,
    pub data: NodeData,
}

impl VisualNode {
    /// Derived canvas kind. Never stored.
    #[inline]
    pub fn kind(&self) -> VisualKind {
        to_visual_kind(&self.data.operator_type, self.data.operator_class.as_deref())
    }

    pub fn position(&self) -> Option<Position> {
        self.data.position
    }

    pub fn from_backend(node: &PipelineNode) -> Self {
        let (config, ui) = split_config(&node.config);
        Self {
            id: node.node_id.clone(),
            data: NodeData {
                label: node.name.clone(),
                operator_type: node.operator_type.clone(),
                operator_class: node.operator_class.clone(),
                config,
                ui_extra: ui.extra,
                status: None,
                position: ui.position,
                source_asset_id: node.source_asset_id,
                destination_asset_id: node.destination_asset_id,
            },
        }
    }

    /// Convert back, writing the position into `config.ui.position`.
    pub fn to_backend(&self) -> PipelineNode {
        let ui = UiExtension {
            position: self.data.position,
            extra: self.data.ui_extra.clone(),
        };
        PipelineNode {
            node_id: self.id.clone(),
            name: self.data.label.clone(),
            operator_type: self.data.operator_type.clone(),
            operator_class: self.data.operator_class.clone(),
            config: join_config(self.data.config.clone(), &ui),
            source_asset_id: self.data.source_asset_id,
            destination_asset_id: self.data.destination_asset_id,
        }
    }
}

/// A directed edge on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

impl VisualEdge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: edge_id(&source, &target),
            source,
            target,
        }
    }

    pub fn from_backend(edge: &PipelineEdge) -> Self {
        Self::new(edge.from_node_id.clone(), edge.to_node_id.clone())
    }

    pub fn to_backend(&self) -> PipelineEdge {
        PipelineEdge {
            from_node_id: self.source.clone(),
            to_node_id: self.target.clone(),
        }
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

/// Partial update merged into [`NodeData`] by `update_node`.
///
/// `None` leaves a field untouched. `config` replaces the operator config as
/// a whole; merging individual keys happens in the property editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub label: Option<String>,
    pub operator_type: Option<OperatorType>,
    pub operator_class: Option<Option<String>>,
    pub config: Option<Map<String, Value>>,
    pub position: Option<Position>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self == &NodePatch::default()
    }

    pub fn apply(self, data: &mut NodeData) {
        if let Some(label) = self.label {
            data.label = label;
        }
        if let Some(operator_type) = self.operator_type {
            data.operator_type = operator_type;
        }
        if let Some(class) = self.operator_class {
            data.operator_class = class;
        }
        if let Some(config) = self.config {
            data.config = config;
        }
        if let Some(position) = self.position {
            data.position = Some(position);
        }
    }
}

/// Convert a backend version into visual nodes and edges.
pub fn graph_from_version(version: &PipelineVersion) -> (Vec<VisualNode>, Vec<VisualEdge>) {
    let nodes = version.nodes.iter().map(VisualNode::from_backend).collect();
    let edges = version.edges.iter().map(VisualEdge::from_backend).collect();
    (nodes, edges)
}

/// Convert visual nodes and edges back into the backend schema.
pub fn graph_to_backend(
    nodes: &[VisualNode],
    edges: &[VisualEdge],
) -> (Vec<PipelineNode>, Vec<PipelineEdge>) {
    (
        nodes.iter().map(VisualNode::to_backend).collect(),
        edges.iter().map(VisualEdge::to_backend).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend_filter() -> PipelineNode {
        PipelineNode::new("f1", "Adults", OperatorType::Transform)
            .with_class("filter")
            .with_config(json!({
                "condition": "age > 30",
                "ui": { "position": { "x": 120.0, "y": 40.0 }, "color": "teal" }
            }))
    }

    #[test]
    fn test_from_backend_splits_ui() {
        let node = VisualNode::from_backend(&backend_filter());
        assert_eq!(node.id.as_str(), "f1");
        assert_eq!(node.kind(), VisualKind::Transform);
        assert_eq!(node.position(), Some(Position::new(120.0, 40.0)));
        assert!(!node.data.config.contains_key("ui"));
        assert_eq!(node.data.ui_extra["color"], json!("teal"));
    }

    #[test]
    fn test_backend_round_trip_is_lossless() {
        let original = backend_filter();
        let back = VisualNode::from_backend(&original).to_backend();
        assert_eq!(back, original);
    }

    #[test]
    fn test_to_backend_writes_moved_position() {
        let mut node = VisualNode::from_backend(&PipelineNode::new(
            "s1",
            "Read",
            OperatorType::Extract,
        ));
        assert_eq!(node.position(), None);
        node.data.position = Some(Position::new(3.0, 4.0));
        let back = node.to_backend();
        assert_eq!(back.config["ui"]["position"], json!({ "x": 3.0, "y": 4.0 }));
    }

    #[test]
    fn test_kind_is_not_serialized() {
        let node = VisualNode::from_backend(&backend_filter());
        let value = serde_json::to_value(&node).unwrap();
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_patch_merges_only_given_fields() {
        let mut node = VisualNode::from_backend(&backend_filter());
        NodePatch {
            label: Some("Seniors".into()),
            ..NodePatch::default()
        }
        .apply(&mut node.data);
        assert_eq!(node.data.label, "Seniors");
        assert_eq!(node.data.config["condition"], json!("age > 30"));
        assert_eq!(node.data.operator_class.as_deref(), Some("filter"));
    }

    #[test]
    fn test_edge_ids() {
        let edge = VisualEdge::from_backend(&PipelineEdge::new("a", "b"));
        assert_eq!(edge.id, "e1-a-b");
        assert!(edge.touches(&NodeId::from("a")));
        assert!(!edge.touches(&NodeId::from("c")));
    }
}
