//! Core data types for ETL Studio
//!
//! These are the backend's shapes, exchanged as JSON with the orchestration
//! API. The editor never renders them directly: [`crate::pipeline::node`]
//! converts them into visual nodes and back.
//!
//! # Main Types
//!
//! - [`OperatorType`] - Backend operator vocabulary (extract, transform, load, ...)
//! - [`PipelineNode`] / [`PipelineEdge`] - One operator and one data-flow dependency
//! - [`PipelineVersion`] - Immutable, monotonically numbered snapshot of a pipeline graph
//! - [`Pipeline`] - A pipeline with its latest and published versions
//! - [`StepRun`] / [`PipelineRun`] - Execution telemetry for one job run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::pipeline::id::{NodeId, PipelineId, RunId, VersionId};

/// Operator vocabulary of the backend.
///
/// Strings the console does not know are kept verbatim in `Other` so a newer
/// backend vocabulary survives a load/save round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperatorType {
    Extract,
    Transform,
    Load,
    Validate,
    Merge,
    Union,
    Join,
    Noop,
    Other(String),
}

impl OperatorType {
    /// All operator types the console knows about.
    pub fn known() -> [OperatorType; 8] {
        [
            OperatorType::Extract,
            OperatorType::Transform,
            OperatorType::Load,
            OperatorType::Validate,
            OperatorType::Merge,
            OperatorType::Union,
            OperatorType::Join,
            OperatorType::Noop,
        ]
    }

    /// Parse a backend string, case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "extract" => OperatorType::Extract,
            "transform" => OperatorType::Transform,
            "load" => OperatorType::Load,
            "validate" => OperatorType::Validate,
            "merge" => OperatorType::Merge,
            "union" => OperatorType::Union,
            "join" => OperatorType::Join,
            "noop" => OperatorType::Noop,
            _ => OperatorType::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OperatorType::Extract => "extract",
            OperatorType::Transform => "transform",
            OperatorType::Load => "load",
            OperatorType::Validate => "validate",
            OperatorType::Merge => "merge",
            OperatorType::Union => "union",
            OperatorType::Join => "join",
            OperatorType::Noop => "noop",
            OperatorType::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, OperatorType::Other(_))
    }
}

impl From<String> for OperatorType {
    fn from(value: String) -> Self {
        OperatorType::parse(&value)
    }
}

impl From<OperatorType> for String {
    fn from(value: OperatorType) -> Self {
        match value {
            OperatorType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 2-D canvas coordinate (top-left corner of a node).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One operator as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineNode {
    /// Unique within a version
    pub node_id: NodeId,
    pub name: String,
    pub operator_type: OperatorType,
    /// Transform sub-kind (filter, aggregate, join, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_class: Option<String>,
    /// Opaque operator configuration; `ui` is reserved for the console
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_asset_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_asset_id: Option<i64>,
}

impl PipelineNode {
    pub fn new(
        node_id: impl Into<NodeId>,
        name: impl Into<String>,
        operator_type: OperatorType,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            name: name.into(),
            operator_type,
            operator_class: None,
            config: empty_object(),
            source_asset_id: None,
            destination_asset_id: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.operator_class = Some(class.into());
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

/// Directed data-flow dependency between two nodes of the same version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineEdge {
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
}

impl PipelineEdge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from_node_id: from.into(),
            to_node_id: to.into(),
        }
    }
}

/// Immutable snapshot of a pipeline graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineVersion {
    pub id: VersionId,
    pub pipeline_id: PipelineId,
    /// Monotonic version number (1, 2, 3, ...)
    pub version: u32,
    #[serde(default)]
    pub nodes: Vec<PipelineNode>,
    #[serde(default)]
    pub edges: Vec<PipelineEdge>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A pipeline as returned by `GET /pipelines/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Most recently saved version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<PipelineVersion>,
    /// Currently live version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_version: Option<PipelineVersion>,
}

/// Per-node execution record for one job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRun {
    pub node_id: NodeId,
    /// Raw backend status (pending, running, success, completed, failed, error, cancelled)
    pub status: String,
    #[serde(default)]
    pub records_in: Option<u64>,
    #[serde(default)]
    pub records_out: Option<u64>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub bytes_processed: Option<u64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRun {
    pub fn new(node_id: impl Into<NodeId>, status: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            status: status.into(),
            records_in: None,
            records_out: None,
            duration_seconds: None,
            bytes_processed: None,
            error_message: None,
            retry_count: 0,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Run detail: the topology the run executed plus its step telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub pipeline_id: PipelineId,
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: String,
    /// Version the run executed
    #[serde(default)]
    pub version: Option<PipelineVersion>,
    #[serde(default)]
    pub step_runs: Vec<StepRun>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Whether the run reached a status after which telemetry is frozen.
    pub fn is_terminal(&self) -> bool {
        is_terminal_status(&self.status)
    }
}

/// Terminal run/step statuses as reported by the backend.
pub fn is_terminal_status(status: &str) -> bool {
    matches!(
        status.trim().to_ascii_lowercase().as_str(),
        "success" | "succeeded" | "completed" | "failed" | "error" | "cancelled" | "canceled"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_type_parse_known() {
        for op in OperatorType::known() {
            assert_eq!(OperatorType::parse(op.as_str()), op);
        }
        assert_eq!(OperatorType::parse("  EXTRACT "), OperatorType::Extract);
    }

    #[test]
    fn test_unknown_operator_type_survives_round_trip() {
        let node: PipelineNode = serde_json::from_value(json!({
            "node_id": "n1",
            "name": "Stream",
            "operator_type": "stream_window",
            "config": {}
        }))
        .unwrap();
        assert_eq!(
            node.operator_type,
            OperatorType::Other("stream_window".to_string())
        );

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["operator_type"], json!("stream_window"));
    }

    #[test]
    fn test_node_defaults() {
        let node: PipelineNode = serde_json::from_value(json!({
            "node_id": "n1",
            "name": "Read",
            "operator_type": "extract"
        }))
        .unwrap();
        assert_eq!(node.config, json!({}));
        assert!(node.operator_class.is_none());
        assert!(node.source_asset_id.is_none());
    }

    #[test]
    fn test_version_deserializes_without_graph() {
        let version: PipelineVersion = serde_json::from_value(json!({
            "id": 12,
            "pipeline_id": 3,
            "version": 4
        }))
        .unwrap();
        assert!(version.nodes.is_empty());
        assert!(!version.is_published);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(is_terminal_status("completed"));
        assert!(is_terminal_status("ERROR"));
        assert!(is_terminal_status("cancelled"));
        assert!(!is_terminal_status("running"));
        assert!(!is_terminal_status("pending"));
    }
}
