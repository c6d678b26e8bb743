//! Run-status overlay
//!
//! Decorates the topology a run executed with per-node execution state and
//! per-edge emphasis. The result is a read-only graph sharing node and edge
//! ids with the editor's graph; nothing here mutates a [`GraphStore`].
//!
//! Any change (a different run or a different step collection) re-runs the
//! whole decoration pass, layout included.
//!
//! [`GraphStore`]: crate::pipeline::GraphStore

pub mod monitor;
pub mod summary;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pipeline::id::NodeId;
use crate::pipeline::layout::{apply_layout, LayoutOptions};
use crate::pipeline::node::{graph_from_version, VisualEdge, VisualNode};
use crate::types::{PipelineRun, PipelineVersion, StepRun};

pub use monitor::{PollUpdate, RunMonitor};
pub use summary::{format_bytes, format_duration, format_throughput, RunSummary};

/// Normalised execution state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
}

impl VisualState {
    /// Normalise a backend step status.
    ///
    /// `completed`/`succeeded` count as success and `error` as failed.
    /// Cancelled, skipped, queued and unknown statuses show as pending.
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "running" => VisualState::Running,
            "success" | "succeeded" | "completed" => VisualState::Success,
            "failed" | "error" => VisualState::Failed,
            _ => VisualState::Pending,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, VisualState::Success | VisualState::Failed)
    }
}

/// How an edge is drawn, derived from its source node's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeEmphasis {
    Dim,
    /// Animated with glow
    Animated,
    /// Solid, emphasised
    Emphasized,
    Destructive,
}

impl EdgeEmphasis {
    pub fn for_source(state: VisualState) -> Self {
        match state {
            VisualState::Running => EdgeEmphasis::Animated,
            VisualState::Success => EdgeEmphasis::Emphasized,
            VisualState::Failed => EdgeEmphasis::Destructive,
            VisualState::Pending => EdgeEmphasis::Dim,
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, EdgeEmphasis::Animated)
    }

    pub fn has_glow(&self) -> bool {
        matches!(self, EdgeEmphasis::Animated)
    }
}

/// Rows out per second, when the step reported a positive duration.
pub fn throughput(step: &StepRun) -> Option<f64> {
    let duration = step.duration_seconds?;
    let records = step.records_out?;
    (duration > 0.0).then(|| records as f64 / duration)
}

/// A node of the run graph.
#[derive(Debug, Clone, PartialEq)]
pub struct RunNode {
    /// Visual node with `data.status` set
    pub node: VisualNode,
    pub step: Option<StepRun>,
    pub throughput: Option<f64>,
}

impl RunNode {
    pub fn state(&self) -> VisualState {
        self.node.data.status.unwrap_or_default()
    }
}

/// An edge of the run graph.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEdge {
    pub edge: VisualEdge,
    pub emphasis: EdgeEmphasis,
}

/// Read-only execution graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunGraph {
    pub nodes: Vec<RunNode>,
    pub edges: Vec<RunEdge>,
}

impl RunGraph {
    pub fn node(&self, id: &NodeId) -> Option<&RunNode> {
        self.nodes.iter().find(|n| &n.node.id == id)
    }

    pub fn edge(&self, source: &NodeId, target: &NodeId) -> Option<&RunEdge> {
        self.edges
            .iter()
            .find(|e| &e.edge.source == source && &e.edge.target == target)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_nodes(&self.nodes)
    }
}

/// Decorate a version topology with step telemetry.
///
/// Steps are joined by `node_id`; when a node has several records the last
/// one wins. Nodes without a step are pending. Positions always come from a
/// fresh layout.
pub fn decorate(version: &PipelineVersion, steps: &[StepRun], options: &LayoutOptions) -> RunGraph {
    let (mut nodes, edges) = graph_from_version(version);
    apply_layout(&mut nodes, &edges, options);

    let by_node: HashMap<&NodeId, &StepRun> = steps.iter().map(|s| (&s.node_id, s)).collect();

    let nodes: Vec<RunNode> = nodes
        .into_iter()
        .map(|mut node| {
            let step = by_node.get(&node.id).map(|s| (*s).clone());
            let state = step
                .as_ref()
                .map(|s| VisualState::from_status(&s.status))
                .unwrap_or_default();
            node.data.status = Some(state);
            let throughput = step.as_ref().and_then(throughput);
            RunNode {
                node,
                step,
                throughput,
            }
        })
        .collect();

    let state_of: HashMap<&NodeId, VisualState> =
        nodes.iter().map(|n| (&n.node.id, n.state())).collect();
    let edges = edges
        .into_iter()
        .map(|edge| {
            let state = state_of.get(&edge.source).copied().unwrap_or_default();
            RunEdge {
                edge,
                emphasis: EdgeEmphasis::for_source(state),
            }
        })
        .collect();

    RunGraph { nodes, edges }
}

/// Decorate a run detail. `None` when the run carries no topology.
pub fn decorate_run(run: &PipelineRun, options: &LayoutOptions) -> Option<RunGraph> {
    run.version
        .as_ref()
        .map(|version| decorate(version, &run.step_runs, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperatorType, PipelineEdge, PipelineNode};

    fn version() -> PipelineVersion {
        PipelineVersion {
            id: 1,
            pipeline_id: 1,
            version: 1,
            nodes: vec![
                PipelineNode::new("src", "Read", OperatorType::Extract),
                PipelineNode::new("xf", "Clean", OperatorType::Transform),
                PipelineNode::new("dst", "Write", OperatorType::Load),
            ],
            edges: vec![PipelineEdge::new("src", "xf"), PipelineEdge::new("xf", "dst")],
            is_published: true,
            version_notes: None,
            created_at: None,
        }
    }

    #[test]
    fn test_status_normalisation() {
        assert_eq!(VisualState::from_status("completed"), VisualState::Success);
        assert_eq!(VisualState::from_status("SUCCESS"), VisualState::Success);
        assert_eq!(VisualState::from_status("error"), VisualState::Failed);
        assert_eq!(VisualState::from_status("running"), VisualState::Running);
        assert_eq!(VisualState::from_status("cancelled"), VisualState::Pending);
        assert_eq!(VisualState::from_status("mystery"), VisualState::Pending);
    }

    #[test]
    fn test_completed_step_throughput() {
        let mut step = StepRun::new("src", "completed");
        step.records_in = Some(100);
        step.records_out = Some(80);
        step.duration_seconds = Some(2.0);

        let graph = decorate(&version(), &[step], &LayoutOptions::default());
        let node = graph.node(&"src".into()).unwrap();
        assert_eq!(node.state(), VisualState::Success);
        assert_eq!(node.throughput, Some(40.0));
    }

    #[test]
    fn test_zero_duration_has_no_throughput() {
        let mut step = StepRun::new("src", "running");
        step.records_out = Some(10);
        step.duration_seconds = Some(0.0);
        assert_eq!(throughput(&step), None);
    }

    #[test]
    fn test_edge_emphasis_follows_source() {
        let steps = vec![StepRun::new("src", "running"), StepRun::new("xf", "error")];
        let graph = decorate(&version(), &steps, &LayoutOptions::default());
        assert_eq!(
            graph.edge(&"src".into(), &"xf".into()).unwrap().emphasis,
            EdgeEmphasis::Animated
        );
        assert_eq!(
            graph.edge(&"xf".into(), &"dst".into()).unwrap().emphasis,
            EdgeEmphasis::Destructive
        );
        assert_eq!(
            graph.node(&"dst".into()).unwrap().state(),
            VisualState::Pending
        );
    }

    #[test]
    fn test_every_node_is_positioned() {
        let graph = decorate(&version(), &[], &LayoutOptions::default());
        assert!(graph.nodes.iter().all(|n| n.node.position().is_some()));
        assert!(graph
            .edges
            .iter()
            .all(|e| e.emphasis == EdgeEmphasis::Dim));
    }

    #[test]
    fn test_decorate_run_without_version() {
        let run = PipelineRun {
            id: 1,
            pipeline_id: 1,
            job_id: None,
            status: "pending".into(),
            version: None,
            step_runs: vec![],
            started_at: None,
            finished_at: None,
        };
        assert!(decorate_run(&run, &LayoutOptions::default()).is_none());
    }
}
