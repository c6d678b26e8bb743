//! Graph state store: the editable working copy of one pipeline version.
//!
//! Every mutation is local until the lifecycle controller saves. A store
//! marked read-only (historical view) rejects each mutation with
//! [`StudioError::ReadOnly`] and leaves its state untouched.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StudioError};
use crate::pipeline::id::NodeId;
use crate::pipeline::layout::{apply_layout, compute_layout, LayoutOptions};
use crate::pipeline::node::{
    graph_from_version, graph_to_backend, NodeData, NodePatch, VisualEdge, VisualNode,
};
use crate::pipeline::taxonomy::{to_operator_type, OperatorClass, VisualKind};
use crate::pipeline::topology::would_create_cycle;
use crate::types::{PipelineEdge, PipelineNode, PipelineVersion, Position};

/// Where a freshly added node lands.
const DEFAULT_ORIGIN: Position = Position::new(250.0, 150.0);
/// Offset between consecutively added nodes.
const CASCADE_STEP: f64 = 30.0;
/// Cascade wraps back to the origin after this many nodes.
const CASCADE_WRAP: usize = 10;

/// Client-side rule for edges that would close a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePolicy {
    /// Reject cycle-closing edges
    #[default]
    Acyclic,
    /// Accept any edge between existing nodes
    Permissive,
}

/// Result of a successful [`GraphStore::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// A new edge was appended
    Added(String),
    /// The edge already existed; nothing changed
    AlreadyPresent,
}

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<VisualNode>,
    edges: Vec<VisualEdge>,
    edge_policy: EdgePolicy,
    read_only: bool,
    dirty: bool,
    added: usize,
}

impl GraphStore {
    pub fn new(edge_policy: EdgePolicy) -> Self {
        Self {
            edge_policy,
            ..Self::default()
        }
    }

    // ── Loading ─────────────────────────────────────────────────────

    /// Replace the working copy with a backend version.
    ///
    /// Nodes without a persisted position are laid out before the graph is
    /// exposed. The store is clean afterwards.
    pub fn load_version(&mut self, version: &PipelineVersion, options: &LayoutOptions) {
        let (nodes, edges) = graph_from_version(version);
        self.replace(nodes, edges);
        self.apply_missing_layout(options);
        debug!(
            version = version.version,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Loaded version into graph store"
        );
    }

    /// Replace nodes and edges wholesale and mark the store clean.
    pub fn replace(&mut self, nodes: Vec<VisualNode>, edges: Vec<VisualEdge>) {
        self.nodes = nodes;
        self.edges = edges;
        self.dirty = false;
        self.added = 0;
    }

    /// Empty canvas.
    pub fn clear(&mut self) {
        self.replace(Vec::new(), Vec::new());
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[VisualNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[VisualEdge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn has_edge(&self, source: &NodeId, target: &NodeId) -> bool {
        self.edges
            .iter()
            .any(|e| &e.source == source && &e.target == target)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    pub fn set_edge_policy(&mut self, policy: EdgePolicy) {
        self.edge_policy = policy;
    }

    /// Backend nodes and edges for the working copy, positions written to
    /// `config.ui.position`.
    pub fn to_backend(&self) -> (Vec<PipelineNode>, Vec<PipelineEdge>) {
        graph_to_backend(&self.nodes, &self.edges)
    }

    // ── Mutations ───────────────────────────────────────────────────

    fn guard(&self, operation: &'static str) -> Result<()> {
        if self.read_only {
            warn!(operation, "Rejected edit on read-only graph");
            return Err(StudioError::ReadOnly { operation });
        }
        Ok(())
    }

    fn node_mut(&mut self, id: &NodeId) -> Result<&mut VisualNode> {
        self.nodes
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| StudioError::UnknownNode(id.clone()))
    }

    /// Add a node of the given kind and return its fresh id.
    pub fn add_node(
        &mut self,
        kind: VisualKind,
        operator_class: Option<&str>,
        label: Option<&str>,
    ) -> Result<NodeId> {
        self.guard("add node")?;

        let id = NodeId::generate();
        let label = match label {
            Some(label) => label.to_string(),
            None => operator_class
                .and_then(OperatorClass::parse)
                .map(|c| c.display_name())
                .unwrap_or_else(|| kind.display_name())
                .to_string(),
        };
        let offset = (self.added % CASCADE_WRAP) as f64 * CASCADE_STEP;
        let position = Position::new(DEFAULT_ORIGIN.x + offset, DEFAULT_ORIGIN.y + offset);

        self.nodes.push(VisualNode {
            id: id.clone(),
            data: NodeData {
                label,
                operator_type: to_operator_type(kind, operator_class),
                operator_class: operator_class.map(str::to_string),
                config: serde_json::Map::new(),
                ui_extra: serde_json::Map::new(),
                status: None,
                position: Some(position),
                source_asset_id: None,
                destination_asset_id: None,
            },
        });
        self.added += 1;
        self.dirty = true;
        debug!(node = %id, kind = kind.as_str(), "Added node");
        Ok(id)
    }

    /// Connect `source -> target`.
    ///
    /// Both endpoints must exist and differ. Under [`EdgePolicy::Acyclic`]
    /// an edge closing a cycle is rejected.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<Connection> {
        self.guard("connect nodes")?;

        if source == target {
            warn!(node = %source, "Rejected self-loop");
            return Err(StudioError::SelfLoop(source.clone()));
        }
        for endpoint in [source, target] {
            if !self.contains(endpoint) {
                warn!(node = %endpoint, "Rejected edge to unknown node");
                return Err(StudioError::UnknownNode(endpoint.clone()));
            }
        }
        if self.has_edge(source, target) {
            return Ok(Connection::AlreadyPresent);
        }
        if self.edge_policy == EdgePolicy::Acyclic {
            let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.id.clone()).collect();
            let pairs: Vec<(NodeId, NodeId)> = self
                .edges
                .iter()
                .map(|e| (e.source.clone(), e.target.clone()))
                .collect();
            if would_create_cycle(&ids, &pairs, source, target) {
                warn!(from = %source, to = %target, "Rejected cycle-closing edge");
                return Err(StudioError::CycleDetected {
                    from: source.clone(),
                    to: target.clone(),
                });
            }
        }

        let edge = VisualEdge::new(source.clone(), target.clone());
        let id = edge.id.clone();
        self.edges.push(edge);
        self.dirty = true;
        debug!(edge = %id, "Connected nodes");
        Ok(Connection::Added(id))
    }

    /// Remove the edge `source -> target`. Returns whether one existed.
    pub fn disconnect(&mut self, source: &NodeId, target: &NodeId) -> Result<bool> {
        self.guard("disconnect nodes")?;
        let before = self.edges.len();
        self.edges
            .retain(|e| !(&e.source == source && &e.target == target));
        let removed = self.edges.len() != before;
        if removed {
            self.dirty = true;
            debug!(from = %source, to = %target, "Disconnected nodes");
        }
        Ok(removed)
    }

    /// Merge a partial update into a node's data.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> Result<()> {
        self.guard("update node")?;
        let node = self.node_mut(id)?;
        patch.apply(&mut node.data);
        self.dirty = true;
        debug!(node = %id, "Updated node");
        Ok(())
    }

    /// Delete a node and every edge referencing it. Returns the number of
    /// edges removed.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<usize> {
        self.guard("delete node")?;
        let index = self
            .nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| StudioError::UnknownNode(id.clone()))?;
        self.nodes.remove(index);

        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        let removed = before - self.edges.len();
        self.dirty = true;
        debug!(node = %id, edges_removed = removed, "Deleted node");
        Ok(removed)
    }

    /// Update a node's position only.
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> Result<()> {
        self.guard("move node")?;
        self.node_mut(id)?.data.position = Some(position);
        self.dirty = true;
        Ok(())
    }

    /// Recompute every position.
    pub fn auto_layout(&mut self, options: &LayoutOptions) -> Result<()> {
        self.guard("auto layout")?;
        apply_layout(&mut self.nodes, &self.edges, options);
        if !self.nodes.is_empty() {
            self.dirty = true;
        }
        debug!(nodes = self.nodes.len(), "Auto layout applied");
        Ok(())
    }

    /// Give positions to nodes that have none.
    ///
    /// With no persisted positions at all the whole graph is laid out;
    /// otherwise only the unpositioned nodes take their layout slot and
    /// manual positions are kept. Does not mark the store dirty.
    pub fn apply_missing_layout(&mut self, options: &LayoutOptions) -> bool {
        let missing = self.nodes.iter().filter(|n| n.position().is_none()).count();
        if missing == 0 {
            return false;
        }
        if missing == self.nodes.len() {
            apply_layout(&mut self.nodes, &self.edges, options);
        } else {
            let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.id.clone()).collect();
            let pairs: Vec<(NodeId, NodeId)> = self
                .edges
                .iter()
                .map(|e| (e.source.clone(), e.target.clone()))
                .collect();
            let layout = compute_layout(&ids, &pairs, options);
            for (node, position) in self.nodes.iter_mut().zip(layout.positions) {
                node.data.position.get_or_insert(position);
            }
        }
        debug!(missing, "Laid out unpositioned nodes");
        true
    }
}
