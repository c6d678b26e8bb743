//! Pipeline graph model.
//!
//! Backend operators (extract, transform, load, ...) are shown as visual
//! nodes of kind Source → Transform → Sink. The store holds the working copy
//! the canvas edits; the layout engine positions nodes that have no
//! persisted position.
//!
//! # Architecture
//!
//! ```text
//! PipelineVersion ──► node::graph_from_version ──► layout ──► GraphStore
//!        ▲                                                        │
//!        └──────────────── node::graph_to_backend ◄───────────────┘
//! ```
//!
//! # Design
//!
//! - **Derived kinds** - `VisualKind` is recomputed by `taxonomy`, never stored.
//! - **Typed extension** - positions persist under the reserved `ui` config key.
//! - **Checked edges** - `connect` validates endpoints and, by default, acyclicity.

pub mod extension;
pub mod id;
pub mod layout;
pub mod node;
pub mod store;
pub mod taxonomy;
pub mod topology;

pub use extension::{UiExtension, UI_KEY};
pub use id::{edge_id, NodeId, PipelineId, RunId, VersionId};
pub use layout::{compute_layout, layout, Layout, LayoutOptions, RankDir};
pub use node::{graph_from_version, graph_to_backend, NodeData, NodePatch, VisualEdge, VisualNode};
pub use store::{Connection, EdgePolicy, GraphStore};
pub use taxonomy::{
    rederive_operator_type, to_operator_type, to_visual_kind, OperatorClass, VisualKind,
};
