//! Identity types for the pipeline graph.
//!
//! Node ids are strings owned by the backend (`node_id`); ids minted by the
//! editor are time-based and unique within the process.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Backend identifier of a pipeline.
pub type PipelineId = i64;
/// Backend identifier of a pipeline version.
pub type VersionId = i64;
/// Backend identifier of a pipeline run.
pub type RunId = i64;

static NEXT_LOCAL_NODE: AtomicU64 = AtomicU64::new(0);

/// Stable operator identity, the join key between backend nodes, visual
/// nodes, and step runs.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh id for a node created in the editor.
    ///
    /// Combines the wall-clock millisecond with a process-wide counter so two
    /// nodes added within the same millisecond still differ.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = NEXT_LOCAL_NODE.fetch_add(1, Ordering::Relaxed);
        Self(format!("node_{millis}_{seq}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Visual edge id derived from its endpoints.
///
/// The source length prefix keeps ids distinct for any node ids, including
/// ones that contain the separator.
pub fn edge_id(source: &NodeId, target: &NodeId) -> String {
    format!("e{}-{}-{}", source.as_str().len(), source, target)
}
