//! Version lifecycle
//!
//! A pipeline moves through four editor states:
//!
//! ```text
//! NEW ──save──► DRAFT ──save(deploy)──► PUBLISHED
//!                 ▲  └──save──┘             │
//!                 └──────── exit ◄── HISTORICAL (read-only)
//! ```
//!
//! The [`VersionController`] owns the working [`GraphStore`] and is the only
//! component that replaces its contents or talks to the backend on save.
//!
//! [`GraphStore`]: crate::pipeline::GraphStore

pub mod controller;
pub mod ticket;

use serde::{Deserialize, Serialize};

use crate::types::{Pipeline, PipelineVersion};

pub use controller::{LoadResult, SaveOutcome, VersionController};
pub use ticket::{LoadGeneration, LoadMode, LoadTicket};

/// Editor state of the loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionState {
    /// Pipeline not yet created on the backend
    New,
    /// Latest saved version, not published
    Draft,
    /// The live version
    Published,
    /// Any other snapshot; read-only
    Historical,
}

impl VersionState {
    pub fn is_editable(&self) -> bool {
        !matches!(self, VersionState::Historical)
    }

    pub fn label(&self) -> &'static str {
        match self {
            VersionState::New => "New",
            VersionState::Draft => "Draft",
            VersionState::Published => "Published",
            VersionState::Historical => "Historical",
        }
    }
}

impl std::fmt::Display for VersionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a loaded version by identity.
///
/// Explicit historical navigation always yields `Historical`. Otherwise the
/// published version is `Published`, the latest unpublished one is `Draft`
/// and anything else is `Historical`. No version at all is an empty `Draft`.
pub fn classify(
    version: Option<&PipelineVersion>,
    pipeline: &Pipeline,
    mode: LoadMode,
) -> VersionState {
    if mode == LoadMode::Historical {
        return VersionState::Historical;
    }
    let Some(version) = version else {
        return VersionState::Draft;
    };
    let published = version.is_published
        || pipeline
            .published_version
            .as_ref()
            .is_some_and(|p| p.id == version.id);
    let latest = pipeline
        .latest_version
        .as_ref()
        .map_or(true, |l| l.id == version.id);

    if published {
        VersionState::Published
    } else if latest {
        VersionState::Draft
    } else {
        VersionState::Historical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(id: i64, number: u32, published: bool) -> PipelineVersion {
        PipelineVersion {
            id,
            pipeline_id: 1,
            version: number,
            nodes: vec![],
            edges: vec![],
            is_published: published,
            version_notes: None,
            created_at: None,
        }
    }

    fn pipeline(latest: PipelineVersion, published: Option<PipelineVersion>) -> Pipeline {
        Pipeline {
            id: 1,
            name: "p".into(),
            description: None,
            latest_version: Some(latest),
            published_version: published,
        }
    }

    #[test]
    fn test_latest_unpublished_is_draft() {
        let v2 = version(2, 2, false);
        let p = pipeline(v2.clone(), Some(version(1, 1, true)));
        assert_eq!(classify(Some(&v2), &p, LoadMode::Open), VersionState::Draft);
    }

    #[test]
    fn test_published_is_published() {
        let v1 = version(1, 1, true);
        let p = pipeline(version(2, 2, false), Some(v1.clone()));
        assert_eq!(
            classify(Some(&v1), &p, LoadMode::Open),
            VersionState::Published
        );
    }

    #[test]
    fn test_old_snapshot_is_historical() {
        let v1 = version(1, 1, false);
        let p = pipeline(version(3, 3, false), Some(version(2, 2, true)));
        assert_eq!(
            classify(Some(&v1), &p, LoadMode::Open),
            VersionState::Historical
        );
    }

    #[test]
    fn test_explicit_historical_navigation() {
        let v2 = version(2, 2, false);
        let p = pipeline(v2.clone(), None);
        assert_eq!(
            classify(Some(&v2), &p, LoadMode::Historical),
            VersionState::Historical
        );
        assert!(!VersionState::Historical.is_editable());
    }

    #[test]
    fn test_no_version_is_empty_draft() {
        let p = Pipeline {
            id: 1,
            name: "p".into(),
            description: None,
            latest_version: None,
            published_version: None,
        };
        assert_eq!(classify(None, &p, LoadMode::Open), VersionState::Draft);
    }
}
