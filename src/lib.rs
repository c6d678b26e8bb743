//! # ETL Studio: pipeline graph model, editor and run visualization
//!
//! The console core for configuring, running and inspecting data
//! integration pipelines served by an external orchestration API. Pipeline
//! execution happens on the backend; this crate owns the client side of it.
//!
//! ## Architecture
//!
//! - **Pipeline**: operator taxonomy, visual graph model, layered layout and
//!   the editable [`GraphStore`](pipeline::GraphStore)
//! - **Lifecycle**: draft → published → historical transitions and loads
//! - **Editor**: property editor over a node's opaque config
//! - **Overlay**: read-only run graph with per-node execution state
//! - **Backend**: the [`PipelineBackend`](backend::PipelineBackend) seam with
//!   HTTP and in-memory implementations
//! - **Frontend**: action dispatch, notifications and the page boundary
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform data directory under
//! `dev.etl-studio`:
//!
//! - **Linux**: `~/.local/share/dev.etl-studio/`
//! - **macOS**: `~/Library/Application Support/dev.etl-studio/`
//! - **Windows**: `%APPDATA%\dev.etl-studio\`
//!
//! `ETL_STUDIO_API_URL` overrides the API base URL.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use etl_studio::{
//!     backend::HttpBackend,
//!     config::StudioConfig,
//!     frontend::{EditorAction, EditorSession, NotificationCenter},
//!     pipeline::VisualKind,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StudioConfig::load_or_default();
//!     let backend = Arc::new(HttpBackend::from_config(&config.api)?);
//!     let notices = NotificationCenter::new();
//!     let mut session = EditorSession::new(backend, &config, notices.notifier());
//!
//!     session
//!         .dispatch(EditorAction::Open { pipeline_id: 1, version_id: None })
//!         .await;
//!     session
//!         .dispatch(EditorAction::AddNode {
//!             kind: VisualKind::Sink,
//!             operator_class: None,
//!             label: Some("Warehouse".into()),
//!         })
//!         .await;
//!     session
//!         .dispatch(EditorAction::Save { notes: None, deploy: true })
//!         .await;
//!
//!     for notice in notices.drain() {
//!         println!("{:?}: {}", notice.level, notice.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod editor;
pub mod error;
pub mod frontend;
pub mod lifecycle;
pub mod overlay;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use backend::{HttpBackend, InMemoryBackend, PipelineBackend};
pub use config::StudioConfig;
pub use editor::PropertyEditor;
pub use error::{Result, StudioError};
pub use frontend::{EditorAction, EditorSession};
pub use lifecycle::{VersionController, VersionState};
pub use overlay::{RunGraph, RunMonitor, VisualState};
pub use pipeline::{GraphStore, LayoutOptions, NodeId, VisualKind};
pub use types::{
    OperatorType, Pipeline, PipelineEdge, PipelineNode, PipelineRun, PipelineVersion, StepRun,
};
