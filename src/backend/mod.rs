//! Orchestration API seam
//!
//! [`PipelineBackend`] describes every call the console makes to the
//! orchestration service. Two implementations ship with the crate:
//!
//! - [`HttpBackend`] - the real service over HTTP (reqwest)
//! - [`InMemoryBackend`] - an in-process store for offline sessions and tests
//!
//! Callers hold the backend as `Arc<dyn PipelineBackend>`, so the lifecycle
//! controller and run monitor never know which one they talk to.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::id::{PipelineId, RunId, VersionId};
use crate::types::{Pipeline, PipelineEdge, PipelineNode, PipelineRun, PipelineVersion};

pub use http::HttpBackend;
pub use memory::{FailPoint, InMemoryBackend};

/// Body of `POST /pipelines/{id}/versions`, also nested in pipeline creation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateVersionRequest {
    pub nodes: Vec<PipelineNode>,
    pub edges: Vec<PipelineEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_notes: Option<String>,
}

/// Body of `POST /pipelines`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePipelineRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub initial_version: CreateVersionRequest,
}

/// Response of `POST /pipelines/{id}/trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub job_id: String,
}

/// Calls the console makes against the orchestration API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    /// `GET /pipelines/{id}`
    async fn get_pipeline(&self, pipeline_id: PipelineId) -> Result<Pipeline>;

    /// `GET /pipelines/{id}/versions`
    async fn list_versions(&self, pipeline_id: PipelineId) -> Result<Vec<PipelineVersion>>;

    /// `GET /pipelines/{id}/versions/{versionId}`
    async fn get_version(
        &self,
        pipeline_id: PipelineId,
        version_id: VersionId,
    ) -> Result<PipelineVersion>;

    /// `POST /pipelines`; creates the pipeline together with version 1.
    async fn create_pipeline(&self, request: CreatePipelineRequest) -> Result<Pipeline>;

    /// `POST /pipelines/{id}/versions`
    async fn create_version(
        &self,
        pipeline_id: PipelineId,
        request: CreateVersionRequest,
    ) -> Result<PipelineVersion>;

    /// `POST /pipelines/{id}/versions/{versionId}/publish`
    async fn publish_version(
        &self,
        pipeline_id: PipelineId,
        version_id: VersionId,
    ) -> Result<PipelineVersion>;

    /// `POST /pipelines/{id}/trigger[?version=]`
    async fn trigger(
        &self,
        pipeline_id: PipelineId,
        version: Option<VersionId>,
    ) -> Result<TriggerResponse>;

    /// `DELETE /pipelines/{id}`
    async fn delete_pipeline(&self, pipeline_id: PipelineId) -> Result<()>;

    /// `GET /pipelines/{id}/runs/{runId}`
    async fn get_run(&self, pipeline_id: PipelineId, run_id: RunId) -> Result<PipelineRun>;
}
