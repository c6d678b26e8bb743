//! Mock construction helpers

use async_trait::async_trait;
use etl_studio::backend::{
    CreatePipelineRequest, CreateVersionRequest, InMemoryBackend, PipelineBackend,
    TriggerResponse,
};
use etl_studio::config::StudioConfig;
use etl_studio::error::Result;
use etl_studio::lifecycle::VersionController;
use etl_studio::types::{Pipeline, PipelineRun, PipelineVersion};
use std::sync::Arc;

mockall::mock! {
    pub Backend {}

    #[async_trait]
    impl PipelineBackend for Backend {
        async fn get_pipeline(&self, pipeline_id: i64) -> Result<Pipeline>;
        async fn list_versions(&self, pipeline_id: i64) -> Result<Vec<PipelineVersion>>;
        async fn get_version(&self, pipeline_id: i64, version_id: i64) -> Result<PipelineVersion>;
        async fn create_pipeline(&self, request: CreatePipelineRequest) -> Result<Pipeline>;
        async fn create_version(
            &self,
            pipeline_id: i64,
            request: CreateVersionRequest,
        ) -> Result<PipelineVersion>;
        async fn publish_version(&self, pipeline_id: i64, version_id: i64) -> Result<PipelineVersion>;
        async fn trigger(&self, pipeline_id: i64, version: Option<i64>) -> Result<TriggerResponse>;
        async fn delete_pipeline(&self, pipeline_id: i64) -> Result<()>;
        async fn get_run(&self, pipeline_id: i64, run_id: i64) -> Result<PipelineRun>;
    }
}

/// Pipeline record with the given latest and published versions
pub fn pipeline_with(
    latest: Option<PipelineVersion>,
    published: Option<PipelineVersion>,
) -> Pipeline {
    Pipeline {
        id: 1,
        name: "orders".to_string(),
        description: None,
        latest_version: latest,
        published_version: published,
    }
}

/// Controller with default settings over any backend
pub fn controller_for(backend: Arc<dyn PipelineBackend>) -> VersionController {
    let config = StudioConfig::default();
    VersionController::new(backend, config.layout, &config.editor)
}

/// In-memory backend plus a controller sharing it
pub fn in_memory() -> (Arc<InMemoryBackend>, VersionController) {
    let backend = Arc::new(InMemoryBackend::new());
    let controller = controller_for(backend.clone());
    (backend, controller)
}
