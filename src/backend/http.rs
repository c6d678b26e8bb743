//! HTTP implementation of [`PipelineBackend`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CreatePipelineRequest, CreateVersionRequest, PipelineBackend, TriggerResponse};
use crate::config::ApiConfig;
use crate::error::{Result, StudioError};
use crate::pipeline::id::{PipelineId, RunId, VersionId};
use crate::types::{Pipeline, PipelineRun, PipelineVersion};

/// Orchestration API client.
///
/// Authentication and retry policy belong to the transport in front of the
/// API and are not handled here.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        warn!(status = status.as_u16(), %message, "API request failed");
        if status == StatusCode::NOT_FOUND {
            Err(StudioError::NotFound(message))
        } else {
            Err(StudioError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, `{"detail": [{"msg": "..."}]}`,
/// `{"message": "..."}` and `{"error": "..."}`; falls back to the raw text.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Some(body.to_string());
    };
    let text = match value.get("detail") {
        Some(Value::String(detail)) => Some(detail.clone()),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    };
    text.or_else(|| {
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    })
    .or_else(|| Some(body.to_string()))
}

#[async_trait]
impl PipelineBackend for HttpBackend {
    async fn get_pipeline(&self, pipeline_id: PipelineId) -> Result<Pipeline> {
        debug!(pipeline_id, "GET pipeline");
        self.fetch(self.client.get(self.url(&format!("pipelines/{pipeline_id}"))))
            .await
    }

    async fn list_versions(&self, pipeline_id: PipelineId) -> Result<Vec<PipelineVersion>> {
        debug!(pipeline_id, "GET versions");
        self.fetch(
            self.client
                .get(self.url(&format!("pipelines/{pipeline_id}/versions"))),
        )
        .await
    }

    async fn get_version(
        &self,
        pipeline_id: PipelineId,
        version_id: VersionId,
    ) -> Result<PipelineVersion> {
        debug!(pipeline_id, version_id, "GET version");
        self.fetch(self.client.get(self.url(&format!(
            "pipelines/{pipeline_id}/versions/{version_id}"
        ))))
        .await
    }

    async fn create_pipeline(&self, request: CreatePipelineRequest) -> Result<Pipeline> {
        debug!(name = %request.name, "POST pipeline");
        self.fetch(self.client.post(self.url("pipelines")).json(&request))
            .await
    }

    async fn create_version(
        &self,
        pipeline_id: PipelineId,
        request: CreateVersionRequest,
    ) -> Result<PipelineVersion> {
        debug!(pipeline_id, nodes = request.nodes.len(), "POST version");
        self.fetch(
            self.client
                .post(self.url(&format!("pipelines/{pipeline_id}/versions")))
                .json(&request),
        )
        .await
    }

    async fn publish_version(
        &self,
        pipeline_id: PipelineId,
        version_id: VersionId,
    ) -> Result<PipelineVersion> {
        debug!(pipeline_id, version_id, "POST publish");
        self.fetch(self.client.post(self.url(&format!(
            "pipelines/{pipeline_id}/versions/{version_id}/publish"
        ))))
        .await
    }

    async fn trigger(
        &self,
        pipeline_id: PipelineId,
        version: Option<VersionId>,
    ) -> Result<TriggerResponse> {
        debug!(pipeline_id, ?version, "POST trigger");
        let mut request = self
            .client
            .post(self.url(&format!("pipelines/{pipeline_id}/trigger")));
        if let Some(version) = version {
            request = request.query(&[("version", version)]);
        }
        self.fetch(request).await
    }

    async fn delete_pipeline(&self, pipeline_id: PipelineId) -> Result<()> {
        debug!(pipeline_id, "DELETE pipeline");
        self.send(
            self.client
                .delete(self.url(&format!("pipelines/{pipeline_id}"))),
        )
        .await?;
        Ok(())
    }

    async fn get_run(&self, pipeline_id: PipelineId, run_id: RunId) -> Result<PipelineRun> {
        debug!(pipeline_id, run_id, "GET run");
        self.fetch(
            self.client
                .get(self.url(&format!("pipelines/{pipeline_id}/runs/{run_id}"))),
        )
        .await
    }
}
