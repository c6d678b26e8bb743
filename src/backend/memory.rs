//! In-process implementation of [`PipelineBackend`].
//!
//! Behaves like the orchestration API for the subset the console uses:
//! monotonic version numbers, at most one published version per pipeline,
//! and triggered runs with one pending step per node. Individual calls can
//! be made to fail once with [`InMemoryBackend::fail_next`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{CreatePipelineRequest, CreateVersionRequest, PipelineBackend, TriggerResponse};
use crate::error::{Result, StudioError};
use crate::pipeline::id::{PipelineId, RunId, VersionId};
use crate::types::{Pipeline, PipelineRun, PipelineVersion, StepRun};

/// Backend call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    GetPipeline,
    ListVersions,
    GetVersion,
    CreatePipeline,
    CreateVersion,
    Publish,
    Trigger,
    Delete,
    GetRun,
}

#[derive(Debug)]
struct StoredPipeline {
    name: String,
    description: Option<String>,
    versions: Vec<PipelineVersion>,
}

impl StoredPipeline {
    fn to_pipeline(&self, id: PipelineId) -> Pipeline {
        Pipeline {
            id,
            name: self.name.clone(),
            description: self.description.clone(),
            latest_version: self.versions.last().cloned(),
            published_version: self.versions.iter().find(|v| v.is_published).cloned(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    next_pipeline: PipelineId,
    next_version: VersionId,
    next_run: RunId,
    pipelines: BTreeMap<PipelineId, StoredPipeline>,
    runs: HashMap<(PipelineId, RunId), PipelineRun>,
    failures: HashMap<FailPoint, String>,
}

impl State {
    fn check(&mut self, point: FailPoint) -> Result<()> {
        match self.failures.remove(&point) {
            Some(message) => Err(StudioError::Api {
                status: 503,
                message,
            }),
            None => Ok(()),
        }
    }

    fn pipeline_mut(&mut self, id: PipelineId) -> Result<&mut StoredPipeline> {
        self.pipelines
            .get_mut(&id)
            .ok_or_else(|| StudioError::NotFound(format!("pipeline {id}")))
    }

    fn push_version(
        &mut self,
        pipeline_id: PipelineId,
        request: CreateVersionRequest,
    ) -> Result<PipelineVersion> {
        self.next_version += 1;
        let id = self.next_version;
        let stored = self.pipeline_mut(pipeline_id)?;
        let number = stored.versions.last().map_or(1, |v| v.version + 1);
        let version = PipelineVersion {
            id,
            pipeline_id,
            version: number,
            nodes: request.nodes,
            edges: request.edges,
            is_published: false,
            version_notes: request.version_notes,
            created_at: Some(Utc::now()),
        };
        stored.versions.push(version.clone());
        Ok(version)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of the given kind fail with `message`.
    pub fn fail_next(&self, point: FailPoint, message: impl Into<String>) {
        self.state().failures.insert(point, message.into());
    }

    /// Store a run as-is (replacing one with the same id).
    pub fn insert_run(&self, run: PipelineRun) {
        let mut state = self.state();
        state.next_run = state.next_run.max(run.id);
        state.runs.insert((run.pipeline_id, run.id), run);
    }

    /// Replace one step of a stored run.
    pub fn update_step(&self, pipeline_id: PipelineId, run_id: RunId, step: StepRun) -> Result<()> {
        let mut state = self.state();
        let run = state
            .runs
            .get_mut(&(pipeline_id, run_id))
            .ok_or_else(|| StudioError::NotFound(format!("run {run_id}")))?;
        match run.step_runs.iter().position(|s| s.node_id == step.node_id) {
            Some(index) => run.step_runs[index] = step,
            None => run.step_runs.push(step),
        }
        Ok(())
    }

    /// Set the overall status of a stored run.
    pub fn set_run_status(
        &self,
        pipeline_id: PipelineId,
        run_id: RunId,
        status: impl Into<String>,
    ) -> Result<()> {
        let mut state = self.state();
        let run = state
            .runs
            .get_mut(&(pipeline_id, run_id))
            .ok_or_else(|| StudioError::NotFound(format!("run {run_id}")))?;
        run.status = status.into();
        if run.is_terminal() {
            run.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Run ids recorded for a pipeline, oldest first.
    pub fn run_ids(&self, pipeline_id: PipelineId) -> Vec<RunId> {
        let mut ids: Vec<RunId> = self
            .state()
            .runs
            .keys()
            .filter(|(pid, _)| *pid == pipeline_id)
            .map(|(_, rid)| *rid)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of versions with `is_published` set.
    pub fn published_count(&self, pipeline_id: PipelineId) -> usize {
        self.state()
            .pipelines
            .get(&pipeline_id)
            .map_or(0, |p| p.versions.iter().filter(|v| v.is_published).count())
    }
}

#[async_trait]
impl PipelineBackend for InMemoryBackend {
    async fn get_pipeline(&self, pipeline_id: PipelineId) -> Result<Pipeline> {
        let mut state = self.state();
        state.check(FailPoint::GetPipeline)?;
        Ok(state.pipeline_mut(pipeline_id)?.to_pipeline(pipeline_id))
    }

    async fn list_versions(&self, pipeline_id: PipelineId) -> Result<Vec<PipelineVersion>> {
        let mut state = self.state();
        state.check(FailPoint::ListVersions)?;
        Ok(state.pipeline_mut(pipeline_id)?.versions.clone())
    }

    async fn get_version(
        &self,
        pipeline_id: PipelineId,
        version_id: VersionId,
    ) -> Result<PipelineVersion> {
        let mut state = self.state();
        state.check(FailPoint::GetVersion)?;
        state
            .pipeline_mut(pipeline_id)?
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .cloned()
            .ok_or_else(|| StudioError::NotFound(format!("version {version_id}")))
    }

    async fn create_pipeline(&self, request: CreatePipelineRequest) -> Result<Pipeline> {
        let mut state = self.state();
        state.check(FailPoint::CreatePipeline)?;
        state.next_pipeline += 1;
        let id = state.next_pipeline;
        state.pipelines.insert(
            id,
            StoredPipeline {
                name: request.name,
                description: request.description,
                versions: Vec::new(),
            },
        );
        state.push_version(id, request.initial_version)?;
        debug!(pipeline_id = id, "Created pipeline");
        Ok(state.pipeline_mut(id)?.to_pipeline(id))
    }

    async fn create_version(
        &self,
        pipeline_id: PipelineId,
        request: CreateVersionRequest,
    ) -> Result<PipelineVersion> {
        let mut state = self.state();
        state.check(FailPoint::CreateVersion)?;
        state.push_version(pipeline_id, request)
    }

    async fn publish_version(
        &self,
        pipeline_id: PipelineId,
        version_id: VersionId,
    ) -> Result<PipelineVersion> {
        let mut state = self.state();
        state.check(FailPoint::Publish)?;
        let stored = state.pipeline_mut(pipeline_id)?;
        if !stored.versions.iter().any(|v| v.id == version_id) {
            return Err(StudioError::NotFound(format!("version {version_id}")));
        }
        let mut published = None;
        for version in &mut stored.versions {
            version.is_published = version.id == version_id;
            if version.is_published {
                published = Some(version.clone());
            }
        }
        published.ok_or_else(|| StudioError::NotFound(format!("version {version_id}")))
    }

    async fn trigger(
        &self,
        pipeline_id: PipelineId,
        version: Option<VersionId>,
    ) -> Result<TriggerResponse> {
        let mut state = self.state();
        state.check(FailPoint::Trigger)?;
        let stored = state.pipeline_mut(pipeline_id)?;
        let target = match version {
            Some(id) => stored.versions.iter().find(|v| v.id == id),
            None => stored
                .versions
                .iter()
                .find(|v| v.is_published)
                .or(stored.versions.last()),
        }
        .cloned()
        .ok_or_else(|| StudioError::NotFound("version to run".to_string()))?;

        state.next_run += 1;
        let run_id = state.next_run;
        let job_id = format!("job-{run_id}");
        let steps = target
            .nodes
            .iter()
            .map(|n| StepRun::new(n.node_id.clone(), "pending"))
            .collect();
        state.runs.insert(
            (pipeline_id, run_id),
            PipelineRun {
                id: run_id,
                pipeline_id,
                job_id: Some(job_id.clone()),
                status: "pending".to_string(),
                version: Some(target),
                step_runs: steps,
                started_at: Some(Utc::now()),
                finished_at: None,
            },
        );
        debug!(pipeline_id, run_id, %job_id, "Triggered run");
        Ok(TriggerResponse { job_id })
    }

    async fn delete_pipeline(&self, pipeline_id: PipelineId) -> Result<()> {
        let mut state = self.state();
        state.check(FailPoint::Delete)?;
        state
            .pipelines
            .remove(&pipeline_id)
            .ok_or_else(|| StudioError::NotFound(format!("pipeline {pipeline_id}")))?;
        state.runs.retain(|(pid, _), _| *pid != pipeline_id);
        Ok(())
    }

    async fn get_run(&self, pipeline_id: PipelineId, run_id: RunId) -> Result<PipelineRun> {
        let mut state = self.state();
        state.check(FailPoint::GetRun)?;
        state
            .runs
            .get(&(pipeline_id, run_id))
            .cloned()
            .ok_or_else(|| StudioError::NotFound(format!("run {run_id}")))
    }
}
