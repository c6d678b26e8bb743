//! Version lifecycle controller.
//!
//! Loads go through three steps so a shell can keep several in flight and
//! drop the stale ones:
//!
//! ```text
//! begin_load ──► fetch (async, touches nothing) ──► finish_load
//! ```
//!
//! `open`, `view_version` and `exit_historical` chain the three steps for
//! callers that load one thing at a time.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ticket::{LoadGeneration, LoadMode, LoadTicket};
use super::{classify, VersionState};
use crate::backend::{CreatePipelineRequest, CreateVersionRequest, PipelineBackend};
use crate::config::EditorSettings;
use crate::error::{Result, ResultExt, StudioError};
use crate::pipeline::id::{PipelineId, VersionId};
use crate::pipeline::layout::LayoutOptions;
use crate::pipeline::store::GraphStore;
use crate::types::{Pipeline, PipelineVersion};

/// Name given to pipelines created from an untitled canvas.
pub const UNTITLED: &str = "Untitled pipeline";

/// Backend data for one load, fetched without touching the controller.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub pipeline: Pipeline,
    pub version: Option<PipelineVersion>,
    pub versions: Vec<PipelineVersion>,
}

/// What a completed load did to the working graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResult {
    /// A version replaced the working graph
    Loaded(VersionState),
    /// The pipeline has no version; the canvas is empty
    Fresh,
    /// Same version already shown with no local edits; nothing replaced
    Unchanged,
    /// A newer load superseded this one; response dropped
    Stale,
}

/// Outcome of a save.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// New draft version
    Created(PipelineVersion),
    /// New version, published
    Deployed(PipelineVersion),
    /// The version was created but publishing it failed; it stays a draft
    PublishFailed {
        version: PipelineVersion,
        message: String,
    },
}

impl SaveOutcome {
    pub fn version(&self) -> &PipelineVersion {
        match self {
            SaveOutcome::Created(v) | SaveOutcome::Deployed(v) => v,
            SaveOutcome::PublishFailed { version, .. } => version,
        }
    }

    /// The partial failure as an error, for the notification channel.
    pub fn to_error(&self) -> Option<StudioError> {
        match self {
            SaveOutcome::PublishFailed { version, message } => Some(StudioError::PublishFailed {
                version_id: version.id,
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

/// Working copy kept aside while a historical version is shown.
#[derive(Debug, Clone)]
struct Stash {
    store: GraphStore,
    state: VersionState,
    current: Option<PipelineVersion>,
}

pub struct VersionController {
    backend: Arc<dyn PipelineBackend>,
    store: GraphStore,
    layout: LayoutOptions,
    optimistic_concurrency: bool,
    pipeline_id: Option<PipelineId>,
    name: String,
    description: Option<String>,
    state: VersionState,
    current: Option<PipelineVersion>,
    latest_number: Option<u32>,
    published_id: Option<VersionId>,
    versions: Vec<PipelineVersion>,
    generation: LoadGeneration,
    stash: Option<Stash>,
}

impl VersionController {
    /// Controller for an untitled, not yet created pipeline.
    pub fn new(
        backend: Arc<dyn PipelineBackend>,
        layout: LayoutOptions,
        editor: &EditorSettings,
    ) -> Self {
        Self {
            backend,
            store: GraphStore::new(editor.edge_policy),
            layout,
            optimistic_concurrency: editor.optimistic_concurrency,
            pipeline_id: None,
            name: UNTITLED.to_string(),
            description: None,
            state: VersionState::New,
            current: None,
            latest_number: None,
            published_id: None,
            versions: Vec::new(),
            generation: LoadGeneration::default(),
            stash: None,
        }
    }

    /// Reset to an empty `NEW` pipeline.
    pub fn start_new(&mut self, name: impl Into<String>) {
        self.generation.invalidate();
        self.store.clear();
        self.store.set_read_only(false);
        self.pipeline_id = None;
        self.name = name.into();
        self.description = None;
        self.state = VersionState::New;
        self.current = None;
        self.latest_number = None;
        self.published_id = None;
        self.versions.clear();
        self.stash = None;
        debug!(name = %self.name, "Started new pipeline");
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn backend(&self) -> Arc<dyn PipelineBackend> {
        Arc::clone(&self.backend)
    }

    pub fn state(&self) -> VersionState {
        self.state
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    pub fn pipeline_id(&self) -> Option<PipelineId> {
        self.pipeline_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn current_version(&self) -> Option<&PipelineVersion> {
        self.current.as_ref()
    }

    /// Cached version list, refreshed on load and save.
    pub fn versions(&self) -> &[PipelineVersion] {
        &self.versions
    }

    pub fn published_version_id(&self) -> Option<VersionId> {
        self.published_id
    }

    pub fn is_read_only(&self) -> bool {
        !self.state.is_editable()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.store.is_dirty()
    }

    /// Re-run layout on the working graph.
    pub fn auto_layout(&mut self) -> Result<()> {
        self.store.auto_layout(&self.layout)
    }

    // ── Loading ─────────────────────────────────────────────────────

    /// Start a load, superseding any load still in flight.
    pub fn begin_load(
        &mut self,
        pipeline_id: PipelineId,
        version_id: Option<VersionId>,
        mode: LoadMode,
    ) -> LoadTicket {
        let ticket = self.generation.issue(pipeline_id, version_id, mode);
        debug!(
            pipeline_id,
            ?version_id,
            ?mode,
            generation = ticket.generation(),
            "Load started"
        );
        ticket
    }

    /// Fetch what a ticket asks for.
    ///
    /// Load rule: explicit version → latest → published → empty canvas.
    pub async fn fetch(backend: &dyn PipelineBackend, ticket: &LoadTicket) -> Result<Fetched> {
        let pipeline = backend.get_pipeline(ticket.pipeline_id).await?;
        let version = match ticket.version_id {
            Some(version_id) => Some(backend.get_version(ticket.pipeline_id, version_id).await?),
            None => pipeline
                .latest_version
                .clone()
                .or_else(|| pipeline.published_version.clone()),
        };
        let versions = backend.list_versions(ticket.pipeline_id).await?;
        Ok(Fetched {
            pipeline,
            version,
            versions,
        })
    }

    /// Apply a fetched load if its ticket is still current.
    ///
    /// A failed fetch leaves every piece of local state as it was.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        fetched: Result<Fetched>,
    ) -> Result<LoadResult> {
        if !self.generation.is_current(&ticket) {
            warn!(
                generation = ticket.generation(),
                pipeline_id = ticket.pipeline_id,
                "Discarded stale load"
            );
            return Ok(LoadResult::Stale);
        }
        let Fetched {
            pipeline,
            version,
            mut versions,
        } = fetched.with_context(|| format!("Failed to load pipeline {}", ticket.pipeline_id))?;

        let state = classify(version.as_ref(), &pipeline, ticket.mode);
        let preferred = pipeline.published_version.as_ref().map(|v| v.id);
        self.published_id = normalize_published(&mut versions, preferred);
        self.versions = versions;
        self.latest_number = pipeline.latest_version.as_ref().map(|v| v.version);
        self.name = pipeline.name.clone();
        self.description = pipeline.description.clone();

        let same_pipeline = self.pipeline_id == Some(pipeline.id);
        let unchanged = ticket.mode != LoadMode::Reload
            && same_pipeline
            && self.current.as_ref().map(|v| v.id) == version.as_ref().map(|v| v.id)
            && self.state == state;
        if unchanged {
            debug!(
                pipeline_id = pipeline.id,
                dirty = self.store.is_dirty(),
                "Load unchanged"
            );
            return Ok(LoadResult::Unchanged);
        }

        if state == VersionState::Historical {
            if self.state != VersionState::Historical && same_pipeline {
                self.stash = Some(Stash {
                    store: self.store.clone(),
                    state: self.state,
                    current: self.current.clone(),
                });
            }
        } else {
            self.stash = None;
        }

        match &version {
            Some(v) => self.store.load_version(v, &self.layout),
            None => self.store.clear(),
        }
        self.store.set_read_only(state == VersionState::Historical);
        self.pipeline_id = Some(pipeline.id);
        self.current = version;
        self.state = state;

        info!(
            pipeline_id = pipeline.id,
            version = ?self.current.as_ref().map(|v| v.version),
            state = %state,
            "Pipeline loaded"
        );
        Ok(if self.current.is_some() {
            LoadResult::Loaded(state)
        } else {
            LoadResult::Fresh
        })
    }

    /// Open a pipeline, optionally at an explicit version.
    pub async fn open(
        &mut self,
        pipeline_id: PipelineId,
        version_id: Option<VersionId>,
    ) -> Result<LoadResult> {
        let ticket = self.begin_load(pipeline_id, version_id, LoadMode::Open);
        let fetched = Self::fetch(self.backend.as_ref(), &ticket).await;
        self.finish_load(ticket, fetched)
    }

    /// Show a snapshot read-only. The working copy is kept aside.
    pub async fn view_version(&mut self, version_id: VersionId) -> Result<LoadResult> {
        let pipeline_id = self.pipeline_id.ok_or(StudioError::NoPipeline)?;
        let ticket = self.begin_load(pipeline_id, Some(version_id), LoadMode::Historical);
        let fetched = Self::fetch(self.backend.as_ref(), &ticket).await;
        self.finish_load(ticket, fetched)
    }

    /// Drop local edits by reloading the version being edited.
    ///
    /// On a `NEW` pipeline the canvas is cleared. Nothing happens while a
    /// historical version is shown.
    pub async fn discard_changes(&mut self) -> Result<LoadResult> {
        match (self.state, self.pipeline_id) {
            (VersionState::Historical, _) => Ok(LoadResult::Unchanged),
            (_, None) => {
                self.store.clear();
                debug!("Discarded unsaved canvas");
                Ok(LoadResult::Fresh)
            }
            (_, Some(pipeline_id)) => {
                let version_id = self.current.as_ref().map(|v| v.id);
                let ticket = self.begin_load(pipeline_id, version_id, LoadMode::Reload);
                let fetched = Self::fetch(self.backend.as_ref(), &ticket).await;
                self.finish_load(ticket, fetched)
            }
        }
    }

    /// Leave the historical view and return to the draft/published view.
    pub async fn exit_historical(&mut self) -> Result<LoadResult> {
        if self.state != VersionState::Historical {
            return Ok(LoadResult::Unchanged);
        }
        if let Some(stash) = self.stash.take() {
            self.generation.invalidate();
            self.store = stash.store;
            self.state = stash.state;
            self.current = stash.current;
            info!(state = %self.state, "Left historical view");
            return Ok(match self.state {
                VersionState::New => LoadResult::Fresh,
                state if self.current.is_none() => {
                    debug!(state = %state, "Restored empty canvas");
                    LoadResult::Fresh
                }
                state => LoadResult::Loaded(state),
            });
        }
        let pipeline_id = self.pipeline_id.ok_or(StudioError::NoPipeline)?;
        self.open(pipeline_id, None).await
    }

    /// Re-fetch the version list.
    pub async fn refresh_versions(&mut self) -> Result<&[PipelineVersion]> {
        let pipeline_id = self.pipeline_id.ok_or(StudioError::NoPipeline)?;
        let mut versions = self
            .backend
            .list_versions(pipeline_id)
            .await
            .context("Failed to list versions")?;
        self.published_id = normalize_published(&mut versions, self.published_id);
        self.latest_number = versions.iter().map(|v| v.version).max();
        self.versions = versions;
        Ok(&self.versions)
    }

    // ── Saving and publishing ───────────────────────────────────────

    async fn check_conflict(&self, pipeline_id: PipelineId) -> Result<()> {
        let pipeline = self
            .backend
            .get_pipeline(pipeline_id)
            .await
            .context("Failed to check for newer versions")?;
        let latest = pipeline.latest_version.map_or(0, |v| v.version);
        let base = self.latest_number.unwrap_or(0);
        if latest > base {
            warn!(base, latest, "Save refused: newer version exists");
            return Err(StudioError::Conflict { base, latest });
        }
        Ok(())
    }

    /// Persist the working graph as a new version, optionally publishing it.
    ///
    /// On a `NEW` pipeline this creates the pipeline with version 1. If the
    /// publish step fails the created version is kept as a draft and the
    /// outcome is [`SaveOutcome::PublishFailed`].
    pub async fn save(&mut self, notes: Option<String>, deploy: bool) -> Result<SaveOutcome> {
        if !self.state.is_editable() {
            warn!("Rejected save of historical version");
            return Err(StudioError::ReadOnly { operation: "save" });
        }

        let (nodes, edges) = self.store.to_backend();
        let request = CreateVersionRequest {
            nodes,
            edges,
            version_notes: notes,
        };

        let version = match self.pipeline_id {
            None => {
                let pipeline = self
                    .backend
                    .create_pipeline(CreatePipelineRequest {
                        name: self.name.clone(),
                        description: self.description.clone(),
                        initial_version: request,
                    })
                    .await
                    .context("Failed to create pipeline")?;
                let version = pipeline.latest_version.ok_or_else(|| {
                    StudioError::NotFound("initial version of the created pipeline".to_string())
                })?;
                info!(pipeline_id = pipeline.id, name = %pipeline.name, "Pipeline created");
                self.pipeline_id = Some(pipeline.id);
                version
            }
            Some(pipeline_id) => {
                if self.optimistic_concurrency {
                    self.check_conflict(pipeline_id).await?;
                }
                self.backend
                    .create_version(pipeline_id, request)
                    .await
                    .context("Failed to save version")?
            }
        };

        // A load still in flight would overwrite the saved graph
        self.generation.invalidate();
        self.versions.retain(|v| v.id != version.id);
        self.versions.push(version.clone());
        self.latest_number = Some(version.version);
        self.current = Some(version.clone());
        self.state = VersionState::Draft;
        self.stash = None;
        self.store.mark_clean();
        info!(version = version.version, deploy, "Version saved");

        if !deploy {
            return Ok(SaveOutcome::Created(version));
        }

        let pipeline_id = version.pipeline_id;
        match self.backend.publish_version(pipeline_id, version.id).await {
            Ok(published) => {
                self.mark_published(published.id);
                info!(version = published.version, "Version deployed");
                Ok(SaveOutcome::Deployed(published))
            }
            Err(err) => {
                warn!(version = version.version, error = %err, "Saved but publish failed");
                Ok(SaveOutcome::PublishFailed {
                    version,
                    message: err.to_string(),
                })
            }
        }
    }

    /// Promote any version to published, demoting the previous one.
    pub async fn publish(&mut self, version_id: VersionId) -> Result<PipelineVersion> {
        let pipeline_id = self.pipeline_id.ok_or(StudioError::NoPipeline)?;
        let published = self
            .backend
            .publish_version(pipeline_id, version_id)
            .await
            .with_context(|| format!("Failed to publish version {version_id}"))?;
        self.mark_published(version_id);
        info!(version = published.version, "Version published");
        Ok(published)
    }

    /// Keep at most one published version locally, whatever the backend echoes.
    ///
    /// The shown version and the stashed working copy are re-classified; a
    /// version that is now neither published nor latest becomes historical.
    fn mark_published(&mut self, version_id: VersionId) {
        self.published_id = Some(version_id);
        for version in &mut self.versions {
            version.is_published = version.id == version_id;
        }

        let latest_number = self.latest_number;
        if let Some(current) = &mut self.current {
            current.is_published = current.id == version_id;
            if self.state.is_editable() {
                let state = state_by_identity(current, latest_number);
                if state == VersionState::Historical {
                    warn!(
                        version = current.version,
                        dirty = self.store.is_dirty(),
                        "Shown version superseded by publish; now read-only"
                    );
                    self.store.set_read_only(true);
                    self.stash = None;
                }
                self.state = state;
            }
        }

        if let Some(stash) = &mut self.stash {
            if let Some(current) = &mut stash.current {
                current.is_published = current.id == version_id;
                stash.state = state_by_identity(current, latest_number);
            }
            if stash.state == VersionState::Historical {
                debug!("Dropped stashed working copy superseded by publish");
                self.stash = None;
            }
        }
    }

    /// Trigger a run of the pipeline (published version unless given).
    pub async fn trigger_run(&self, version_id: Option<VersionId>) -> Result<String> {
        let pipeline_id = self.pipeline_id.ok_or(StudioError::NoPipeline)?;
        let response = self
            .backend
            .trigger(pipeline_id, version_id)
            .await
            .context("Failed to trigger run")?;
        info!(pipeline_id, job_id = %response.job_id, "Run triggered");
        Ok(response.job_id)
    }

    /// Delete the pipeline on the backend and reset to an empty `NEW` canvas.
    pub async fn delete_pipeline(&mut self) -> Result<()> {
        let pipeline_id = self.pipeline_id.ok_or(StudioError::NoPipeline)?;
        self.backend
            .delete_pipeline(pipeline_id)
            .await
            .context("Failed to delete pipeline")?;
        info!(pipeline_id, "Pipeline deleted");
        self.start_new(UNTITLED);
        Ok(())
    }
}

/// Editable state of a version from its published flag and the latest
/// version number known locally.
fn state_by_identity(version: &PipelineVersion, latest_number: Option<u32>) -> VersionState {
    let latest = latest_number.map_or(true, |n| version.version >= n);
    if version.is_published {
        VersionState::Published
    } else if latest {
        VersionState::Draft
    } else {
        VersionState::Historical
    }
}

/// Leave at most one version flagged as published.
///
/// `preferred` wins when it is among the flagged versions, otherwise the
/// highest version number does.
fn normalize_published(
    versions: &mut [PipelineVersion],
    preferred: Option<VersionId>,
) -> Option<VersionId> {
    let flagged: Vec<&PipelineVersion> = versions.iter().filter(|v| v.is_published).collect();
    let keep = match flagged.len() {
        0 => None,
        1 => Some(flagged[0].id),
        _ => preferred
            .filter(|p| flagged.iter().any(|v| v.id == *p))
            .or_else(|| flagged.iter().max_by_key(|v| v.version).map(|v| v.id)),
    };
    for version in versions.iter_mut() {
        version.is_published = Some(version.id) == keep;
    }
    keep
}
