//! Editor session and action dispatch
//!
//! Views never mutate state directly. They return [`EditorAction`]s and the
//! shell hands each one to [`EditorSession::dispatch`], which routes it to
//! the graph store, the property editor or the lifecycle controller and
//! applies the error propagation policy:
//!
//! - validation errors are kept inline ([`EditorSession::inline_error`])
//! - request failures and partial failures go to the notification channel
//! - render panics are left to the [`PageBoundary`](super::PageBoundary)

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::notify::Notifier;
use crate::backend::PipelineBackend;
use crate::config::StudioConfig;
use crate::editor::{FieldValue, PropertyEditor};
use crate::error::{ErrorClass, Result, StudioError};
use crate::lifecycle::{LoadResult, SaveOutcome, VersionController, VersionState};
use crate::overlay::RunMonitor;
use crate::pipeline::id::{NodeId, PipelineId, RunId, VersionId};
use crate::pipeline::taxonomy::VisualKind;
use crate::types::Position;

/// Actions that any view can emit
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    // Canvas
    AddNode {
        kind: VisualKind,
        operator_class: Option<String>,
        label: Option<String>,
    },
    Connect {
        source: NodeId,
        target: NodeId,
    },
    Disconnect {
        source: NodeId,
        target: NodeId,
    },
    MoveNode {
        id: NodeId,
        position: Position,
    },
    AutoLayout,

    // Property editor
    SelectNode(NodeId),
    ClearSelection,
    SetLabel(String),
    SetOperatorClass(Option<String>),
    EditRaw(String),
    SetField {
        key: String,
        value: FieldValue,
    },
    ApplyProperties,
    RequestDelete,
    ConfirmDelete,
    CancelDelete,

    // Lifecycle
    NewPipeline {
        name: String,
    },
    Open {
        pipeline_id: PipelineId,
        version_id: Option<VersionId>,
    },
    ViewVersion(VersionId),
    ExitHistorical,
    DiscardChanges,
    RefreshVersions,
    Save {
        notes: Option<String>,
        deploy: bool,
    },
    Publish(VersionId),
    TriggerRun {
        version_id: Option<VersionId>,
    },
    DeletePipeline,
}

impl EditorAction {
    /// Whether the action changes the working graph.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            EditorAction::AddNode { .. }
                | EditorAction::Connect { .. }
                | EditorAction::Disconnect { .. }
                | EditorAction::MoveNode { .. }
                | EditorAction::AutoLayout
                | EditorAction::ApplyProperties
                | EditorAction::ConfirmDelete
        )
    }
}

/// Where a dispatched action ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Done,
    /// Rejected; the reason is in [`EditorSession::inline_error`]
    Inline,
    /// Failed or partly failed; a notice was queued
    Notified,
}

pub struct EditorSession {
    controller: VersionController,
    editor: PropertyEditor,
    notifier: Notifier,
    inline_error: Option<String>,
    poll_interval: Duration,
    max_poll_errors: u32,
}

impl EditorSession {
    pub fn new(backend: Arc<dyn PipelineBackend>, config: &StudioConfig, notifier: Notifier) -> Self {
        Self {
            controller: VersionController::new(backend, config.layout.clone(), &config.editor),
            editor: PropertyEditor::new(),
            notifier,
            inline_error: None,
            poll_interval: config.runs.poll_interval(),
            max_poll_errors: config.runs.max_poll_errors,
        }
    }

    pub fn controller(&self) -> &VersionController {
        &self.controller
    }

    pub fn editor(&self) -> &PropertyEditor {
        &self.editor
    }

    pub fn state(&self) -> VersionState {
        self.controller.state()
    }

    /// Whether mutating controls should be enabled.
    pub fn can_edit(&self) -> bool {
        self.controller.state().is_editable()
    }

    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    pub fn clear_inline_error(&mut self) {
        self.inline_error = None;
    }

    /// Monitor for a run of the open pipeline.
    pub fn run_monitor(&self, run_id: RunId) -> Result<RunMonitor> {
        let pipeline_id = self.controller.pipeline_id().ok_or(StudioError::NoPipeline)?;
        Ok(RunMonitor::new(
            self.controller.backend(),
            pipeline_id,
            run_id,
            self.poll_interval,
            self.controller.layout().clone(),
        )
        .with_error_budget(self.max_poll_errors))
    }

    fn route(&mut self, title: &str, err: StudioError) -> Dispatch {
        match err.class() {
            ErrorClass::Validation => {
                warn!(error = %err, "{}", title);
                self.inline_error = Some(err.to_string());
                Dispatch::Inline
            }
            _ => {
                self.notifier.error(title, &err);
                Dispatch::Notified
            }
        }
    }

    fn finish(&mut self, title: &str, result: Result<()>) -> Dispatch {
        match result {
            Ok(()) => Dispatch::Done,
            Err(err) => self.route(title, err),
        }
    }

    /// Drop the selection if its node is gone after a graph replacement.
    fn sync_selection(&mut self) {
        let gone = self
            .editor
            .selected()
            .is_some_and(|id| !self.controller.store().contains(id));
        if gone {
            self.editor.close();
        }
    }

    fn loaded(&mut self, title: &str, result: Result<LoadResult>) -> Dispatch {
        match result {
            Ok(LoadResult::Stale) | Ok(LoadResult::Unchanged) => Dispatch::Done,
            Ok(result) => {
                debug!(?result, "Graph replaced");
                self.editor.close();
                Dispatch::Done
            }
            Err(err) => self.route(title, err),
        }
    }

    pub async fn dispatch(&mut self, action: EditorAction) -> Dispatch {
        debug!(?action, "Dispatch");
        if action.is_mutation() {
            self.inline_error = None;
        }

        match action {
            EditorAction::AddNode {
                kind,
                operator_class,
                label,
            } => {
                let result = self
                    .controller
                    .store_mut()
                    .add_node(kind, operator_class.as_deref(), label.as_deref())
                    .map(|_| ());
                self.finish("Cannot add node", result)
            }
            EditorAction::Connect { source, target } => {
                let result = self
                    .controller
                    .store_mut()
                    .connect(&source, &target)
                    .map(|_| ());
                self.finish("Cannot connect nodes", result)
            }
            EditorAction::Disconnect { source, target } => {
                let result = self
                    .controller
                    .store_mut()
                    .disconnect(&source, &target)
                    .map(|_| ());
                self.finish("Cannot disconnect nodes", result)
            }
            EditorAction::MoveNode { id, position } => {
                let result = self.controller.store_mut().move_node(&id, position);
                self.finish("Cannot move node", result)
            }
            EditorAction::AutoLayout => {
                let result = self.controller.auto_layout();
                self.finish("Cannot lay out graph", result)
            }

            EditorAction::SelectNode(id) => match self.controller.store().node(&id) {
                Some(node) => {
                    self.editor.open(node);
                    Dispatch::Done
                }
                None => self.route("Cannot select node", StudioError::UnknownNode(id)),
            },
            EditorAction::ClearSelection => {
                self.editor.close();
                Dispatch::Done
            }
            EditorAction::SetLabel(label) => {
                let result = self.editor.set_label(label);
                self.finish("Cannot edit label", result)
            }
            EditorAction::SetOperatorClass(class) => {
                let result = self.editor.set_operator_class(class);
                self.finish("Cannot change class", result)
            }
            EditorAction::EditRaw(text) => {
                let result = self.editor.edit_raw(text);
                self.finish("Cannot edit config", result)
            }
            EditorAction::SetField { key, value } => {
                let result = self.editor.set_field(&key, value);
                self.finish("Cannot edit field", result)
            }
            EditorAction::ApplyProperties => {
                let result = self.editor.apply(self.controller.store_mut());
                self.finish("Cannot apply properties", result)
            }
            EditorAction::RequestDelete => {
                let result = self.editor.request_delete();
                self.finish("Cannot delete node", result)
            }
            EditorAction::ConfirmDelete => {
                let result = self
                    .editor
                    .confirm_delete(self.controller.store_mut())
                    .map(|_| ());
                self.finish("Cannot delete node", result)
            }
            EditorAction::CancelDelete => {
                self.editor.cancel_delete();
                Dispatch::Done
            }

            EditorAction::NewPipeline { name } => {
                self.controller.start_new(name);
                self.editor.close();
                Dispatch::Done
            }
            EditorAction::Open {
                pipeline_id,
                version_id,
            } => {
                let result = self.controller.open(pipeline_id, version_id).await;
                self.loaded("Failed to open pipeline", result)
            }
            EditorAction::ViewVersion(version_id) => {
                let result = self.controller.view_version(version_id).await;
                self.loaded("Failed to load version", result)
            }
            EditorAction::ExitHistorical => {
                let result = self.controller.exit_historical().await;
                let dispatch = self.loaded("Failed to leave historical view", result);
                self.sync_selection();
                dispatch
            }
            EditorAction::DiscardChanges => {
                let result = self.controller.discard_changes().await;
                let dispatch = self.loaded("Failed to discard changes", result);
                self.sync_selection();
                dispatch
            }
            EditorAction::RefreshVersions => {
                let result = self.controller.refresh_versions().await.map(|_| ());
                self.finish("Failed to refresh versions", result)
            }
            EditorAction::Save { notes, deploy } => {
                match self.controller.save(notes, deploy).await {
                    Ok(SaveOutcome::Created(version)) => {
                        self.notifier
                            .success(format!("Saved version {}", version.version));
                        Dispatch::Done
                    }
                    Ok(SaveOutcome::Deployed(version)) => {
                        self.notifier
                            .success(format!("Deployed version {}", version.version));
                        Dispatch::Done
                    }
                    Ok(outcome) => {
                        if let Some(err) = outcome.to_error() {
                            self.notifier.error("Saved as draft, deploy failed", &err);
                        }
                        Dispatch::Notified
                    }
                    Err(err) => self.route("Failed to save pipeline", err),
                }
            }
            EditorAction::Publish(version_id) => {
                match self.controller.publish(version_id).await {
                    Ok(version) => {
                        self.notifier
                            .success(format!("Published version {}", version.version));
                        Dispatch::Done
                    }
                    Err(err) => self.route("Failed to publish version", err),
                }
            }
            EditorAction::TriggerRun { version_id } => {
                match self.controller.trigger_run(version_id).await {
                    Ok(job_id) => {
                        self.notifier.info(format!("Run triggered ({job_id})"));
                        Dispatch::Done
                    }
                    Err(err) => self.route("Failed to trigger run", err),
                }
            }
            EditorAction::DeletePipeline => {
                let result = self.controller.delete_pipeline().await;
                if result.is_ok() {
                    self.editor.close();
                }
                self.finish("Failed to delete pipeline", result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FailPoint, InMemoryBackend};
    use crate::frontend::notify::{NoticeLevel, NotificationCenter};

    fn session(backend: Arc<InMemoryBackend>) -> (EditorSession, NotificationCenter) {
        let center = NotificationCenter::new();
        let session = EditorSession::new(backend, &StudioConfig::default(), center.notifier());
        (session, center)
    }

    fn add(kind: VisualKind) -> EditorAction {
        EditorAction::AddNode {
            kind,
            operator_class: None,
            label: None,
        }
    }

    #[tokio::test]
    async fn test_validation_errors_stay_inline() {
        let (mut session, center) = session(Arc::new(InMemoryBackend::new()));
        session.dispatch(add(VisualKind::Source)).await;
        let id = session.controller().store().nodes()[0].id.clone();

        let result = session
            .dispatch(EditorAction::Connect {
                source: id.clone(),
                target: id,
            })
            .await;
        assert_eq!(result, Dispatch::Inline);
        assert!(session.inline_error().is_some());
        assert!(center.drain().is_empty());
    }

    #[tokio::test]
    async fn test_request_errors_are_notified() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_next(FailPoint::CreatePipeline, "database locked");
        let (mut session, center) = session(backend);

        let result = session
            .dispatch(EditorAction::Save {
                notes: None,
                deploy: false,
            })
            .await;
        assert_eq!(result, Dispatch::Notified);
        assert!(session.inline_error().is_none());
        assert_eq!(session.state(), VersionState::New);

        let notices = center.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_deploy_with_failed_publish_is_warning() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut session, center) = session(backend.clone());
        session.dispatch(add(VisualKind::Source)).await;
        backend.fail_next(FailPoint::Publish, "scheduler down");

        let result = session
            .dispatch(EditorAction::Save {
                notes: None,
                deploy: true,
            })
            .await;
        assert_eq!(result, Dispatch::Notified);
        assert_eq!(session.state(), VersionState::Draft);
        let notices = center.drain();
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_historical_view_closes_editor() {
        let backend = Arc::new(InMemoryBackend::new());
        let (mut session, _center) = session(backend);
        session.dispatch(add(VisualKind::Source)).await;
        let save = EditorAction::Save {
            notes: None,
            deploy: false,
        };
        session.dispatch(save.clone()).await;
        let first = session.controller().current_version().unwrap().id;
        session.dispatch(add(VisualKind::Sink)).await;
        session.dispatch(save).await;

        let id = session.controller().store().nodes()[0].id.clone();
        session.dispatch(EditorAction::SelectNode(id)).await;
        assert!(session.editor().is_open());

        session.dispatch(EditorAction::ViewVersion(first)).await;
        assert!(!session.editor().is_open());
        assert!(!session.can_edit());
        assert_eq!(
            session.dispatch(add(VisualKind::Sink)).await,
            Dispatch::Inline
        );
        assert_eq!(session.controller().store().nodes().len(), 1);
    }
}
