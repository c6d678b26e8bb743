//! Polling monitor for one pipeline run.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{decorate_run, RunGraph};
use crate::backend::PipelineBackend;
use crate::config::DEFAULT_MAX_POLL_ERRORS;
use crate::error::{Result, ResultExt};
use crate::pipeline::id::{PipelineId, RunId};
use crate::pipeline::layout::LayoutOptions;
use crate::types::PipelineRun;

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollUpdate {
    /// The run differed from the previous poll and was re-decorated
    pub changed: bool,
    /// The run reached a terminal status; polling stops
    pub terminal: bool,
}

/// Fetches a run on an interval and keeps the decorated graph current.
pub struct RunMonitor {
    backend: Arc<dyn PipelineBackend>,
    pipeline_id: PipelineId,
    run_id: RunId,
    interval: Duration,
    layout: LayoutOptions,
    last: Option<PipelineRun>,
    graph: Option<RunGraph>,
    /// Consecutive failed polls `watch` tolerates
    error_budget: u32,
    failures: u32,
}

impl RunMonitor {
    pub fn new(
        backend: Arc<dyn PipelineBackend>,
        pipeline_id: PipelineId,
        run_id: RunId,
        interval: Duration,
        layout: LayoutOptions,
    ) -> Self {
        Self {
            backend,
            pipeline_id,
            run_id,
            interval,
            layout,
            last: None,
            graph: None,
            error_budget: DEFAULT_MAX_POLL_ERRORS,
            failures: 0,
        }
    }

    pub fn with_error_budget(mut self, max_consecutive_errors: u32) -> Self {
        self.error_budget = max_consecutive_errors;
        self
    }

    pub fn run(&self) -> Option<&PipelineRun> {
        self.last.as_ref()
    }

    pub fn graph(&self) -> Option<&RunGraph> {
        self.graph.as_ref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Failed polls since the last successful one.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn is_finished(&self) -> bool {
        self.last.as_ref().is_some_and(PipelineRun::is_terminal)
    }

    /// Watch a different run. The next poll decorates from scratch.
    pub fn retarget(&mut self, pipeline_id: PipelineId, run_id: RunId) {
        if (pipeline_id, run_id) != (self.pipeline_id, self.run_id) {
            debug!(pipeline_id, run_id, "Run monitor retargeted");
            self.pipeline_id = pipeline_id;
            self.run_id = run_id;
            self.last = None;
            self.graph = None;
            self.failures = 0;
        }
    }

    /// Fetch the run once and re-decorate if it changed.
    ///
    /// A failed fetch leaves the previous graph in place.
    pub async fn poll(&mut self) -> Result<PollUpdate> {
        let fetched = self
            .backend
            .get_run(self.pipeline_id, self.run_id)
            .await
            .with_context(|| format!("Failed to fetch run {}", self.run_id));
        let run = match fetched {
            Ok(run) => {
                self.failures = 0;
                run
            }
            Err(err) => {
                self.failures += 1;
                return Err(err);
            }
        };

        let terminal = run.is_terminal();
        if self.last.as_ref() == Some(&run) {
            return Ok(PollUpdate {
                changed: false,
                terminal,
            });
        }

        self.graph = decorate_run(&run, &self.layout);
        debug!(
            run_id = self.run_id,
            status = %run.status,
            steps = run.step_runs.len(),
            "Run re-decorated"
        );
        self.last = Some(run);
        Ok(PollUpdate {
            changed: true,
            terminal,
        })
    }

    /// Poll until the run is terminal, calling `on_change` after every
    /// change. Returns the final run.
    ///
    /// A failed poll keeps the last graph and polling goes on; the error is
    /// returned only once more than the error budget of polls fail in a row.
    pub async fn watch<F>(&mut self, mut on_change: F) -> Result<PipelineRun>
    where
        F: FnMut(&PipelineRun, Option<&RunGraph>),
    {
        loop {
            let update = match self.poll().await {
                Ok(update) => update,
                Err(err) if self.failures <= self.error_budget => {
                    warn!(
                        run_id = self.run_id,
                        failures = self.failures,
                        budget = self.error_budget,
                        error = %err,
                        "Run poll failed, retrying"
                    );
                    tokio::time::sleep(self.interval).await;
                    continue;
                }
                Err(err) => return Err(err),
            };
            if update.changed {
                if let Some(run) = &self.last {
                    on_change(run, self.graph.as_ref());
                }
            }
            if update.terminal {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        let run = self.last.clone().ok_or_else(|| {
            crate::error::StudioError::NotFound(format!("run {}", self.run_id))
        })?;
        info!(run_id = run.id, status = %run.status, "Run finished");
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockPipelineBackend;
    use crate::types::{OperatorType, PipelineNode, PipelineVersion, StepRun};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run(status: &str, step_status: &str) -> PipelineRun {
        PipelineRun {
            id: 7,
            pipeline_id: 1,
            job_id: Some("job-7".into()),
            status: status.into(),
            version: Some(PipelineVersion {
                id: 1,
                pipeline_id: 1,
                version: 1,
                nodes: vec![PipelineNode::new("a", "A", OperatorType::Extract)],
                edges: vec![],
                is_published: true,
                version_notes: None,
                created_at: None,
            }),
            step_runs: vec![StepRun::new("a", step_status)],
            started_at: None,
            finished_at: None,
        }
    }

    #[tokio::test]
    async fn test_poll_detects_change_and_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockPipelineBackend::new();
        mock.expect_get_run().returning(move |_, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(match n {
                0 | 1 => run("running", "running"),
                _ => run("completed", "completed"),
            })
        });

        let mut monitor = RunMonitor::new(
            Arc::new(mock),
            1,
            7,
            Duration::from_millis(1),
            LayoutOptions::default(),
        );

        let first = monitor.poll().await.unwrap();
        assert!(first.changed && !first.terminal);
        let second = monitor.poll().await.unwrap();
        assert!(!second.changed);
        let third = monitor.poll().await.unwrap();
        assert!(third.changed && third.terminal);
        assert!(monitor.is_finished());
    }

    #[tokio::test]
    async fn test_watch_stops_at_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockPipelineBackend::new();
        mock.expect_get_run().returning(move |_, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(if n < 3 {
                run("running", "running")
            } else {
                run("failed", "error")
            })
        });

        let mut monitor = RunMonitor::new(
            Arc::new(mock),
            1,
            7,
            Duration::from_millis(1),
            LayoutOptions::default(),
        );
        let mut changes = 0;
        let finished = monitor.watch(|_, _| changes += 1).await.unwrap();
        assert_eq!(finished.status, "failed");
        assert_eq!(changes, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_graph() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockPipelineBackend::new();
        mock.expect_get_run().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(run("running", "running"))
            } else {
                Err(crate::error::StudioError::Api {
                    status: 502,
                    message: "bad gateway".into(),
                })
            }
        });
        let mut monitor = RunMonitor::new(
            Arc::new(mock),
            1,
            7,
            Duration::from_millis(1),
            LayoutOptions::default(),
        );
        monitor.poll().await.unwrap();
        assert!(monitor.poll().await.is_err());
        assert!(monitor.graph().is_some());
    }

    #[tokio::test]
    async fn test_watch_survives_transient_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockPipelineBackend::new();
        mock.expect_get_run().returning(move |_, _| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(run("running", "running")),
                1 => Err(crate::error::StudioError::Api {
                    status: 503,
                    message: "unavailable".into(),
                }),
                _ => Ok(run("completed", "completed")),
            }
        });

        let mut monitor = RunMonitor::new(
            Arc::new(mock),
            1,
            7,
            Duration::from_millis(1),
            LayoutOptions::default(),
        );
        let finished = monitor.watch(|_, _| {}).await.unwrap();
        assert_eq!(finished.status, "completed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(monitor.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn test_watch_gives_up_after_error_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut mock = MockPipelineBackend::new();
        mock.expect_get_run().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(run("running", "running"))
            } else {
                Err(crate::error::StudioError::Api {
                    status: 502,
                    message: "bad gateway".into(),
                })
            }
        });

        let mut monitor = RunMonitor::new(
            Arc::new(mock),
            1,
            7,
            Duration::from_millis(1),
            LayoutOptions::default(),
        )
        .with_error_budget(2);
        assert!(monitor.watch(|_, _| {}).await.is_err());
        // One success, two tolerated failures, then the third failure ends the watch
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(monitor.consecutive_failures(), 3);
        assert!(monitor.graph().is_some());
    }

    #[tokio::test]
    async fn test_retarget_resets_state() {
        let mut mock = MockPipelineBackend::new();
        mock.expect_get_run()
            .returning(|_, _| Ok(run("running", "running")));
        let mut monitor = RunMonitor::new(
            Arc::new(mock),
            1,
            7,
            Duration::from_millis(1),
            LayoutOptions::default(),
        );
        monitor.poll().await.unwrap();
        monitor.retarget(1, 8);
        assert!(monitor.graph().is_none());
        assert!(monitor.poll().await.unwrap().changed);
    }
}
