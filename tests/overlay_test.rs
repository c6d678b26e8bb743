//! Run-status overlay tests

mod common;

use common::builders::{etl_chain, run_of, StepBuilder};
use common::{assert_float_eq, test_poll_interval};
use etl_studio::backend::{FailPoint, InMemoryBackend, PipelineBackend};
use etl_studio::overlay::{decorate, EdgeEmphasis, RunMonitor, VisualState};
use etl_studio::pipeline::{GraphStore, LayoutOptions, NodeId};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_completed_step_throughput() {
    let step = StepBuilder::new("extract", "completed")
        .records(100, 80)
        .duration(2.0)
        .build();
    let graph = decorate(&etl_chain(1), &[step], &LayoutOptions::default());

    let node = graph.node(&NodeId::from("extract")).unwrap();
    assert_eq!(node.state(), VisualState::Success);
    assert_float_eq(node.throughput.unwrap(), 40.0, 1e-9);
    assert_eq!(
        graph
            .edge(&NodeId::from("extract"), &NodeId::from("clean"))
            .unwrap()
            .emphasis,
        EdgeEmphasis::Emphasized
    );
}

#[test]
fn test_edge_emphasis_follows_source_state() {
    let steps = vec![
        StepBuilder::new("extract", "running").build(),
        StepBuilder::new("clean", "error").error("bad row").build(),
    ];
    let graph = decorate(&etl_chain(1), &steps, &LayoutOptions::default());

    let first = graph
        .edge(&NodeId::from("extract"), &NodeId::from("clean"))
        .unwrap();
    assert!(first.emphasis.is_animated() && first.emphasis.has_glow());
    let second = graph
        .edge(&NodeId::from("clean"), &NodeId::from("load"))
        .unwrap();
    assert_eq!(second.emphasis, EdgeEmphasis::Destructive);
    assert_eq!(
        graph.node(&NodeId::from("load")).unwrap().state(),
        VisualState::Pending
    );
}

#[test]
fn test_zero_duration_has_no_throughput() {
    let step = StepBuilder::new("extract", "completed")
        .records(10, 10)
        .duration(0.0)
        .build();
    let graph = decorate(&etl_chain(1), &[step], &LayoutOptions::default());
    assert!(graph.node(&NodeId::from("extract")).unwrap().throughput.is_none());
}

#[test]
fn test_overlay_shares_ids_with_editor_and_lays_out() {
    let version = etl_chain(1);
    let mut store = GraphStore::default();
    store.load_version(&version, &LayoutOptions::default());
    let graph = decorate(&version, &[], &LayoutOptions::default());

    let editor_ids: Vec<&NodeId> = store.nodes().iter().map(|n| &n.id).collect();
    let overlay_ids: Vec<&NodeId> = graph.nodes.iter().map(|n| &n.node.id).collect();
    assert_eq!(editor_ids, overlay_ids);
    assert!(graph.nodes.iter().all(|n| n.node.position().is_some()));
    assert_eq!(graph.summary().pending, 3);
}

#[tokio::test]
async fn test_monitor_follows_triggered_run() {
    let backend = Arc::new(InMemoryBackend::new());
    let run = run_of(
        1,
        "running",
        etl_chain(1),
        vec![StepBuilder::new("extract", "running").build()],
    );
    backend.insert_run(run);

    let mut monitor = RunMonitor::new(
        backend.clone(),
        1,
        1,
        test_poll_interval(),
        LayoutOptions::default(),
    );
    assert!(monitor.poll().await.unwrap().changed);
    assert!(!monitor.poll().await.unwrap().changed);

    backend
        .update_step(
            1,
            1,
            StepBuilder::new("extract", "completed")
                .records(100, 80)
                .duration(2.0)
                .build(),
        )
        .unwrap();
    let update = monitor.poll().await.unwrap();
    assert!(update.changed && !update.terminal);
    let graph = monitor.graph().unwrap();
    assert_eq!(
        graph.node(&NodeId::from("extract")).unwrap().state(),
        VisualState::Success
    );

    backend.set_run_status(1, 1, "completed").unwrap();
    assert!(monitor.poll().await.unwrap().terminal);
    assert!(monitor.is_finished());
}

#[tokio::test]
async fn test_watch_until_terminal() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_run(run_of(3, "running", etl_chain(1), vec![]));

    let updater = backend.clone();
    let worker = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        updater
            .update_step(1, 3, StepBuilder::new("extract", "completed").build())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        updater.set_run_status(1, 3, "failed").unwrap();
    });

    let mut monitor = RunMonitor::new(
        backend.clone(),
        1,
        3,
        test_poll_interval(),
        LayoutOptions::default(),
    );
    let mut seen = Vec::new();
    let finished = monitor
        .watch(|run, _| seen.push(run.status.clone()))
        .await
        .unwrap();
    worker.await.unwrap();

    assert_eq!(finished.status, "failed");
    assert_eq!(seen.last().map(String::as_str), Some("failed"));
    assert!(seen.len() >= 2);
}

#[tokio::test]
async fn test_failed_poll_keeps_previous_graph() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_run(run_of(1, "running", etl_chain(1), vec![]));
    let mut monitor = RunMonitor::new(
        backend.clone(),
        1,
        1,
        test_poll_interval(),
        LayoutOptions::default(),
    );
    monitor.poll().await.unwrap();

    backend.fail_next(FailPoint::GetRun, "gateway timeout");
    assert!(monitor.poll().await.is_err());
    assert_eq!(monitor.graph().unwrap().nodes.len(), 3);

    assert!(backend.get_run(1, 1).await.is_ok());
}

#[tokio::test]
async fn test_watch_rides_out_failed_poll() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_run(run_of(
        2,
        "completed",
        etl_chain(1),
        vec![StepBuilder::new("extract", "completed").build()],
    ));
    backend.fail_next(FailPoint::GetRun, "service unavailable");

    let mut monitor = RunMonitor::new(
        backend.clone(),
        1,
        2,
        test_poll_interval(),
        LayoutOptions::default(),
    );
    let finished = monitor.watch(|_, _| {}).await.unwrap();

    assert_eq!(finished.status, "completed");
    assert_eq!(monitor.consecutive_failures(), 0);
    assert_eq!(monitor.graph().unwrap().nodes.len(), 3);
}
