//! Benchmarks for graph layout and store operations
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use etl_studio::pipeline::{compute_layout, EdgePolicy, GraphStore, LayoutOptions, NodeId, VisualKind};

/// Layered DAG with `width` nodes per layer, each wired to two nodes of the next layer
fn layered_dag(size: usize, width: usize) -> (Vec<NodeId>, Vec<(NodeId, NodeId)>) {
    let nodes: Vec<NodeId> = (0..size).map(|i| NodeId::from(format!("n{i}"))).collect();
    let mut edges = Vec::new();
    for i in 0..size {
        let next_layer = (i / width + 1) * width;
        for offset in [0, 1] {
            let target = next_layer + (i + offset) % width;
            if target < size {
                edges.push((nodes[i].clone(), nodes[target].clone()));
            }
        }
    }
    (nodes, edges)
}

fn bench_compute_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_layout");
    let options = LayoutOptions::default();

    for size in [10, 100, 500].iter() {
        let (nodes, edges) = layered_dag(*size, 5);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| compute_layout(black_box(&nodes), black_box(&edges), &options));
        });
    }

    group.finish();
}

fn bench_chain_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_layout");
    let options = LayoutOptions::default();

    for size in [10, 100, 500].iter() {
        let (nodes, edges) = layered_dag(*size, 1);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| compute_layout(black_box(&nodes), black_box(&edges), &options));
        });
    }

    group.finish();
}

fn bench_acyclic_connect(c: &mut Criterion) {
    let mut group = c.benchmark_group("acyclic_connect");

    for size in [10, 100].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut store = GraphStore::new(EdgePolicy::Acyclic);
                let ids: Vec<NodeId> = (0..size)
                    .filter_map(|_| store.add_node(VisualKind::Transform, None, None).ok())
                    .collect();
                for pair in ids.windows(2) {
                    let _ = store.connect(&pair[0], &pair[1]);
                }
                // Closing edge is always rejected
                let _ = store.connect(&ids[size - 1], &ids[0]);
                black_box(store.edges().len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compute_layout,
    bench_chain_layout,
    bench_acyclic_connect
);
criterion_main!(benches);
