//! Graph topology helpers over node ids.
//!
//! Nodes are addressed by their index in the node slice; edges referencing
//! ids that are not in the slice are skipped.

use std::collections::{HashMap, VecDeque};

use crate::pipeline::id::NodeId;

/// Index of every node id.
pub fn index_of(nodes: &[NodeId]) -> HashMap<&NodeId, usize> {
    nodes.iter().enumerate().map(|(i, id)| (id, i)).collect()
}

/// Build forward and backward adjacency lists.
///
/// Self-loops and duplicate edges are dropped.
pub fn build_adjacency(
    nodes: &[NodeId],
    edges: &[(NodeId, NodeId)],
) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
    let n = nodes.len();
    let index = index_of(nodes);
    let mut fwd_adj = vec![Vec::new(); n];
    let mut bwd_adj = vec![Vec::new(); n];

    for (from, to) in edges {
        let (Some(&from), Some(&to)) = (index.get(from), index.get(to)) else {
            continue;
        };
        if from == to || fwd_adj[from].contains(&to) {
            continue;
        }
        fwd_adj[from].push(to);
        bwd_adj[to].push(from);
    }

    (fwd_adj, bwd_adj)
}

/// Topological order using Kahn's algorithm.
///
/// Returns `None` when the graph has a cycle.
pub fn topological_order(fwd_adj: &[Vec<usize>]) -> Option<Vec<usize>> {
    let n = fwd_adj.len();
    let mut in_degree = vec![0usize; n];
    for targets in fwd_adj {
        for &t in targets {
            in_degree[t] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut result = Vec::with_capacity(n);

    while let Some(node) = queue.pop_front() {
        result.push(node);
        for &neighbor in &fwd_adj[node] {
            in_degree[neighbor] -= 1;
            if in_degree[neighbor] == 0 {
                queue.push_back(neighbor);
            }
        }
    }

    (result.len() == n).then_some(result)
}

/// Whether `to` is reachable from `from` following edges forward (DFS).
pub fn reaches(fwd_adj: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut visited = vec![false; fwd_adj.len()];
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if std::mem::replace(&mut visited[node], true) {
            continue;
        }
        stack.extend(fwd_adj[node].iter().copied().filter(|&n| !visited[n]));
    }
    false
}

/// Whether adding `source -> target` closes a cycle.
pub fn would_create_cycle(
    nodes: &[NodeId],
    edges: &[(NodeId, NodeId)],
    source: &NodeId,
    target: &NodeId,
) -> bool {
    if source == target {
        return true;
    }
    let index = index_of(nodes);
    let (Some(&s), Some(&t)) = (index.get(source), index.get(target)) else {
        return false;
    };
    let (fwd_adj, _) = build_adjacency(nodes, edges);
    reaches(&fwd_adj, t, s)
}

/// Edges to reverse so the graph becomes acyclic.
///
/// Iterative DFS in node order; an edge into a node still on the stack is a
/// back edge.
pub fn back_edges(fwd_adj: &[Vec<usize>]) -> Vec<(usize, usize)> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let n = fwd_adj.len();
    let mut mark = vec![Mark::New; n];
    let mut reversed = Vec::new();

    for root in 0..n {
        if mark[root] != Mark::New {
            continue;
        }
        // (node, next child index)
        let mut stack = vec![(root, 0usize)];
        mark[root] = Mark::Active;
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let next = fwd_adj[node].get(frame.1).copied();
            frame.1 += 1;
            if let Some(next) = next {
                match mark[next] {
                    Mark::New => {
                        mark[next] = Mark::Active;
                        stack.push((next, 0));
                    }
                    Mark::Active => reversed.push((node, next)),
                    Mark::Done => {}
                }
            } else {
                mark[node] = Mark::Done;
                stack.pop();
            }
        }
    }

    reversed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::from(*n)).collect()
    }

    fn edge(a: &str, b: &str) -> (NodeId, NodeId) {
        (NodeId::from(a), NodeId::from(b))
    }

    #[test]
    fn test_adjacency_skips_unknown_and_self_loops() {
        let nodes = ids(&["a", "b"]);
        let edges = vec![edge("a", "b"), edge("a", "a"), edge("a", "zz"), edge("a", "b")];
        let (fwd, bwd) = build_adjacency(&nodes, &edges);
        assert_eq!(fwd[0], vec![1]);
        assert_eq!(bwd[1], vec![0]);
    }

    #[test]
    fn test_topological_order() {
        let nodes = ids(&["c", "b", "a"]);
        let edges = vec![edge("a", "b"), edge("b", "c")];
        let (fwd, _) = build_adjacency(&nodes, &edges);
        assert_eq!(topological_order(&fwd), Some(vec![2, 1, 0]));
    }

    #[test]
    fn test_topological_order_detects_cycle() {
        let nodes = ids(&["a", "b"]);
        let edges = vec![edge("a", "b"), edge("b", "a")];
        let (fwd, _) = build_adjacency(&nodes, &edges);
        assert_eq!(topological_order(&fwd), None);
    }

    #[test]
    fn test_would_create_cycle() {
        let nodes = ids(&["a", "b", "c"]);
        let edges = vec![edge("a", "b"), edge("b", "c")];
        assert!(would_create_cycle(&nodes, &edges, &"c".into(), &"a".into()));
        assert!(!would_create_cycle(&nodes, &edges, &"a".into(), &"c".into()));
        assert!(would_create_cycle(&nodes, &edges, &"b".into(), &"b".into()));
    }

    #[test]
    fn test_back_edges_break_all_cycles() {
        let nodes = ids(&["a", "b", "c", "d"]);
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a"), edge("c", "d")];
        let (mut fwd, _) = build_adjacency(&nodes, &edges);
        let reversed = back_edges(&fwd);
        assert_eq!(reversed, vec![(2, 0)]);
        for (from, to) in reversed {
            fwd[from].retain(|&t| t != to);
            fwd[to].push(from);
        }
        assert!(topological_order(&fwd).is_some());
    }
}
