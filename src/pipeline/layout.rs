//! Layered (Sugiyama-style) graph layout.
//!
//! Stages:
//!
//! ```text
//! break cycles ──► rank (longest path) ──► insert virtual nodes
//!              ──► order ranks (barycenter sweeps) ──► coordinates
//! ```
//!
//! The result depends only on the node order, the edge list and the
//! options, so identical inputs always produce identical positions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::id::NodeId;
use crate::pipeline::node::{VisualEdge, VisualNode};
use crate::pipeline::topology::{back_edges, build_adjacency, topological_order};
use crate::types::Position;

/// Number of barycenter sweeps (alternating down and up).
const SWEEPS: usize = 8;

/// Direction ranks advance in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankDir {
    /// Left to right
    #[default]
    LR,
    /// Right to left
    RL,
    /// Top to bottom
    TB,
    /// Bottom to top
    BT,
}

impl RankDir {
    fn is_horizontal(self) -> bool {
        matches!(self, RankDir::LR | RankDir::RL)
    }

    fn is_reversed(self) -> bool {
        matches!(self, RankDir::RL | RankDir::BT)
    }
}

/// Layout parameters, read from the `[layout]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub rank_dir: RankDir,
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between consecutive ranks
    pub rank_sep: f64,
    /// Gap between neighbours within a rank
    pub node_sep: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            rank_dir: RankDir::LR,
            node_width: 200.0,
            node_height: 80.0,
            rank_sep: 80.0,
            node_sep: 40.0,
        }
    }
}

/// Output of [`compute_layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Top-left corner per input node, in input order
    pub positions: Vec<Position>,
    /// Rank per input node
    pub ranks: Vec<usize>,
    /// Edge crossings left after ordering
    pub crossings: usize,
}

/// Layered graph with virtual nodes; indices `< real` are input nodes.
struct LayeredGraph {
    real: usize,
    rank: Vec<usize>,
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
    layers: Vec<Vec<usize>>,
}

/// Lay out a graph given as node ids and `(from, to)` pairs.
///
/// Edges to unknown ids and self-loops are ignored; cycles are broken by
/// reversing DFS back edges.
pub fn compute_layout(
    nodes: &[NodeId],
    edges: &[(NodeId, NodeId)],
    options: &LayoutOptions,
) -> Layout {
    if nodes.is_empty() {
        return Layout {
            positions: Vec::new(),
            ranks: Vec::new(),
            crossings: 0,
        };
    }

    let dag = acyclic_adjacency(nodes, edges);
    let ranks = longest_path_ranks(&dag);
    let mut graph = LayeredGraph::build(&dag, &ranks);
    let crossings = graph.minimise_crossings();
    let positions = graph.coordinates(options);

    debug!(
        nodes = nodes.len(),
        ranks = graph.layers.len(),
        virtual_nodes = graph.rank.len() - graph.real,
        crossings,
        "Computed layout"
    );

    Layout {
        positions,
        ranks,
        crossings,
    }
}

/// Lay out visual nodes, returning them with positions assigned.
pub fn layout(
    mut nodes: Vec<VisualNode>,
    edges: &[VisualEdge],
    options: &LayoutOptions,
) -> Vec<VisualNode> {
    apply_layout(&mut nodes, edges, options);
    nodes
}

/// Assign a position to every node in place.
pub fn apply_layout(nodes: &mut [VisualNode], edges: &[VisualEdge], options: &LayoutOptions) {
    let ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let pairs: Vec<(NodeId, NodeId)> = edges
        .iter()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();
    let result = compute_layout(&ids, &pairs, options);
    for (node, position) in nodes.iter_mut().zip(result.positions) {
        node.data.position = Some(position);
    }
}

fn acyclic_adjacency(nodes: &[NodeId], edges: &[(NodeId, NodeId)]) -> Vec<Vec<usize>> {
    let (mut fwd, _) = build_adjacency(nodes, edges);
    for (from, to) in back_edges(&fwd) {
        fwd[from].retain(|&t| t != to);
        if !fwd[to].contains(&from) {
            fwd[to].push(from);
        }
    }
    fwd
}

fn longest_path_ranks(dag: &[Vec<usize>]) -> Vec<usize> {
    let order = topological_order(dag).unwrap_or_else(|| (0..dag.len()).collect());
    let mut rank = vec![0usize; dag.len()];
    for &node in &order {
        for &next in &dag[node] {
            rank[next] = rank[next].max(rank[node] + 1);
        }
    }
    rank
}

impl LayeredGraph {
    fn build(dag: &[Vec<usize>], ranks: &[usize]) -> Self {
        let real = dag.len();
        let mut rank = ranks.to_vec();
        let mut preds = vec![Vec::new(); real];
        let mut succs = vec![Vec::new(); real];

        for from in 0..real {
            for &to in &dag[from] {
                // Chain through one virtual node per skipped rank
                let mut prev = from;
                for r in (rank[from] + 1)..rank[to] {
                    let v = rank.len();
                    rank.push(r);
                    preds.push(vec![prev]);
                    succs.push(Vec::new());
                    succs[prev].push(v);
                    prev = v;
                }
                succs[prev].push(to);
                preds[to].push(prev);
            }
        }

        let depth = rank.iter().copied().max().unwrap_or(0) + 1;
        let mut layers = vec![Vec::new(); depth];
        for (node, &r) in rank.iter().enumerate() {
            layers[r].push(node);
        }

        Self {
            real,
            rank,
            preds,
            succs,
            layers,
        }
    }

    fn order_index(&self) -> Vec<usize> {
        let mut index = vec![0usize; self.rank.len()];
        for layer in &self.layers {
            for (i, &node) in layer.iter().enumerate() {
                index[node] = i;
            }
        }
        index
    }

    fn crossings(&self) -> usize {
        let index = self.order_index();
        let mut total = 0;
        for layer in &self.layers {
            let edges: Vec<(usize, usize)> = layer
                .iter()
                .flat_map(|&u| self.succs[u].iter().map(move |&v| (u, v)))
                .map(|(u, v)| (index[u], index[v]))
                .collect();
            for (i, a) in edges.iter().enumerate() {
                for b in &edges[i + 1..] {
                    if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                        total += 1;
                    }
                }
            }
        }
        total
    }

    /// Reorder one layer by the barycenter of its neighbours in the
    /// adjacent, already-ordered layer.
    fn reorder(&mut self, layer: usize, downward: bool) {
        let index = self.order_index();
        let mut keyed: Vec<(f64, usize, usize)> = self.layers[layer]
            .iter()
            .map(|&node| {
                let neighbours = if downward {
                    &self.preds[node]
                } else {
                    &self.succs[node]
                };
                let current = index[node];
                let barycenter = if neighbours.is_empty() {
                    current as f64
                } else {
                    neighbours.iter().map(|&n| index[n] as f64).sum::<f64>()
                        / neighbours.len() as f64
                };
                (barycenter, current, node)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        self.layers[layer] = keyed.into_iter().map(|(_, _, node)| node).collect();
    }

    /// Run barycenter sweeps and keep the best order seen.
    fn minimise_crossings(&mut self) -> usize {
        let mut best = self.layers.clone();
        let mut best_crossings = self.crossings();
        let depth = self.layers.len();

        for sweep in 0..SWEEPS {
            if best_crossings == 0 {
                break;
            }
            if sweep % 2 == 0 {
                for layer in 1..depth {
                    self.reorder(layer, true);
                }
            } else {
                for layer in (0..depth.saturating_sub(1)).rev() {
                    self.reorder(layer, false);
                }
            }
            let crossings = self.crossings();
            if crossings < best_crossings {
                best_crossings = crossings;
                best = self.layers.clone();
            }
        }

        self.layers = best;
        best_crossings
    }

    fn coordinates(&self, options: &LayoutOptions) -> Vec<Position> {
        let horizontal = options.rank_dir.is_horizontal();
        let (along, across) = if horizontal {
            (options.node_width, options.node_height)
        } else {
            (options.node_height, options.node_width)
        };
        let depth = self.layers.len();

        // Centre of each real node as (rank axis, cross axis)
        let mut centres = vec![(0.0f64, 0.0f64); self.real];
        let mut min_cross = f64::INFINITY;
        for (r, layer) in self.layers.iter().enumerate() {
            let slot = |node: usize| if node < self.real { across } else { 0.0 };
            let extent: f64 = layer.iter().map(|&n| slot(n)).sum::<f64>()
                + options.node_sep * layer.len().saturating_sub(1) as f64;
            let rank_slot = if options.rank_dir.is_reversed() {
                depth - 1 - r
            } else {
                r
            };
            let along_centre = rank_slot as f64 * (along + options.rank_sep) + along / 2.0;

            let mut cursor = -extent / 2.0;
            for &node in layer {
                let size = slot(node);
                if node < self.real {
                    let cross_centre = cursor + size / 2.0;
                    centres[node] = (along_centre, cross_centre);
                    min_cross = min_cross.min(cross_centre - across / 2.0);
                }
                cursor += size + options.node_sep;
            }
        }

        let shift = if min_cross.is_finite() { -min_cross } else { 0.0 };
        centres
            .into_iter()
            .map(|(a, c)| {
                let c = c + shift;
                let (cx, cy) = if horizontal { (a, c) } else { (c, a) };
                Position::new(
                    cx - options.node_width / 2.0,
                    cy - options.node_height / 2.0,
                )
            })
            .collect()
    }
}
