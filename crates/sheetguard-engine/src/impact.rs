//! Impact ranking: how far a change to a formula cell would propagate.

use std::collections::VecDeque;

use serde::Serialize;
use sheetguard_common::NodeKey;

use crate::config::ConfigTree;
use crate::graph::{DependencyGraph, NodeId};

pub const IMPACT_EXPLANATION: &str = "High impact radius: many downstream dependents.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpactConfig {
    pub max_reach_nodes: usize,
}

impl ImpactConfig {
    pub const DEFAULT_MAX_REACH_NODES: usize = 200_000;

    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            max_reach_nodes: tree
                .usize_or("app.graph.max_reach_nodes", Self::DEFAULT_MAX_REACH_NODES),
        }
    }
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            max_reach_nodes: Self::DEFAULT_MAX_REACH_NODES,
        }
    }
}

/// Count distinct nodes whose formulas transitively depend on `start`.
///
/// `start` itself is never counted, even inside a cycle. The walk stops once
/// `max_nodes` have been seen; the second value reports whether it did.
pub fn downstream_reach(graph: &DependencyGraph, start: NodeId, max_nodes: usize) -> (usize, bool) {
    let mut seen = vec![false; graph.node_count()];
    seen[start.as_index()] = true;
    let mut queue = VecDeque::from([start]);
    let mut reach = 0usize;

    while let Some(node) = queue.pop_front() {
        for &next in graph.dependents(node) {
            if seen[next.as_index()] {
                continue;
            }
            if reach >= max_nodes {
                return (reach, true);
            }
            seen[next.as_index()] = true;
            reach += 1;
            queue.push_back(next);
        }
    }
    (reach, false)
}

/// One ranked cell. Both counts follow edges toward dependents: the cells
/// whose formulas read this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactEntry {
    pub cell: NodeKey,
    /// Distinct cells reachable through dependents, bounded by `max_nodes`.
    pub downstream_reach: usize,
    /// Number of direct dependents (the node's in-degree in the
    /// dependent-to-precedent edge orientation).
    pub direct_fan_out: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImpactRanking {
    pub entries: Vec<ImpactEntry>,
    /// At least one reach count hit `max_nodes` and is only a lower bound.
    pub reach_capped: bool,
}

/// Rank formula nodes by downstream reach, then by direct fan-out.
///
/// Ties fall back to ascending node key so the output never depends on hash
/// or insertion order.
pub fn rank_high_risk_cells(
    graph: &DependencyGraph,
    formula_nodes: &[NodeId],
    top_n: usize,
    max_nodes: usize,
) -> ImpactRanking {
    let mut reach_capped = false;
    let mut scored: Vec<(usize, usize, &str)> = formula_nodes
        .iter()
        .map(|&node| {
            let (reach, capped) = downstream_reach(graph, node, max_nodes);
            reach_capped |= capped;
            (reach, graph.dependents(node).len(), graph.key(node))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(b.2)));
    scored.dedup_by(|a, b| a.2 == b.2);

    let entries = scored
        .into_iter()
        .take(top_n)
        .map(|(reach, fan_out, key)| ImpactEntry {
            cell: key.to_string(),
            downstream_reach: reach,
            direct_fan_out: fan_out,
            explanation: IMPACT_EXPLANATION.to_string(),
        })
        .collect();

    ImpactRanking {
        entries,
        reach_capped,
    }
}
