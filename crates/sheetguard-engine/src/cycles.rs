//! Simple-cycle enumeration.
//!
//! Strongly connected components are found with an iterative Tarjan pass and
//! each non-trivial component is then searched with Johnson's algorithm.
//! Self references come out as one-element cycles, ahead of everything else,
//! and are otherwise treated like any other cycle.

use rustc_hash::FxHashMap;
use serde::Serialize;
use sheetguard_common::NodeKey;

use crate::config::ConfigTree;
use crate::graph::{DependencyGraph, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    pub limit: usize,
}

impl CycleConfig {
    pub const DEFAULT_LIMIT: usize = 25;

    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            limit: tree.usize_or("app.graph.cycle_limit", Self::DEFAULT_LIMIT),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    Cycle,
    /// The search itself failed; `cells` is empty and `details` says why.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    #[serde(rename = "type")]
    pub kind: CycleKind,
    pub cells: Vec<NodeKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Cycle {
    pub fn new(cells: Vec<NodeKey>) -> Self {
        Self {
            kind: CycleKind::Cycle,
            cells,
            details: None,
        }
    }

    pub fn error(details: impl Into<String>) -> Self {
        Self {
            kind: CycleKind::Error,
            cells: Vec::new(),
            details: Some(details.into()),
        }
    }

    pub fn is_cycle(&self) -> bool {
        self.kind == CycleKind::Cycle
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycles: Vec<Cycle>,
    /// More cycles exist than `limit` allowed through.
    pub truncated: bool,
}

/// Enumerate up to `limit` distinct simple cycles as node keys.
pub fn detect_cycles(graph: &DependencyGraph, limit: usize) -> CycleReport {
    if limit == 0 {
        return CycleReport::default();
    }
    let mut found = simple_cycles(graph, limit.saturating_add(1));
    let truncated = found.len() > limit;
    found.truncate(limit);

    let cycles = found
        .into_iter()
        .map(|ids| Cycle::new(ids.into_iter().map(|id| graph.key(id).to_string()).collect()))
        .collect();
    CycleReport { cycles, truncated }
}

/// Johnson's simple-cycle search, stopping once `max` cycles are collected.
pub(crate) fn simple_cycles(graph: &DependencyGraph, max: usize) -> Vec<Vec<NodeId>> {
    let mut out = Vec::new();
    if max == 0 {
        return out;
    }

    for id in graph.node_ids() {
        if graph.has_self_loop(id) {
            out.push(vec![id]);
            if out.len() >= max {
                return out;
            }
        }
    }

    let all: Vec<NodeId> = graph.node_ids().collect();
    let mut work: Vec<Vec<NodeId>> = strongly_connected_components(graph, &all)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .collect();

    let mut search = JohnsonSearch::new(graph.node_count());
    while let Some(mut scc) = work.pop() {
        scc.sort_unstable();
        let start = scc[0];
        search.run(graph, &scc, start, max, &mut out);
        if out.len() >= max {
            return out;
        }
        let rest = &scc[1..];
        work.extend(
            strongly_connected_components(graph, rest)
                .into_iter()
                .filter(|c| c.len() > 1),
        );
    }
    out
}

const UNVISITED: usize = usize::MAX;

/// Tarjan's algorithm restricted to `members`, ignoring self loops.
///
/// Iterative so long dependency chains cannot exhaust the stack.
pub(crate) fn strongly_connected_components(
    graph: &DependencyGraph,
    members: &[NodeId],
) -> Vec<Vec<NodeId>> {
    let n = graph.node_count();
    let mut in_set = vec![false; n];
    for &m in members {
        in_set[m.as_index()] = true;
    }

    let mut index_counter = 0usize;
    let mut indices = vec![UNVISITED; n];
    let mut lowlinks = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<NodeId> = Vec::new();
    let mut sccs = Vec::new();

    for &root in members {
        if indices[root.as_index()] != UNVISITED {
            continue;
        }
        let mut call: Vec<(NodeId, usize)> = Vec::new();
        indices[root.as_index()] = index_counter;
        lowlinks[root.as_index()] = index_counter;
        index_counter += 1;
        stack.push(root);
        on_stack[root.as_index()] = true;
        call.push((root, 0));

        while let Some(frame) = call.last_mut() {
            let vertex = frame.0;
            let deps = graph.dependencies(vertex);
            if frame.1 < deps.len() {
                let next = deps[frame.1];
                frame.1 += 1;
                let ni = next.as_index();
                if next == vertex || !in_set[ni] {
                    continue;
                }
                if indices[ni] == UNVISITED {
                    indices[ni] = index_counter;
                    lowlinks[ni] = index_counter;
                    index_counter += 1;
                    stack.push(next);
                    on_stack[ni] = true;
                    call.push((next, 0));
                } else if on_stack[ni] {
                    let vi = vertex.as_index();
                    lowlinks[vi] = lowlinks[vi].min(indices[ni]);
                }
                continue;
            }

            call.pop();
            let vi = vertex.as_index();
            if let Some(&(parent, _)) = call.last() {
                let pi = parent.as_index();
                lowlinks[pi] = lowlinks[pi].min(lowlinks[vi]);
            }
            if lowlinks[vi] == indices[vi] {
                let mut scc = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w.as_index()] = false;
                    scc.push(w);
                    if w == vertex {
                        break;
                    }
                }
                sccs.push(scc);
            }
        }
    }

    sccs
}

/// Scratch state for one Johnson circuit search, reused across components.
struct JohnsonSearch {
    in_scc: Vec<bool>,
    blocked: Vec<bool>,
    closed: Vec<bool>,
    block_map: FxHashMap<NodeId, Vec<NodeId>>,
}

impl JohnsonSearch {
    fn new(n: usize) -> Self {
        Self {
            in_scc: vec![false; n],
            blocked: vec![false; n],
            closed: vec![false; n],
            block_map: FxHashMap::default(),
        }
    }

    fn neighbours(&self, graph: &DependencyGraph, v: NodeId) -> Vec<NodeId> {
        // reversed so popping from the end visits edges in insertion order
        graph
            .dependencies(v)
            .iter()
            .rev()
            .copied()
            .filter(|&w| w != v && self.in_scc[w.as_index()])
            .collect()
    }

    fn unblock(&mut self, node: NodeId) {
        let mut pending = vec![node];
        while let Some(v) = pending.pop() {
            if self.blocked[v.as_index()] {
                self.blocked[v.as_index()] = false;
                if let Some(waiting) = self.block_map.remove(&v) {
                    pending.extend(waiting);
                }
            }
        }
    }

    fn run(
        &mut self,
        graph: &DependencyGraph,
        scc: &[NodeId],
        start: NodeId,
        max: usize,
        out: &mut Vec<Vec<NodeId>>,
    ) {
        for &v in scc {
            let i = v.as_index();
            self.in_scc[i] = true;
            self.blocked[i] = false;
            self.closed[i] = false;
        }
        self.block_map.clear();

        let mut path = vec![start];
        self.blocked[start.as_index()] = true;
        let mut stack: Vec<(NodeId, Vec<NodeId>)> = vec![(start, self.neighbours(graph, start))];

        while let Some((this, nbrs)) = stack.last_mut() {
            let this = *this;
            if let Some(next) = nbrs.pop() {
                if next == start {
                    out.push(path.clone());
                    if out.len() >= max {
                        break;
                    }
                    for &p in &path {
                        self.closed[p.as_index()] = true;
                    }
                } else if !self.blocked[next.as_index()] {
                    path.push(next);
                    self.closed[next.as_index()] = false;
                    self.blocked[next.as_index()] = true;
                    let next_nbrs = self.neighbours(graph, next);
                    stack.push((next, next_nbrs));
                    continue;
                }
            }

            let exhausted = stack.last().is_some_and(|(_, n)| n.is_empty());
            if exhausted {
                if self.closed[this.as_index()] {
                    self.unblock(this);
                } else {
                    for w in self.neighbours(graph, this) {
                        let waiting = self.block_map.entry(w).or_default();
                        if !waiting.contains(&this) {
                            waiting.push(this);
                        }
                    }
                }
                stack.pop();
                path.pop();
            }
        }

        for &v in scc {
            self.in_scc[v.as_index()] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (a, b) in edges {
            let a = g.ensure_node(a);
            let b = g.ensure_node(b);
            g.add_edge(a, b);
        }
        g
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let g = graph(&[("A", "B"), ("B", "C"), ("A", "C")]);
        assert_eq!(detect_cycles(&g, 25), CycleReport::default());
    }

    #[test]
    fn self_loop_is_a_one_element_cycle() {
        let g = graph(&[("A", "A"), ("A", "B")]);
        let report = detect_cycles(&g, 25);
        assert_eq!(report.cycles, vec![Cycle::new(vec!["A".into()])]);
    }

    #[test]
    fn finds_every_elementary_circuit() {
        // A→B→A, B→C→A, plus a tail D→A that belongs to no cycle
        let g = graph(&[("A", "B"), ("B", "A"), ("B", "C"), ("C", "A"), ("D", "A")]);
        let report = detect_cycles(&g, 25);
        let mut sets: Vec<Vec<String>> = report
            .cycles
            .iter()
            .map(|c| {
                let mut cells = c.cells.clone();
                cells.sort();
                cells
            })
            .collect();
        sets.sort();
        assert_eq!(
            sets,
            vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["A".to_string(), "B".to_string(), "C".to_string()],
            ]
        );
        assert!(!report.truncated);
    }

    #[test]
    fn unbounded_limit_still_reports_cycles() {
        let g = graph(&[("A", "B"), ("B", "A")]);
        let report = detect_cycles(&g, usize::MAX);
        assert_eq!(report.cycles.len(), 1);
        assert!(!report.truncated);
    }

    #[test]
    fn limit_stops_the_search() {
        // complete digraph on four nodes has 20 simple cycles
        let names = ["A", "B", "C", "D"];
        let mut edges = Vec::new();
        for a in names {
            for b in names {
                if a != b {
                    edges.push((a, b));
                }
            }
        }
        let g = graph(&edges);
        assert_eq!(simple_cycles(&g, usize::MAX).len(), 20);

        let report = detect_cycles(&g, 5);
        assert_eq!(report.cycles.len(), 5);
        assert!(report.truncated);

        let exact = detect_cycles(&g, 20);
        assert_eq!(exact.cycles.len(), 20);
        assert!(!exact.truncated);
    }

    #[test]
    fn tarjan_handles_long_chains_iteratively() {
        let mut g = DependencyGraph::new();
        let mut prev = g.ensure_node("N0");
        for i in 1..50_000 {
            let next = g.ensure_node(&format!("N{i}"));
            g.add_edge(prev, next);
            prev = next;
        }
        let first = g.node_id("N0").unwrap();
        g.add_edge(prev, first);

        let all: Vec<NodeId> = g.node_ids().collect();
        let sccs = strongly_connected_components(&g, &all);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 50_000);
        assert_eq!(detect_cycles(&g, 25).cycles[0].cells.len(), 50_000);
    }

    #[test]
    fn cycle_entries_serialize_with_type_tag() {
        let json = serde_json::to_value(Cycle::new(vec!["S!A1".into()])).unwrap();
        assert_eq!(json, serde_json::json!({"type": "cycle", "cells": ["S!A1"]}));
        let err = serde_json::to_value(Cycle::error("boom")).unwrap();
        assert_eq!(err["type"], "error");
        assert_eq!(err["details"], "boom");
    }
}
