//! Formula dependency graph.
//!
//! An edge `A → B` means "the formula in A references B". Nodes are keyed by
//! `Sheet!ADDR` strings and interned into dense [`NodeId`]s; adjacency is kept
//! in both directions, in insertion order, so every traversal is deterministic.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use sheetguard_common::{NodeKey, node_key};
use sheetguard_parse::{RefKind, RefToken};

/// Dense node handle, valid only for the graph that produced it.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    keys: Vec<NodeKey>,
    index: FxHashMap<NodeKey, NodeId>,
    /// Outgoing edges: what each node references.
    dependencies: Vec<Vec<NodeId>>,
    /// Incoming edges: which nodes reference this one.
    dependents: Vec<Vec<NodeId>>,
    edges: FxHashSet<(NodeId, NodeId)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `key`, returning the existing id when already present.
    pub fn ensure_node(&mut self, key: &str) -> NodeId {
        if let Some(&id) = self.index.get(key) {
            return id;
        }
        let id = NodeId::new(self.keys.len() as u32);
        self.keys.push(key.to_string());
        self.index.insert(key.to_string(), id);
        self.dependencies.push(Vec::new());
        self.dependents.push(Vec::new());
        id
    }

    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn key(&self, id: NodeId) -> &str {
        &self.keys[id.as_index()]
    }

    /// Add `from → to`. Returns false when the edge already existed.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if !self.edges.insert((from, to)) {
            return false;
        }
        self.dependencies[from.as_index()].push(to);
        self.dependents[to.as_index()].push(from);
        true
    }

    pub fn contains_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.dependencies[id.as_index()]
    }

    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        &self.dependents[id.as_index()]
    }

    pub fn has_self_loop(&self, id: NodeId) -> bool {
        self.contains_edge(id, id)
    }

    pub fn node_count(&self) -> usize {
        self.keys.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.keys.len() as u32).map(NodeId::new)
    }
}

/// A symbolic reference recorded alongside its ordinary graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolicEdge {
    pub dependent: NodeKey,
    #[serde(rename = "ref")]
    pub reference: NodeKey,
    pub raw: String,
    pub sheet: String,
    pub kind: RefKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub symbolic_refs: usize,
}

impl GraphStats {
    pub fn of(graph: &DependencyGraph, symbolic_refs: usize) -> Self {
        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            symbolic_refs,
        }
    }
}

/// Wire one formula cell into the graph.
///
/// Each token becomes an edge to `(token.sheet or sheet)!address`, with `$`
/// anchors dropped so `$A$1` and `A1` land on the same node. Symbolic tokens
/// get an ordinary edge too and are additionally appended to `symbolic`.
/// Callers must supply a non-empty sheet and cell address.
pub fn add_formula_edges(
    graph: &mut DependencyGraph,
    sheet: &str,
    cell: &str,
    tokens: &[RefToken],
    symbolic: &mut Vec<SymbolicEdge>,
) -> NodeId {
    debug_assert!(
        !sheet.is_empty() && !cell.is_empty(),
        "formula cell needs a sheet and an address"
    );
    let dependent_key = node_key(sheet, cell);
    let dependent = graph.ensure_node(&dependent_key);

    for token in tokens {
        let ref_sheet = token.sheet.as_deref().unwrap_or(sheet);
        let ref_key = node_key(ref_sheet, &token.unanchored());
        let target = graph.ensure_node(&ref_key);
        graph.add_edge(dependent, target);

        if token.symbolic {
            symbolic.push(SymbolicEdge {
                dependent: dependent_key.clone(),
                reference: ref_key,
                raw: token.raw.clone(),
                sheet: ref_sheet.to_string(),
                kind: token.kind,
            });
        }
    }
    dependent
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetguard_parse::extract_references;

    #[test]
    fn edges_are_idempotent() {
        let mut g = DependencyGraph::new();
        let a = g.ensure_node("S!A1");
        let b = g.ensure_node("S!B1");
        assert!(g.add_edge(a, b));
        assert!(!g.add_edge(a, b));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.dependencies(a), &[b]);
        assert_eq!(g.dependents(b), &[a]);
        assert_eq!(g.ensure_node("S!A1"), a);
    }

    #[test]
    fn anchors_collapse_onto_one_node() {
        let mut g = DependencyGraph::new();
        let mut sym = Vec::new();
        let tokens = extract_references("=$A$1+A1+Other!$B2");
        let c1 = add_formula_edges(&mut g, "Main", "C1", &tokens, &mut sym);

        assert_eq!(g.key(c1), "Main!C1");
        let keys: Vec<&str> = g.dependencies(c1).iter().map(|&n| g.key(n)).collect();
        assert_eq!(keys, vec!["Other!B2", "Main!A1"]);
        assert!(sym.is_empty());
    }

    #[test]
    fn symbolic_tokens_get_edge_and_side_entry() {
        let mut g = DependencyGraph::new();
        let mut sym = Vec::new();
        let tokens = extract_references("=SUM(Sales[Amount])*Rate");
        add_formula_edges(&mut g, "Calc", "D4", &tokens, &mut sym);

        assert_eq!(g.edge_count(), 2);
        assert_eq!(sym.len(), 2);
        assert_eq!(sym[0].reference, "Calc!Sales[Amount]");
        assert_eq!(sym[1].raw, "Rate");
        assert_eq!(sym[1].sheet, "Calc");
        assert_eq!(sym[1].kind, RefKind::Symbolic);

        let json = serde_json::to_value(&sym[1]).unwrap();
        assert_eq!(json["ref"], "Calc!Rate");
        assert_eq!(json["dependent"], "Calc!D4");
    }

    #[test]
    fn stats_count_nodes_edges_and_symbolic() {
        let mut g = DependencyGraph::new();
        let mut sym = Vec::new();
        add_formula_edges(&mut g, "S", "A1", &extract_references("=B1+Name"), &mut sym);
        add_formula_edges(&mut g, "S", "A2", &extract_references("=B1"), &mut sym);
        let stats = GraphStats::of(&g, sym.len());
        assert_eq!(
            stats,
            GraphStats {
                nodes: 4,
                edges: 3,
                symbolic_refs: 1
            }
        );
    }
}
