//! Orphan formulas: formula cells that no other formula reads.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::Value;
use sheetguard_common::{CellCoord, NodeKey, split_node_key};

use crate::config::ConfigTree;
use crate::graph::{DependencyGraph, NodeId};

pub const ORPHAN_REASON: &str = "formula not referenced by any other formula cell";

/// Populated extent of a sheet, 1-based. Zero means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SheetBounds {
    pub max_row: u32,
    pub max_col: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrphanConfig {
    pub enabled: bool,
    pub exclude_sheets: Vec<String>,
    pub exclude_named_ranges: bool,
    pub exclude_last_row: bool,
    pub exclude_last_column: bool,
    pub max_findings: usize,
}

impl OrphanConfig {
    pub const DEFAULT_MAX_FINDINGS: usize = 100;

    /// Build from the `app.detectors.orphan_calculations` subtree.
    ///
    /// Boundary exclusion reads `exclude_last_row_or_col` first, then the
    /// older `exclude_last_row_col`, then the per-axis `exclude_last_row` /
    /// `exclude_last_column` pair. With none of them set both axes are excluded.
    pub fn from_tree(tree: &ConfigTree) -> Self {
        let flag = |key: &str| tree.get(key).and_then(Value::as_bool);
        let (exclude_last_row, exclude_last_column) = match (
            flag("exclude_last_row_or_col"),
            flag("exclude_last_row_col"),
        ) {
            (Some(both), _) | (None, Some(both)) => (both, both),
            (None, None) if tree.contains("exclude_last_row") || tree.contains("exclude_last_column") => (
                tree.bool_or("exclude_last_row", false),
                tree.bool_or("exclude_last_column", false),
            ),
            (None, None) => (true, true),
        };

        Self {
            enabled: tree.bool_or("enabled", true),
            exclude_sheets: tree.string_list("exclude_sheets"),
            exclude_named_ranges: tree.bool_or("exclude_named_ranges", true),
            exclude_last_row,
            exclude_last_column,
            max_findings: tree.usize_or("max_findings", Self::DEFAULT_MAX_FINDINGS),
        }
    }

    fn on_excluded_boundary(&self, address: &str, bounds: SheetBounds) -> bool {
        if !(self.exclude_last_row || self.exclude_last_column) {
            return false;
        }
        let Ok(coord) = CellCoord::parse(address) else {
            return false;
        };
        (self.exclude_last_row && bounds.max_row > 0 && coord.row == bounds.max_row)
            || (self.exclude_last_column && bounds.max_col > 0 && coord.col == bounds.max_col)
    }
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self::from_tree(&ConfigTree::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanFinding {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sheet: String,
    pub cell: String,
    pub formula: String,
    pub reason: &'static str,
}

impl OrphanFinding {
    pub const KIND: &'static str = "ORPHAN_FORMULA";
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanReport {
    pub findings: Vec<OrphanFinding>,
    /// Every orphan, including those past the findings cap.
    pub total: usize,
    pub by_sheet: BTreeMap<String, usize>,
    pub truncated: bool,
}

/// Flag formula nodes with no incoming edge from another formula node.
///
/// `named_cells` holds `Sheet!A1` keys of named-range destinations; `formulas`
/// supplies the text shown in each finding.
pub fn detect_orphan_formulas(
    graph: &DependencyGraph,
    formula_nodes: &[NodeId],
    formulas: &FxHashMap<NodeId, String>,
    named_cells: &FxHashSet<NodeKey>,
    bounds: &FxHashMap<String, SheetBounds>,
    cfg: &OrphanConfig,
) -> OrphanReport {
    let mut report = OrphanReport::default();
    if !cfg.enabled {
        return report;
    }
    let is_formula: FxHashSet<NodeId> = formula_nodes.iter().copied().collect();

    for &node in formula_nodes {
        let key = graph.key(node);
        let Some((sheet, address)) = split_node_key(key) else {
            continue;
        };
        if cfg.exclude_sheets.iter().any(|s| s == sheet) {
            continue;
        }
        if cfg.exclude_named_ranges && named_cells.contains(key) {
            continue;
        }
        let sheet_bounds = bounds.get(sheet).copied().unwrap_or_default();
        if cfg.on_excluded_boundary(address, sheet_bounds) {
            continue;
        }

        let read_by_formula = graph
            .dependents(node)
            .iter()
            .any(|&p| p != node && is_formula.contains(&p));
        if read_by_formula {
            continue;
        }

        report.total += 1;
        *report.by_sheet.entry(sheet.to_string()).or_default() += 1;
        if report.findings.len() < cfg.max_findings {
            report.findings.push(OrphanFinding {
                kind: OrphanFinding::KIND,
                sheet: sheet.to_string(),
                cell: address.to_string(),
                formula: formulas.get(&node).cloned().unwrap_or_default(),
                reason: ORPHAN_REASON,
            });
        } else {
            report.truncated = true;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boundary_flags_resolve_legacy_keys() {
        let cfg = |v| OrphanConfig::from_tree(&ConfigTree::new(v));

        let d = cfg(json!({}));
        assert!(d.exclude_last_row && d.exclude_last_column);

        let off = cfg(json!({"exclude_last_row_or_col": false, "exclude_last_row_col": true}));
        assert!(!off.exclude_last_row && !off.exclude_last_column);

        let legacy = cfg(json!({"exclude_last_row_col": false}));
        assert!(!legacy.exclude_last_row && !legacy.exclude_last_column);

        let rows_only = cfg(json!({"exclude_last_row": true}));
        assert!(rows_only.exclude_last_row && !rows_only.exclude_last_column);
    }

    #[test]
    fn self_reference_does_not_count_as_a_reader() {
        let mut g = DependencyGraph::new();
        let a1 = g.ensure_node("S!A1");
        g.add_edge(a1, a1);
        let report = detect_orphan_formulas(
            &g,
            &[a1],
            &FxHashMap::default(),
            &FxHashSet::default(),
            &FxHashMap::default(),
            &OrphanConfig::default(),
        );
        assert_eq!(report.total, 1);
        assert_eq!(report.findings[0].cell, "A1");
        assert_eq!(report.findings[0].reason, ORPHAN_REASON);
    }

    #[test]
    fn excluded_sheets_are_skipped_and_cap_counts_everything() {
        let mut g = DependencyGraph::new();
        let nodes: Vec<NodeId> = ["Calc!A1", "Calc!A2", "Calc!A3", "Notes!A1"]
            .iter()
            .map(|k| g.ensure_node(k))
            .collect();
        let cfg = OrphanConfig {
            exclude_sheets: vec!["Notes".into()],
            max_findings: 2,
            ..OrphanConfig::default()
        };
        let report = detect_orphan_formulas(
            &g,
            &nodes,
            &FxHashMap::default(),
            &FxHashSet::default(),
            &FxHashMap::default(),
            &cfg,
        );
        assert_eq!(report.total, 3);
        assert_eq!(report.findings.len(), 2);
        assert!(report.truncated);
        assert_eq!(report.by_sheet.get("Calc"), Some(&3));
        assert_eq!(report.by_sheet.get("Notes"), None);

        let json = serde_json::to_value(&report.findings[0]).unwrap();
        assert_eq!(json["type"], "ORPHAN_FORMULA");
    }
}
