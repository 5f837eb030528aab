//! Scan output. Everything here serializes to the report JSON.

use serde::Serialize;
use sheetguard_common::ScanIssue;

use crate::cycles::Cycle;
use crate::detectors::circular::CircularFindings;
use crate::detectors::constants::HardcodedConstantFinding;
use crate::detectors::drift::DriftFinding;
use crate::detectors::orphans::OrphanFinding;
use crate::graph::{GraphStats, SymbolicEdge};
use crate::impact::ImpactEntry;
use crate::risk::RiskTier;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrialInfo {
    pub enabled: bool,
    pub formula_limit: usize,
    pub formulas_scanned: usize,
    pub truncated: bool,
}

/// Workbook-wide signal counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Signals {
    pub circular: usize,
    pub volatile: usize,
    pub symbolic: usize,
    pub hardcoded_constants: usize,
    pub orphan_formulas: usize,
    pub drift_formulas: usize,
    pub top_risks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub sheet: String,
    pub risk: RiskTier,
    pub formulas: usize,
    pub circular_cells: usize,
    pub high_risk_cells: usize,
    pub reason: String,
}

/// Which capped collections dropped entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Truncation {
    pub cycles: bool,
    pub impact_reach: bool,
    pub hardcoded_constants: bool,
    pub formula_drift: bool,
    pub orphan_formulas: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub workbook: String,
    pub trial: bool,
    pub trial_info: TrialInfo,
    pub workbook_risk: RiskTier,
    pub reason: String,
    pub signals: Signals,
    pub graph: GraphStats,
    pub findings: Vec<CircularFindings>,
    pub hardcoded_constants: Vec<HardcodedConstantFinding>,
    pub orphan_formulas: Vec<OrphanFinding>,
    pub formula_drift: Vec<DriftFinding>,
    pub sheets: Vec<SheetSummary>,
    pub top_risks: Vec<ImpactEntry>,
    pub cycles: Vec<Cycle>,
    pub symbolic_edges: Vec<SymbolicEdge>,
    pub truncation: Truncation,
    pub errors: Vec<ScanIssue>,
}

impl ScanResult {
    pub fn sheet(&self, name: &str) -> Option<&SheetSummary> {
        self.sheets.iter().find(|s| s.sheet == name)
    }

    pub fn has_cycles(&self) -> bool {
        self.cycles.iter().any(Cycle::is_cycle)
    }
}
