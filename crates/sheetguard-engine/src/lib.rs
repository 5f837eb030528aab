//! Read-only analysis of spreadsheet formula networks.
//!
//! Nothing here evaluates a formula. A scan tokenizes every formula cell,
//! builds a dependency graph from the references, and then runs the cycle,
//! impact and heuristic detectors before assigning LOW/MEDIUM/HIGH tiers per
//! sheet and for the workbook as a whole.

pub mod config;
pub mod cycles;
pub mod detectors;
pub mod graph;
pub mod impact;
pub mod input;
pub mod result;
pub mod risk;
pub mod scan;

mod isolate;

#[cfg(test)]
mod tests;

pub use config::{ConfigTree, ScanConfig, TrialConfig};
pub use cycles::{Cycle, CycleConfig, CycleKind, CycleReport, detect_cycles};
pub use detectors::circular::{CircularFindings, CircularItem, CycleShape, circular_reference_findings};
pub use detectors::constants::{
    ConstantHit, ConstantsConfig, HardcodedConstantFinding, detect_hardcoded_constants,
};
pub use detectors::drift::{DriftConfig, DriftFinding, DriftReport, detect_formula_drift};
pub use detectors::orphans::{
    OrphanConfig, OrphanFinding, OrphanReport, SheetBounds, detect_orphan_formulas,
};
pub use detectors::{FormulaCell, SheetFormulas};
pub use graph::{DependencyGraph, GraphStats, NodeId, SymbolicEdge, add_formula_edges};
pub use impact::{ImpactConfig, ImpactEntry, ImpactRanking, downstream_reach, rank_high_risk_cells};
pub use input::{CellInput, CellValue, NamedRange, SheetInput, WorkbookInput};
pub use result::{ScanResult, SheetSummary, Signals, Truncation, TrialInfo};
pub use risk::{
    BooleanRules, RiskScope, RiskScoringConfig, RiskTier, ScopeStrategy, SignalCounts,
    TierAssessment, TierStrategy, WeightedScoring, Weights,
};
pub use scan::{ScanOptions, Scanner};
