//! The scan pipeline.
//!
//! Per formula cell: volatile scan, reference extraction, constant scan and
//! graph wiring. After the last cell: cycles, impact ranking, drift and
//! orphans over the finished graph, then risk tiers. Every step runs isolated;
//! a failure becomes a [`ScanIssue`] and the step's output is treated as empty.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use sheetguard_common::{IssueScope, NodeKey, ScanIssue, node_key, split_node_key};
use sheetguard_parse::{RefToken, detect_volatile_functions, extract_references};

use crate::config::ScanConfig;
use crate::cycles::{Cycle, CycleReport, detect_cycles};
use crate::detectors::circular::{CircularFindings, circular_reference_findings};
use crate::detectors::constants::{HardcodedConstantFinding, detect_hardcoded_constants};
use crate::detectors::drift::{DriftReport, detect_formula_drift};
use crate::detectors::orphans::{OrphanReport, SheetBounds, detect_orphan_formulas};
use crate::detectors::{FormulaCell, SheetFormulas};
use crate::graph::{DependencyGraph, GraphStats, NodeId, SymbolicEdge, add_formula_edges};
use crate::impact::{ImpactRanking, rank_high_risk_cells};
use crate::input::WorkbookInput;
use crate::isolate::guarded;
use crate::result::{ScanResult, SheetSummary, Signals, TrialInfo, Truncation};
use crate::risk::{RiskScope, SignalCounts};

pub const ALL_CLEAR_REASON: &str = "no risk signals detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub top_n: usize,
    /// Ask for trial mode; config may also turn it on by default.
    pub trial: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            trial: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SheetSignals {
    formulas: usize,
    volatile: usize,
    symbolic: usize,
    constants: usize,
}

/// Mutable state owned by one scan run.
#[derive(Default)]
struct ScanState {
    graph: DependencyGraph,
    formula_nodes: Vec<NodeId>,
    formula_text: FxHashMap<NodeId, String>,
    symbolic_edges: Vec<SymbolicEdge>,
    sheets: Vec<SheetFormulas>,
    sheet_signals: Vec<SheetSignals>,
    constant_findings: Vec<HardcodedConstantFinding>,
    constants_truncated: bool,
    volatile_hits: usize,
    symbolic_refs: usize,
    constant_hits: usize,
    formulas_scanned: usize,
    errors: Vec<ScanIssue>,
}

impl ScanState {
    fn record(&mut self, issue: ScanIssue) {
        tracing::warn!(
            scope = %issue.scope,
            kind = %issue.kind,
            dependent = %issue.dependent,
            details = %issue.details,
            "scan step failed; continuing"
        );
        self.errors.push(issue);
    }

    fn begin_sheet(&mut self, name: &str) -> usize {
        if let Some(idx) = self.sheets.iter().position(|f| f.sheet == name) {
            return idx;
        }
        self.sheets.push(SheetFormulas::new(name));
        self.sheet_signals.push(SheetSignals::default());
        self.sheets.len() - 1
    }
}

pub struct Scanner<'c> {
    config: &'c ScanConfig,
}

impl<'c> Scanner<'c> {
    pub fn new(config: &'c ScanConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, workbook: &WorkbookInput, options: &ScanOptions) -> ScanResult {
        let _span = tracing::info_span!("scan", workbook = workbook.name.as_str()).entered();
        let cfg = self.config;

        let mut state = ScanState {
            errors: workbook.issues.clone(),
            ..ScanState::default()
        };

        let trial_enabled = cfg.trial.is_enabled(options.trial);
        let formula_limit = cfg.trial.formula_limit;
        let mut truncated = false;

        for sheet in &workbook.sheets {
            let _span_sheet = tracing::debug_span!("scan_sheet", sheet = sheet.name.as_str()).entered();
            let idx = state.begin_sheet(&sheet.name);
            for cell in &sheet.cells {
                let Some(formula) = cell.value.formula() else {
                    continue;
                };
                if trial_enabled && state.formulas_scanned >= formula_limit {
                    truncated = true;
                    break;
                }
                self.scan_cell(&mut state, idx, &sheet.name, &cell.address, formula);
            }
            if truncated {
                tracing::warn!(
                    limit = formula_limit,
                    sheet = sheet.name.as_str(),
                    "trial formula limit reached; remaining cells skipped"
                );
                break;
            }
        }

        let cycle_report = match guarded(|| detect_cycles(&state.graph, cfg.cycles.limit)) {
            Ok(report) => report,
            Err(details) => {
                state.record(ScanIssue::new(IssueScope::Cycles, "detect_cycles_failed", details.clone()));
                CycleReport {
                    cycles: vec![Cycle::error(details)],
                    truncated: false,
                }
            }
        };

        let ranking = match guarded(|| {
            rank_high_risk_cells(
                &state.graph,
                &state.formula_nodes,
                options.top_n,
                cfg.impact.max_reach_nodes,
            )
        }) {
            Ok(ranking) => ranking,
            Err(details) => {
                state.record(ScanIssue::new(IssueScope::Impact, "rank_top_impact_failed", details));
                ImpactRanking::default()
            }
        };

        let drift = match guarded(|| detect_formula_drift(&state.sheets, &cfg.drift)) {
            Ok(report) => report,
            Err(details) => {
                state.record(ScanIssue::new(IssueScope::Detector, "formula_drift_failed", details));
                DriftReport::default()
            }
        };

        let orphans = self.run_orphans(&mut state, workbook);

        self.assemble(workbook, state, cycle_report, ranking, drift, orphans, TrialInfo {
            enabled: trial_enabled,
            formula_limit,
            formulas_scanned: 0,
            truncated,
        })
    }

    fn scan_cell(
        &self,
        state: &mut ScanState,
        sheet_idx: usize,
        sheet: &str,
        address: &str,
        formula: &str,
    ) {
        let dependent = node_key(sheet, address);
        state.sheets[sheet_idx]
            .cells
            .push(FormulaCell::new(address, formula));
        state.sheet_signals[sheet_idx].formulas += 1;
        state.formulas_scanned += 1;

        match guarded(|| detect_volatile_functions(formula)) {
            Ok(hits) => {
                state.volatile_hits += hits.len();
                state.sheet_signals[sheet_idx].volatile += hits.len();
            }
            Err(details) => state.record(
                ScanIssue::new(IssueScope::ParseFormula, "volatile_detect_failed", details)
                    .with_dependent(dependent.as_str()),
            ),
        }

        let tokens: Vec<RefToken> = match guarded(|| extract_references(formula)) {
            Ok(tokens) => tokens,
            Err(details) => {
                state.record(
                    ScanIssue::new(IssueScope::ParseFormula, "extract_reference_tokens_failed", details)
                        .with_dependent(dependent.as_str()),
                );
                Vec::new()
            }
        };
        let symbolic = tokens.iter().filter(|t| t.symbolic).count();
        state.symbolic_refs += symbolic;
        state.sheet_signals[sheet_idx].symbolic += symbolic;

        let constants = &self.config.constants;
        if constants.enabled {
            match guarded(|| detect_hardcoded_constants(formula, constants)) {
                Ok(hits) => {
                    state.constant_hits += hits.len();
                    state.sheet_signals[sheet_idx].constants += hits.len();
                    for hit in hits {
                        if state.constant_findings.len() >= constants.max_findings {
                            state.constants_truncated = true;
                            break;
                        }
                        state
                            .constant_findings
                            .push(hit.into_finding(sheet, address, formula));
                    }
                }
                Err(details) => state.record(
                    ScanIssue::new(
                        IssueScope::ParseFormula,
                        "hardcoded_constants_detect_failed",
                        details,
                    )
                    .with_dependent(dependent.as_str()),
                ),
            }
        }

        let graph = &mut state.graph;
        let sink = &mut state.symbolic_edges;
        match guarded(|| add_formula_edges(graph, sheet, address, &tokens, sink)) {
            Ok(node) => {
                state.formula_nodes.push(node);
                state.formula_text.insert(node, formula.to_string());
            }
            Err(details) => state.record(
                ScanIssue::new(IssueScope::GraphBuild, "build_dependency_graph_failed", details)
                    .with_dependent(dependent.as_str()),
            ),
        }
    }

    fn run_orphans(&self, state: &mut ScanState, workbook: &WorkbookInput) -> OrphanReport {
        let cfg = &self.config.orphans;
        let named_cells: FxHashSet<NodeKey> = if cfg.exclude_named_ranges {
            workbook
                .named_ranges
                .iter()
                .filter_map(|n| n.first_cell_key())
                .collect()
        } else {
            FxHashSet::default()
        };
        let bounds: FxHashMap<String, SheetBounds> = workbook
            .sheets
            .iter()
            .map(|s| (s.name.clone(), s.bounds()))
            .collect();

        let outcome = guarded(|| {
            detect_orphan_formulas(
                &state.graph,
                &state.formula_nodes,
                &state.formula_text,
                &named_cells,
                &bounds,
                cfg,
            )
        });
        match outcome {
            Ok(report) => report,
            Err(details) => {
                state.record(ScanIssue::new(IssueScope::Orphans, "orphan_detect_failed", details));
                OrphanReport::default()
            }
        }
    }

    fn assemble(
        &self,
        workbook: &WorkbookInput,
        state: ScanState,
        cycle_report: CycleReport,
        ranking: ImpactRanking,
        drift: DriftReport,
        orphans: OrphanReport,
        mut trial_info: TrialInfo,
    ) -> ScanResult {
        let risk = &self.config.risk;
        trial_info.formulas_scanned = state.formulas_scanned;

        let circular = circular_reference_findings(&cycle_report.cycles);
        let sheets = self.sheet_summaries(&state, &circular, &ranking, &orphans);

        let signals = Signals {
            circular: circular.cycle_count,
            volatile: state.volatile_hits,
            symbolic: state.symbolic_refs,
            hardcoded_constants: state.constant_hits,
            orphan_formulas: orphans.total,
            drift_formulas: drift.findings.len(),
            top_risks: ranking.entries.len(),
        };
        let workbook_assessment = risk.assess(
            RiskScope::Workbook,
            &SignalCounts {
                has_cycles: circular.cycle_count > 0,
                top_risk_cells: signals.top_risks,
                volatile: signals.volatile,
                symbolic: signals.symbolic,
                constants: signals.hardcoded_constants,
                orphans: signals.orphan_formulas,
            },
        );
        let reason = if workbook_assessment.reason.is_empty() {
            non_empty_or(signal_summary(&signals), ALL_CLEAR_REASON)
        } else {
            workbook_assessment.reason
        };

        tracing::info!(
            risk = %workbook_assessment.tier,
            formulas = state.formulas_scanned,
            cycles = signals.circular,
            issues = state.errors.len(),
            "scan complete"
        );

        ScanResult {
            workbook: workbook.name.clone(),
            trial: trial_info.enabled,
            trial_info,
            workbook_risk: workbook_assessment.tier,
            reason,
            signals,
            graph: GraphStats::of(&state.graph, state.symbolic_edges.len()),
            findings: vec![circular],
            hardcoded_constants: state.constant_findings,
            orphan_formulas: orphans.findings,
            formula_drift: drift.findings,
            sheets,
            top_risks: ranking.entries,
            cycles: cycle_report.cycles,
            symbolic_edges: state.symbolic_edges,
            truncation: Truncation {
                cycles: cycle_report.truncated,
                impact_reach: ranking.reach_capped,
                hardcoded_constants: state.constants_truncated,
                formula_drift: drift.truncated,
                orphan_formulas: orphans.truncated,
            },
            errors: state.errors,
        }
    }

    fn sheet_summaries(
        &self,
        state: &ScanState,
        circular: &CircularFindings,
        ranking: &ImpactRanking,
        orphans: &OrphanReport,
    ) -> Vec<SheetSummary> {
        let risk = &self.config.risk;
        let mut circular_by_sheet: BTreeMap<&str, FxHashSet<&str>> = BTreeMap::new();
        for item in &circular.items {
            for cell in &item.cells {
                if let Some((sheet, addr)) = split_node_key(cell) {
                    circular_by_sheet.entry(sheet).or_default().insert(addr);
                }
            }
        }
        let mut top_by_sheet: FxHashMap<&str, usize> = FxHashMap::default();
        for entry in &ranking.entries {
            if let Some((sheet, _)) = split_node_key(&entry.cell) {
                *top_by_sheet.entry(sheet).or_default() += 1;
            }
        }

        state
            .sheets
            .iter()
            .zip(&state.sheet_signals)
            .map(|(formulas, sig)| {
                let name = formulas.sheet.as_str();
                let circular_cells = circular_by_sheet.get(name).map_or(0, |s| s.len());
                let high_risk_cells = top_by_sheet.get(name).copied().unwrap_or(0);
                let assessment = risk.assess(
                    RiskScope::Sheet,
                    &SignalCounts {
                        has_cycles: circular_cells > 0,
                        top_risk_cells: high_risk_cells,
                        volatile: sig.volatile,
                        symbolic: sig.symbolic,
                        constants: sig.constants,
                        orphans: orphans.by_sheet.get(name).copied().unwrap_or(0),
                    },
                );
                SheetSummary {
                    sheet: name.to_string(),
                    risk: assessment.tier,
                    formulas: sig.formulas,
                    circular_cells,
                    high_risk_cells,
                    reason: non_empty_or(assessment.reason, ALL_CLEAR_REASON),
                }
            })
            .collect()
    }
}

fn non_empty_or(reason: String, fallback: &str) -> String {
    if reason.is_empty() {
        fallback.to_string()
    } else {
        reason
    }
}

/// Every non-zero workbook signal, for when the tier strategy gives no reason.
fn signal_summary(s: &Signals) -> String {
    let mut bits = Vec::new();
    if s.circular > 0 {
        bits.push(format!("{} circular reference cycle(s)", s.circular));
    }
    if s.top_risks > 0 {
        bits.push(format!("{} high-impact cells in Top-N list", s.top_risks));
    }
    if s.volatile > 0 {
        bits.push(format!("{} volatile function hit(s)", s.volatile));
    }
    if s.symbolic > 0 {
        bits.push(format!("{} symbolic reference(s)", s.symbolic));
    }
    if s.hardcoded_constants > 0 {
        bits.push(format!("{} embedded constant(s)", s.hardcoded_constants));
    }
    if s.orphan_formulas > 0 {
        bits.push(format!("{} orphan formula(s)", s.orphan_formulas));
    }
    bits.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_summary_lists_non_zero_counts() {
        let s = Signals {
            circular: 1,
            volatile: 2,
            drift_formulas: 9,
            ..Signals::default()
        };
        assert_eq!(
            signal_summary(&s),
            "1 circular reference cycle(s); 2 volatile function hit(s)"
        );
        assert_eq!(signal_summary(&Signals::default()), "");
    }
}
