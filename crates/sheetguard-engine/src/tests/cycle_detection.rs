use super::common::*;
use crate::cycles::CycleKind;
use crate::detectors::circular::CycleShape;
use crate::risk::{CYCLE_OVERRIDE_REASON, RiskTier};

#[test]
fn two_cell_loop_is_one_cycle_and_high_risk() {
    let wb = workbook(vec![sheet("S", &[("A1", f("=B1")), ("B1", f("=A1"))])]);
    let result = scan(&wb);

    assert_eq!(result.cycles.len(), 1);
    assert_eq!(result.cycles[0].kind, CycleKind::Cycle);
    let mut cells = result.cycles[0].cells.clone();
    cells.sort();
    assert_eq!(cells, vec!["S!A1", "S!B1"]);
    assert!(result.has_cycles());

    let summary = result.sheet("S").unwrap();
    assert_eq!(summary.risk, RiskTier::High);
    assert_eq!(summary.circular_cells, 2);
    assert_eq!(summary.reason, CYCLE_OVERRIDE_REASON);

    assert_eq!(result.workbook_risk, RiskTier::High);
    assert_eq!(result.signals.circular, 1);
    assert_eq!(result.findings[0].items[0].cycle_type, CycleShape::MultiCellCycle);
}

#[test]
fn self_reference_is_reported_as_self_loop() {
    let wb = workbook(vec![sheet("S", &[("A1", f("=A1+1"))])]);
    let result = scan(&wb);

    assert_eq!(result.cycles.len(), 1);
    assert_eq!(result.cycles[0].cells, vec!["S!A1"]);
    assert_eq!(result.findings[0].items[0].cycle_type, CycleShape::SelfReference);
    assert_eq!(result.sheet("S").unwrap().circular_cells, 1);
}

#[test]
fn cross_sheet_loop_marks_both_sheets() {
    let wb = workbook(vec![
        sheet("Inputs", &[("A1", f("=Calc!B2"))]),
        sheet("Calc", &[("B2", f("=Inputs!A1*2"))]),
    ]);
    let result = scan(&wb);

    assert_eq!(result.signals.circular, 1);
    assert_eq!(result.sheet("Inputs").unwrap().risk, RiskTier::High);
    assert_eq!(result.sheet("Calc").unwrap().risk, RiskTier::High);
}

#[test]
fn cycle_limit_caps_output_and_flags_truncation() {
    // four mutually referencing cells: 20 simple cycles
    let cells = [
        ("A1", f("=B1+C1+D1")),
        ("B1", f("=A1+C1+D1")),
        ("C1", f("=A1+B1+D1")),
        ("D1", f("=A1+B1+C1")),
    ];
    let wb = workbook(vec![sheet("S", &cells)]);
    let config = serde_json::json!({"app": {"graph": {"cycle_limit": 3}}});
    let result = scan_with(&wb, config, Default::default());

    assert_eq!(result.cycles.len(), 3);
    assert!(result.truncation.cycles);
}

#[test]
fn huge_cycle_limit_keeps_the_override() {
    let wb = workbook(vec![sheet("S", &[("A1", f("=B1")), ("B1", f("=A1"))])]);
    let config = serde_json::json!({"app": {"graph": {"cycle_limit": u64::MAX}}});
    let result = scan_with(&wb, config, Default::default());

    assert_eq!(result.cycles.len(), 1);
    assert!(!result.truncation.cycles);
    assert!(result.errors.is_empty());
    assert_eq!(result.workbook_risk, RiskTier::High);
}

#[test]
fn without_override_the_rules_still_rank_cycles_high() {
    let wb = workbook(vec![sheet("S", &[("A1", f("=B1")), ("B1", f("=A1"))])]);
    let config = serde_json::json!({
        "app": {"reporting": {"risk_scoring": {"overrides": {"cycle_always_high": false}}}}
    });
    let result = scan_with(&wb, config, Default::default());

    let summary = result.sheet("S").unwrap();
    assert_eq!(summary.risk, RiskTier::High);
    assert!(summary.reason.starts_with("circular dependency"));
}
