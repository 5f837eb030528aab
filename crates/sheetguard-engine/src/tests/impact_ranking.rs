use super::common::*;
use crate::scan::ScanOptions;

fn chain() -> crate::input::WorkbookInput {
    workbook(vec![sheet(
        "S",
        &[
            ("A1", f("=SUM(1,2)")),
            ("B1", f("=A1")),
            ("C1", f("=B1")),
            ("D1", f("=C1")),
        ],
    )])
}

#[test]
fn chain_head_has_the_widest_reach() {
    let result = scan(&chain());

    let top = &result.top_risks[0];
    assert_eq!(top.cell, "S!A1");
    assert_eq!(top.downstream_reach, 3);
    assert_eq!(top.direct_fan_out, 1);

    let reach: Vec<usize> = result.top_risks.iter().map(|e| e.downstream_reach).collect();
    assert_eq!(reach, vec![3, 2, 1, 0]);
}

#[test]
fn ranking_is_stable_across_runs() {
    let wb = chain();
    let first = scan(&wb);
    let second = scan(&wb);
    assert_eq!(first.top_risks, second.top_risks);
}

#[test]
fn top_n_limits_entries_and_sheet_counts() {
    let options = ScanOptions {
        top_n: 2,
        ..ScanOptions::default()
    };
    let result = scan_with(&chain(), serde_json::Value::Null, options);

    assert_eq!(result.top_risks.len(), 2);
    assert_eq!(result.signals.top_risks, 2);
    assert_eq!(result.sheet("S").unwrap().high_risk_cells, 2);
}

#[test]
fn equal_scores_order_by_cell_key() {
    let wb = workbook(vec![sheet(
        "S",
        &[("C1", f("=SUM(1,2)")), ("A1", f("=SUM(3,4)")), ("B1", f("=SUM(5,6)"))],
    )]);
    let result = scan(&wb);
    let cells: Vec<&str> = result.top_risks.iter().map(|e| e.cell.as_str()).collect();
    assert_eq!(cells, vec!["S!A1", "S!B1", "S!C1"]);
}

#[test]
fn reach_cap_is_reported() {
    let config = serde_json::json!({"app": {"graph": {"max_reach_nodes": 1}}});
    let result = scan_with(&chain(), config, ScanOptions::default());

    assert_eq!(result.top_risks[0].downstream_reach, 1);
    assert!(result.truncation.impact_reach);
}
