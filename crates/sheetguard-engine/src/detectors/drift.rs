//! Copy/paste drift: a formula whose shape breaks its row's dominant pattern.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use sheetguard_parse::normalize_formula;

use super::SheetFormulas;
use crate::config::ConfigTree;

pub const DRIFT_NOTE: &str =
    "Formula shape differs from dominant pattern in the same row (possible copy/paste drift).";

static RE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,3}(\d+)$").expect("static row pattern"));

#[derive(Debug, Clone, PartialEq)]
pub struct DriftConfig {
    pub enabled: bool,
    pub min_row_formula_count: usize,
    pub dominant_ratio: f64,
    pub max_findings: usize,
}

impl DriftConfig {
    /// Build from the `app.detectors.formula_drift` subtree.
    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            enabled: tree.bool_or("enabled", true),
            min_row_formula_count: tree.usize_or("min_row_formula_count", 6),
            dominant_ratio: tree.f64_or("dominant_ratio", 0.60),
            max_findings: tree.usize_or("max_findings", 50),
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self::from_tree(&ConfigTree::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftFinding {
    pub sheet: String,
    pub cell: String,
    pub formula: String,
    pub dominant_shape: String,
    pub cell_shape: String,
    pub row: u32,
    pub drift_scope: &'static str,
    pub note: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    pub findings: Vec<DriftFinding>,
    /// More drift existed than `max_findings` allowed through.
    pub truncated: bool,
}

struct Shaped<'a> {
    address: &'a str,
    formula: &'a str,
    shape: String,
}

/// Most frequent shape; ties go to the shape seen first.
fn dominant<'s>(items: &'s [Shaped<'_>]) -> Option<(&'s str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(s, _)| *s == item.shape) {
            Some((_, n)) => *n += 1,
            None => counts.push((&item.shape, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, (shape, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((shape, n)),
        })
}

/// Group each sheet's formulas by row and report cells that deviate from a
/// clearly dominant shape. Rows are visited in first-seen order.
pub fn detect_formula_drift(sheets: &[SheetFormulas], cfg: &DriftConfig) -> DriftReport {
    let mut report = DriftReport::default();
    if !cfg.enabled {
        return report;
    }

    for sheet in sheets {
        let mut order: Vec<u32> = Vec::new();
        let mut rows: FxHashMap<u32, Vec<Shaped<'_>>> = FxHashMap::default();

        for cell in &sheet.cells {
            let Some(row) = RE_ROW
                .captures(&cell.address)
                .and_then(|c| c[1].parse::<u32>().ok())
            else {
                continue;
            };
            let Some(shape) = normalize_formula(&cell.formula).filter(|s| !s.is_empty()) else {
                continue;
            };
            rows.entry(row)
                .or_insert_with(|| {
                    order.push(row);
                    Vec::new()
                })
                .push(Shaped {
                    address: &cell.address,
                    formula: &cell.formula,
                    shape,
                });
        }

        for row in order {
            let Some(items) = rows.get(&row) else {
                continue;
            };
            if items.len() < cfg.min_row_formula_count {
                continue;
            }
            let Some((dominant_shape, count)) = dominant(items) else {
                continue;
            };
            if (count as f64) / (items.len() as f64) < cfg.dominant_ratio {
                continue;
            }

            for item in items.iter().filter(|i| i.shape != dominant_shape) {
                if report.findings.len() >= cfg.max_findings {
                    report.truncated = true;
                    return report;
                }
                report.findings.push(DriftFinding {
                    sheet: sheet.sheet.clone(),
                    cell: item.address.to_string(),
                    formula: item.formula.to_string(),
                    dominant_shape: dominant_shape.to_string(),
                    cell_shape: item.shape.clone(),
                    row,
                    drift_scope: "row",
                    note: DRIFT_NOTE,
                });
            }
        }
    }
    report
}
