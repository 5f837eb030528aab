//! Heuristic risk detectors that run on formula text and graph shape.

pub mod circular;
pub mod constants;
pub mod drift;
pub mod orphans;

use serde::Serialize;

/// A formula cell as the detectors see it: address plus raw formula text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaCell {
    pub address: String,
    pub formula: String,
}

impl FormulaCell {
    pub fn new(address: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            formula: formula.into(),
        }
    }
}

/// Formula cells of one sheet, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetFormulas {
    pub sheet: String,
    pub cells: Vec<FormulaCell>,
}

impl SheetFormulas {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            cells: Vec::new(),
        }
    }
}
