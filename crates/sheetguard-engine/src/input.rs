//! In-memory workbook handed to the scanner by a reader.

use sheetguard_common::{NodeKey, ScanIssue, node_key, strip_anchors};

use crate::detectors::orphans::SheetBounds;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    /// Formula text, when the value is a string starting with `=`.
    pub fn formula(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if s.starts_with('=') => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellInput {
    /// Unanchored A1 address (`B7`).
    pub address: String,
    pub value: CellValue,
}

impl CellInput {
    pub fn new(address: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            address: address.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetInput {
    pub name: String,
    /// Populated cells in reader order.
    pub cells: Vec<CellInput>,
    pub max_row: u32,
    pub max_col: u32,
}

impl SheetInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a cell, growing the sheet bounds to cover it.
    pub fn push(&mut self, address: &str, value: impl Into<CellValue>) {
        if let Ok(coord) = sheetguard_common::CellCoord::parse(address) {
            self.max_row = self.max_row.max(coord.row);
            self.max_col = self.max_col.max(coord.col);
        }
        self.cells.push(CellInput::new(address, value));
    }

    pub fn bounds(&self) -> SheetBounds {
        SheetBounds {
            max_row: self.max_row,
            max_col: self.max_col,
        }
    }
}

/// A defined name pointing at a cell or range on one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRange {
    pub name: String,
    pub sheet: String,
    /// Address or range as stored (`$B$2`, `$B$2:$B$9`).
    pub destination: String,
}

impl NamedRange {
    /// Node key of the first cell of the destination, anchors removed.
    pub fn first_cell_key(&self) -> Option<NodeKey> {
        let first = self.destination.split(':').next()?.trim();
        let addr = strip_anchors(first);
        if addr.is_empty() || self.sheet.is_empty() {
            return None;
        }
        Some(node_key(&self.sheet, &addr))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookInput {
    pub name: String,
    pub sheets: Vec<SheetInput>,
    pub named_ranges: Vec<NamedRange>,
    /// Problems the reader hit before the scan started (unreadable sheets).
    pub issues: Vec<ScanIssue>,
}

impl WorkbookInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
