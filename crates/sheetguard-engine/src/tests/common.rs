use serde_json::Value;

use crate::config::{ConfigTree, ScanConfig};
use crate::input::{CellValue, SheetInput, WorkbookInput};
use crate::result::ScanResult;
use crate::scan::{ScanOptions, Scanner};

/// Build a sheet from `(address, value)` pairs; strings starting with `=` are formulas.
pub fn sheet(name: &str, cells: &[(&str, CellValue)]) -> SheetInput {
    let mut s = SheetInput::new(name);
    for (addr, value) in cells {
        s.push(addr, value.clone());
    }
    s
}

pub fn f(formula: &str) -> CellValue {
    CellValue::from(formula)
}

pub fn n(value: f64) -> CellValue {
    CellValue::from(value)
}

pub fn workbook(sheets: Vec<SheetInput>) -> WorkbookInput {
    let mut wb = WorkbookInput::new("model.xlsx");
    wb.sheets = sheets;
    wb
}

pub fn scan(wb: &WorkbookInput) -> ScanResult {
    scan_with(wb, Value::Null, ScanOptions::default())
}

pub fn scan_with(wb: &WorkbookInput, config: Value, options: ScanOptions) -> ScanResult {
    let cfg = ScanConfig::from_tree(&ConfigTree::new(config));
    Scanner::new(&cfg).run(wb, &options)
}
