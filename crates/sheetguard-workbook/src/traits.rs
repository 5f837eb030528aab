use std::collections::BTreeMap;
use std::path::Path;

use sheetguard_engine::{CellValue, NamedRange};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellData {
    pub value: Option<CellValue>,
    pub formula: Option<String>,
}

impl CellData {
    pub fn from_value(value: impl Into<CellValue>) -> Self {
        Self {
            value: Some(value.into()),
            formula: None,
        }
    }

    pub fn from_formula(formula: impl Into<String>) -> Self {
        Self {
            value: None,
            formula: Some(formula.into()),
        }
    }

    /// What the scanner sees: formula text (with a leading `=`) wins over the cached value.
    pub fn into_scan_value(self) -> CellValue {
        match self.formula {
            Some(f) if !f.trim().is_empty() => {
                if f.starts_with('=') {
                    CellValue::Text(f)
                } else {
                    CellValue::Text(format!("={f}"))
                }
            }
            _ => self.value.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SheetData {
    /// Keyed by 1-based `(row, col)`, so iteration is row-major.
    pub cells: BTreeMap<(u32, u32), CellData>,
    /// `(rows, cols)` as reported by the backend, when it knows.
    pub dimensions: Option<(u32, u32)>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BackendCaps {
    pub formulas: bool,
    pub named_ranges: bool,
    pub bytes_input: bool,
}

/// Read-only access to a workbook, one sheet at a time.
pub trait SpreadsheetReader {
    type Error: std::error::Error + Send + Sync + 'static;

    fn backend_name(&self) -> &'static str;
    fn capabilities(&self) -> BackendCaps;

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error>
    where
        Self: Sized;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Result<Vec<String>, Self::Error>;

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error>;

    /// Defined names that resolve to a cell or range on a single sheet.
    fn named_ranges(&mut self) -> Result<Vec<NamedRange>, Self::Error> {
        Ok(Vec::new())
    }
}

/// Split a defined-name target such as `'Q1 Data'!$B$2:$B$9` into sheet and address.
pub fn split_defined_name(target: &str) -> Option<(String, String)> {
    let target = target.trim().trim_start_matches('=');
    let (sheet, address) = target.rsplit_once('!')?;
    let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None if sheet.contains([',', '!', '\'']) => return None,
        None => sheet.to_string(),
    };
    if sheet.is_empty() || address.is_empty() || address.contains(',') {
        return None;
    }
    Some((sheet, address.to_string()))
}
