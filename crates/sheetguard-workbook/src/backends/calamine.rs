#![cfg(feature = "calamine")]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto_from_rs};
use sheetguard_engine::{CellValue, NamedRange};

use crate::IoError;
use crate::traits::{BackendCaps, CellData, SheetData, SpreadsheetReader, split_defined_name};

/// xlsx / xlsm / xlsb / xls / ods through calamine.
pub struct CalamineAdapter {
    workbook: Sheets<Cursor<Vec<u8>>>,
}

impl CalamineAdapter {
    fn convert_value(data: &Data) -> Option<CellValue> {
        match data {
            Data::Empty => None,
            Data::String(s) if s.is_empty() => None,
            Data::String(s) => Some(CellValue::Text(s.clone())),
            Data::Float(f) => Some(CellValue::Number(*f)),
            Data::Int(i) => Some(CellValue::Number(*i as f64)),
            Data::Bool(b) => Some(CellValue::Boolean(*b)),
            // serial number, same as the cell stores it
            Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
            other => Some(CellValue::Text(other.to_string())),
        }
    }

    fn range_to_cells(
        range: &Range<Data>,
        formulas: Option<&Range<String>>,
    ) -> BTreeMap<(u32, u32), CellData> {
        let mut cells = BTreeMap::new();

        let (start_row, start_col) = range.start().unwrap_or_default();
        for (row, col, val) in range.used_cells() {
            if let Some(value) = Self::convert_value(val) {
                let key = (start_row + row as u32 + 1, start_col + col as u32 + 1);
                cells.insert(
                    key,
                    CellData {
                        value: Some(value),
                        formula: None,
                    },
                );
            }
        }

        if let Some(frm) = formulas {
            let (start_row, start_col) = frm.start().unwrap_or_default();
            for (row, col, formula) in frm.used_cells() {
                if formula.is_empty() {
                    continue;
                }
                let key = (start_row + row as u32 + 1, start_col + col as u32 + 1);
                let text = if formula.starts_with('=') {
                    formula.clone()
                } else {
                    format!("={formula}")
                };
                cells.entry(key).or_insert_with(CellData::default).formula = Some(text);
            }
        }
        cells
    }
}

impl SpreadsheetReader for CalamineAdapter {
    type Error = IoError;

    fn backend_name(&self) -> &'static str {
        "calamine"
    }

    fn capabilities(&self) -> BackendCaps {
        BackendCaps {
            formulas: true,
            named_ranges: true,
            bytes_input: true,
        }
    }

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| IoError::invalid_workbook(path, e.to_string()))?;
        Ok(Self { workbook })
    }

    fn open_bytes(data: Vec<u8>) -> Result<Self, Self::Error> {
        let workbook = open_workbook_auto_from_rs(Cursor::new(data))
            .map_err(|e| IoError::invalid_workbook(Path::new("<memory>"), e.to_string()))?;
        Ok(Self { workbook })
    }

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.workbook.sheet_names())
    }

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error> {
        let _span = tracing::debug_span!("calamine_read_sheet", sheet = sheet).entered();
        let range = self
            .workbook
            .worksheet_range(sheet)
            .map_err(|e| IoError::from_backend("calamine", e))?;
        // formulas are optional: some formats do not carry them
        let formulas = self.workbook.worksheet_formula(sheet).ok();

        let dimensions = range.end().map(|(r, c)| (r + 1, c + 1));
        Ok(SheetData {
            cells: Self::range_to_cells(&range, formulas.as_ref()),
            dimensions,
        })
    }

    fn named_ranges(&mut self) -> Result<Vec<NamedRange>, Self::Error> {
        Ok(self
            .workbook
            .defined_names()
            .iter()
            .filter_map(|(name, target)| {
                let (sheet, destination) = split_defined_name(target)?;
                Some(NamedRange {
                    name: name.clone(),
                    sheet,
                    destination,
                })
            })
            .collect())
    }
}
