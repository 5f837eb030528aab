use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sheetguard_engine::{CellValue, NamedRange};

use crate::IoError;
use crate::traits::{BackendCaps, CellData, SheetData, SpreadsheetReader};

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonWorkbook {
    #[serde(default = "default_version")]
    version: u32,
    /// Workbook order; sheets missing from it follow in name order.
    #[serde(default)]
    sheet_order: Vec<String>,
    #[serde(default)]
    defined_names: Vec<JsonDefinedName>,
    #[serde(default)]
    sheets: BTreeMap<String, JsonSheet>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
struct JsonSheet {
    #[serde(default)]
    cells: Vec<JsonCell>,
    #[serde(default)]
    dimensions: Option<(u32, u32)>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonCell {
    row: u32,
    col: u32,
    #[serde(default)]
    value: Option<JsonValue>,
    #[serde(default)]
    formula: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "value")]
enum JsonValue {
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Empty,
    Error(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonDefinedName {
    name: String,
    sheet: String,
    address: String,
}

fn json_to_value(v: &JsonValue) -> CellValue {
    match v {
        JsonValue::Int(i) => CellValue::Number(*i as f64),
        JsonValue::Number(n) => CellValue::Number(*n),
        JsonValue::Text(s) => CellValue::Text(s.clone()),
        JsonValue::Boolean(b) => CellValue::Boolean(*b),
        JsonValue::Empty => CellValue::Empty,
        JsonValue::Error(e) => CellValue::Text(e.clone()),
    }
}

fn value_to_json(v: &CellValue) -> JsonValue {
    match v {
        CellValue::Empty => JsonValue::Empty,
        CellValue::Number(n) => JsonValue::Number(*n),
        CellValue::Boolean(b) => JsonValue::Boolean(*b),
        CellValue::Text(s) => JsonValue::Text(s.clone()),
    }
}

/// Workbook stored as a single JSON document. Useful for fixtures and for
/// exporting from tools that cannot write xlsx.
#[derive(Debug, Default)]
pub struct JsonAdapter {
    data: JsonWorkbook,
}

impl JsonAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_workbook(data: JsonWorkbook) -> Self {
        Self { data }
    }

    pub fn add_sheet(&mut self, name: &str) {
        if !self.data.sheets.contains_key(name) {
            self.data.sheet_order.push(name.to_string());
            self.data.sheets.insert(name.to_string(), JsonSheet::default());
        }
    }

    pub fn write_cell(&mut self, sheet: &str, row: u32, col: u32, data: CellData) {
        self.add_sheet(sheet);
        let Some(entry) = self.data.sheets.get_mut(sheet) else {
            return;
        };
        let cell = JsonCell {
            row,
            col,
            value: data.value.as_ref().map(value_to_json),
            formula: data.formula,
        };
        match entry.cells.iter_mut().find(|c| c.row == row && c.col == col) {
            Some(existing) => *existing = cell,
            None => entry.cells.push(cell),
        }
    }

    pub fn define_name(&mut self, name: &str, sheet: &str, address: &str) {
        self.data.defined_names.push(JsonDefinedName {
            name: name.to_string(),
            sheet: sheet.to_string(),
            address: address.to_string(),
        });
    }

    pub fn to_json_string(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    fn to_sheet_data(js: &JsonSheet) -> SheetData {
        let cells = js
            .cells
            .iter()
            .map(|c| {
                (
                    (c.row, c.col),
                    CellData {
                        value: c.value.as_ref().map(json_to_value),
                        formula: c.formula.clone(),
                    },
                )
            })
            .collect();
        SheetData {
            cells,
            dimensions: js.dimensions,
        }
    }
}

impl SpreadsheetReader for JsonAdapter {
    type Error = IoError;

    fn backend_name(&self) -> &'static str {
        "json"
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
        let file = File::open(path)?;
        let data: JsonWorkbook = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| IoError::invalid_workbook(path, e.to_string()))?;
        Ok(Self::from_workbook(data))
    }

    fn open_bytes(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let data: JsonWorkbook = serde_json::from_slice(&bytes)?;
        Ok(Self::from_workbook(data))
    }

    fn sheet_names(&self) -> Result<Vec<String>, Self::Error> {
        let mut names: Vec<String> = self
            .data
            .sheet_order
            .iter()
            .filter(|n| self.data.sheets.contains_key(*n))
            .cloned()
            .collect();
        for name in self.data.sheets.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Ok(names)
    }

    fn read_sheet(&mut self, sheet: &str) -> Result<SheetData, Self::Error> {
        self.data
            .sheets
            .get(sheet)
            .map(Self::to_sheet_data)
            .ok_or_else(|| IoError::Backend {
                backend: "json".to_string(),
                message: format!("no sheet named {sheet}"),
            })
    }

    fn named_ranges(&mut self) -> Result<Vec<NamedRange>, Self::Error> {
        Ok(self
            .data
            .defined_names
            .iter()
            .map(|dn| NamedRange {
                name: dn.name.clone(),
                sheet: dn.sheet.clone(),
                destination: dn.address.clone(),
            })
            .collect())
    }
}
