use std::path::Path;

use sheetguard_common::{IssueScope, ScanIssue, column_to_letters};
use sheetguard_engine::{SheetInput, WorkbookInput};

use crate::IoError;
use crate::traits::SpreadsheetReader;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoaderStats {
    pub sheets_loaded: usize,
    pub sheets_failed: usize,
    pub cells_loaded: usize,
    pub formulas_loaded: usize,
}

/// Pulls every sheet out of a backend into the scanner's input model.
pub struct WorkbookLoader<B: SpreadsheetReader> {
    backend: B,
    stats: LoaderStats,
}

impl<B: SpreadsheetReader> WorkbookLoader<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            stats: LoaderStats::default(),
        }
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    /// Read all sheets. A sheet the backend cannot read is logged as a
    /// `sheet_scan` issue and skipped; failing to list sheets is an error.
    pub fn load(&mut self, name: &str) -> Result<WorkbookInput, IoError> {
        let _span = tracing::info_span!(
            "io_load_workbook",
            workbook = name,
            backend = self.backend.backend_name()
        )
        .entered();

        let mut workbook = WorkbookInput::new(name);
        let sheets = self
            .backend
            .sheet_names()
            .map_err(|e| IoError::from_backend(self.backend.backend_name(), e))?;

        for sheet in sheets {
            match self.load_sheet(&sheet) {
                Ok(input) => workbook.sheets.push(input),
                Err(err) => {
                    tracing::warn!(sheet = %sheet, error = %err, "sheet could not be read; skipping");
                    self.stats.sheets_failed += 1;
                    workbook.issues.push(
                        ScanIssue::new(IssueScope::SheetScan, "sheet_failed", err.to_string())
                            .with_dependent(sheet.as_str()),
                    );
                }
            }
        }

        match self.backend.named_ranges() {
            Ok(names) => workbook.named_ranges = names,
            Err(err) => tracing::warn!(error = %err, "defined names could not be read"),
        }

        tracing::debug!(
            sheets = self.stats.sheets_loaded,
            cells = self.stats.cells_loaded,
            formulas = self.stats.formulas_loaded,
            "workbook loaded"
        );
        Ok(workbook)
    }

    fn load_sheet(&mut self, sheet: &str) -> Result<SheetInput, B::Error> {
        let _span = tracing::debug_span!("io_load_sheet", sheet = sheet).entered();
        let data = self.backend.read_sheet(sheet)?;

        let mut input = SheetInput::new(sheet);
        for ((row, col), cell) in data.cells {
            let value = cell.into_scan_value();
            if value.formula().is_some() {
                self.stats.formulas_loaded += 1;
            }
            self.stats.cells_loaded += 1;
            let address = format!("{}{}", column_to_letters(col), row);
            input.push(&address, value);
        }
        if let Some((rows, cols)) = data.dimensions {
            input.max_row = input.max_row.max(rows);
            input.max_col = input.max_col.max(cols);
        }
        self.stats.sheets_loaded += 1;
        Ok(input)
    }
}

/// File stem used to name the workbook in reports.
pub fn workbook_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string())
}

/// Open `path` with the backend its extension calls for and load it.
pub fn load_workbook(path: &Path) -> Result<WorkbookInput, IoError> {
    if !path.is_file() {
        return Err(IoError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match ext.as_str() {
        #[cfg(feature = "json")]
        "json" => {
            let backend = crate::backends::JsonAdapter::open_path(path)?;
            WorkbookLoader::new(backend).load(&name)
        }
        #[cfg(feature = "calamine")]
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            let backend = crate::backends::CalamineAdapter::open_path(path)?;
            WorkbookLoader::new(backend).load(&name)
        }
        _ => Err(IoError::invalid_workbook(
            path,
            format!("unsupported workbook extension {ext:?}"),
        )),
    }
}
