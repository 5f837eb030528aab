use std::path::{Path, PathBuf};

use chrono::Utc;
use sheetguard_engine::{ScanConfig, ScanOptions, Scanner};

use crate::IoError;
use crate::loader::{load_workbook, workbook_stem};
use crate::report::{Report, artifact_dir, write_artifacts};

/// Everything a caller gets back from one scan of a workbook file.
#[derive(Debug, Clone)]
pub struct ScanArtifacts {
    pub report: Report,
    pub json_path: PathBuf,
    pub html_path: PathBuf,
}

/// Load `workbook`, scan it, and write both report artifacts under `out_dir`.
///
/// Only a missing file or an unreadable container fails the call. Problems
/// inside the workbook end up in the report's `errors` list instead.
pub fn scan_workbook(
    workbook: &Path,
    out_dir: &Path,
    options: &ScanOptions,
    config: &ScanConfig,
) -> Result<ScanArtifacts, IoError> {
    let input = load_workbook(workbook)?;
    let result = Scanner::new(config).run(&input, options);

    let now = Utc::now();
    let stem = workbook_stem(workbook);
    let report = Report::new(result, now);
    let dir = artifact_dir(out_dir, &stem, now);
    let (json_path, html_path) = write_artifacts(&report, &dir, &stem)?;

    Ok(ScanArtifacts {
        report,
        json_path,
        html_path,
    })
}
