//! Report artifacts written after a scan: one JSON document and one HTML page.

mod html;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sheetguard_engine::ScanResult;

use crate::IoError;

pub use html::{escape_html, render_html};

pub const JSON_SUFFIX: &str = "sheetguard.json";
pub const HTML_SUFFIX: &str = "sheetguard.report.html";

/// A scan result stamped with the time it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`.
    pub generated: String,
    #[serde(flatten)]
    pub scan: ScanResult,
}

impl Report {
    pub fn new(scan: ScanResult, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated: generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            scan,
        }
    }

    pub fn to_json_string(&self) -> Result<String, IoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `<base>/output/<stem>/<YYYYMMDD_HHMMSS>`.
pub fn artifact_dir(base: &Path, stem: &str, at: DateTime<Utc>) -> PathBuf {
    base.join("output")
        .join(stem)
        .join(at.format("%Y%m%d_%H%M%S").to_string())
}

/// Write both artifacts into `dir` (created if needed) and return their paths.
pub fn write_artifacts(report: &Report, dir: &Path, stem: &str) -> Result<(PathBuf, PathBuf), IoError> {
    fs::create_dir_all(dir)?;

    let json_path = dir.join(format!("{stem}.{JSON_SUFFIX}"));
    fs::write(&json_path, report.to_json_string()?)?;

    let html_path = dir.join(format!("{stem}.{HTML_SUFFIX}"));
    fs::write(&html_path, render_html(report))?;

    tracing::info!(json = %json_path.display(), html = %html_path.display(), "report written");
    Ok((json_path, html_path))
}
