//! Workbook I/O around the SheetGuard scanner: backends that read workbooks
//! into the scanner's input model, config file loading, and the JSON/HTML
//! report artifacts.

pub mod backends;
pub mod config;
pub mod driver;
pub mod error;
pub mod loader;
pub mod report;
pub mod traits;

#[cfg(feature = "calamine")]
pub use backends::CalamineAdapter;
#[cfg(feature = "json")]
pub use backends::JsonAdapter;
pub use config::{load_config, read_config};
pub use driver::{ScanArtifacts, scan_workbook};
pub use error::IoError;
pub use loader::{LoaderStats, WorkbookLoader, load_workbook, workbook_stem};
pub use report::{Report, artifact_dir, escape_html, render_html, write_artifacts};
pub use traits::{BackendCaps, CellData, SheetData, SpreadsheetReader, split_defined_name};
