//! Structured records for partial failures collected during a scan.
//!
//! A scan never aborts because one cell or one analysis pass misbehaves; the
//! failure is written down as a [`ScanIssue`] and the affected output is treated
//! as empty.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where in the pipeline an issue was raised.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueScope {
    /// Tokenizer, volatile detector or constant detector failed on one cell.
    ParseFormula,
    /// Edge insertion failed for one cell.
    GraphBuild,
    /// A whole sheet could not be read or iterated.
    SheetScan,
    Cycles,
    Impact,
    /// A whole-workbook detector pass (drift) failed.
    Detector,
    Orphans,
}

impl IssueScope {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueScope::ParseFormula => "parse_formula",
            IssueScope::GraphBuild => "graph_build",
            IssueScope::SheetScan => "sheet_scan",
            IssueScope::Cycles => "cycles",
            IssueScope::Impact => "impact",
            IssueScope::Detector => "detector",
            IssueScope::Orphans => "orphans",
        }
    }
}

impl fmt::Display for IssueScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the scan error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIssue {
    pub scope: IssueScope,
    #[serde(rename = "type")]
    pub kind: String,
    /// Node key or sheet title the issue is attached to; empty for whole-graph passes.
    pub dependent: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub details: String,
}

impl ScanIssue {
    pub fn new(scope: IssueScope, kind: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            scope,
            kind: kind.into(),
            dependent: String::new(),
            reference: String::new(),
            details: details.into(),
        }
    }

    pub fn with_dependent(mut self, dependent: impl Into<String>) -> Self {
        self.dependent = dependent.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

impl fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scope, self.kind)?;
        if !self.dependent.is_empty() {
            write!(f, " at {}", self.dependent)?;
        }
        if !self.details.is_empty() {
            write!(f, ": {}", self.details)?;
        }
        Ok(())
    }
}
