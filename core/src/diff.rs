//! Change records and the report that collects them.
//!
//! Records are serializable so reporters can render them without the core
//! deciding on an output format.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::error_codes;
use crate::workbook::CellValue;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiffError {
    #[error("[EXCHK_CONF_001] invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("[EXCHK_DIFF_001] sink error: {message}")]
    SinkError { message: String },

    #[error("[EXCHK_DIFF_002] sheet '{requested}' not found. Available sheets: {}", available.join(", "))]
    SheetNotFound {
        requested: String,
        available: Vec<String>,
    },
}

impl DiffError {
    pub fn code(&self) -> &'static str {
        match self {
            DiffError::InvalidConfiguration(err) => err.code(),
            DiffError::SinkError { .. } => error_codes::DIFF_SINK_ERROR,
            DiffError::SheetNotFound { .. } => error_codes::DIFF_SHEET_NOT_FOUND,
        }
    }
}

/// A single change between the source and target workbooks.
///
/// Row and column indices are zero-based. Insertions carry target indices,
/// deletions carry source indices, and `ValueChanged` carries both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[non_exhaustive]
pub enum ChangeRecord {
    SheetAdded {
        sheet: String,
    },
    SheetRemoved {
        sheet: String,
    },
    RowInserted {
        sheet: String,
        row: u32,
        /// `(target col, value)` for each non-empty cell of the row.
        cells: Vec<(u32, CellValue)>,
    },
    RowDeleted {
        sheet: String,
        row: u32,
        /// `(source col, value)` for each non-empty cell of the row.
        cells: Vec<(u32, CellValue)>,
    },
    ColumnInserted {
        sheet: String,
        col: u32,
        /// `(target row, value)` for non-empty cells in matched rows.
        cells: Vec<(u32, CellValue)>,
    },
    ColumnDeleted {
        sheet: String,
        col: u32,
        /// `(source row, value)` for non-empty cells in matched rows.
        cells: Vec<(u32, CellValue)>,
    },
    ValueChanged {
        sheet: String,
        row: u32,
        col: u32,
        source_row: u32,
        source_col: u32,
        from: CellValue,
        to: CellValue,
    },
}

impl ChangeRecord {
    pub fn sheet(&self) -> &str {
        match self {
            ChangeRecord::SheetAdded { sheet }
            | ChangeRecord::SheetRemoved { sheet }
            | ChangeRecord::RowInserted { sheet, .. }
            | ChangeRecord::RowDeleted { sheet, .. }
            | ChangeRecord::ColumnInserted { sheet, .. }
            | ChangeRecord::ColumnDeleted { sheet, .. }
            | ChangeRecord::ValueChanged { sheet, .. } => sheet,
        }
    }

    /// The serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeRecord::SheetAdded { .. } => "SheetAdded",
            ChangeRecord::SheetRemoved { .. } => "SheetRemoved",
            ChangeRecord::RowInserted { .. } => "RowInserted",
            ChangeRecord::RowDeleted { .. } => "RowDeleted",
            ChangeRecord::ColumnInserted { .. } => "ColumnInserted",
            ChangeRecord::ColumnDeleted { .. } => "ColumnDeleted",
            ChangeRecord::ValueChanged { .. } => "ValueChanged",
        }
    }

    pub fn is_sheet_change(&self) -> bool {
        matches!(
            self,
            ChangeRecord::SheetAdded { .. } | ChangeRecord::SheetRemoved { .. }
        )
    }
}

/// A sheet pair that could not be compared. The rest of the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetFailure {
    pub sheet: String,
    pub code: String,
    pub message: String,
}

/// Totals for a streamed diff run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub record_count: usize,
    pub sheets_compared: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SheetFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DiffSummary {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() || !self.warnings.is_empty()
    }
}

/// The complete result of comparing two workbooks.
///
/// A report with failures or warnings is partial: some sheet pairs were
/// skipped or compared with a degraded alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Schema version (currently "1").
    pub version: String,
    pub records: Vec<ChangeRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SheetFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Default for DiffReport {
    fn default() -> Self {
        DiffReport::new(Vec::new())
    }
}

impl DiffReport {
    pub const SCHEMA_VERSION: &'static str = "1";

    pub fn new(records: Vec<ChangeRecord>) -> DiffReport {
        DiffReport {
            version: Self::SCHEMA_VERSION.to_string(),
            records,
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_records_and_summary(records: Vec<ChangeRecord>, summary: DiffSummary) -> DiffReport {
        DiffReport {
            version: Self::SCHEMA_VERSION.to_string(),
            records,
            failures: summary.failures,
            warnings: summary.warnings,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() || !self.warnings.is_empty()
    }

    pub fn has_differences(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn records_for_sheet<'a>(&'a self, sheet: &'a str) -> impl Iterator<Item = &'a ChangeRecord> + 'a {
        self.records.iter().filter(move |record| record.sheet() == sheet)
    }
}
