//! Excel Checker: structural, cell-by-cell comparison of spreadsheet workbooks.
//!
//! This crate provides:
//! - Loading workbooks (`.xlsx`, `.xlsm`, `.csv`) into a typed, sparse cell model
//! - Row and column alignment that tolerates insertions and deletions
//! - An ordered stream of [`ChangeRecord`]s describing the differences
//!
//! Rendering is left to the caller: every output type is `serde`-serializable.
//!
//! # Quick Start
//!
//! ```no_run
//! use excel_checker::{DiffConfig, diff_workbooks, load_workbook};
//!
//! let old = load_workbook("before.xlsx")?;
//! let new = load_workbook("after.xlsx")?;
//! let report = diff_workbooks(&old, &new, &DiffConfig::default())?;
//!
//! for record in &report.records {
//!     println!("{record:?}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Rows can be matched by key columns instead of by content:
//!
//! ```no_run
//! # use excel_checker::{DiffConfig, diff_workbooks, load_workbook};
//! # let old = load_workbook("before.xlsx")?;
//! # let new = load_workbook("after.xlsx")?;
//! let config = DiffConfig::builder().key_columns([0]).build()?;
//! let report = diff_workbooks(&old, &new, &config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod addressing;
mod alignment;
mod alignment_types;
mod cell_filter;
mod column_alignment;
mod config;
mod container;
mod database_alignment;
mod diff;
mod engine;
pub mod error_codes;
mod excel_open_xml;
mod grid_parser;
mod hashing;
mod output;
mod row_alignment;
mod sink;
mod source;
mod workbook;

pub use addressing::{
    AddressParseError, address_to_index, column_label, index_to_address, parse_column_label,
    parse_column_ref,
};
pub use alignment::{AlignError, align, align_columns, align_rows, align_rows_keyed};
pub use alignment_types::{AlignStep, AlignmentMap, Axis, AxisAlignment, InvalidAlignment};
pub use config::{ConfigError, DiffConfig, DiffConfigBuilder, LimitBehavior, TextComparison};
pub use container::{ContainerError, ContainerLimits, OpcContainer};
pub use database_alignment::suggest_key_columns;
pub use diff::{ChangeRecord, DiffError, DiffReport, DiffSummary, SheetFailure};
pub use engine::{
    GridDiff, GridDiffIter, diff_grids, diff_sheets, diff_sheets_by_name, diff_workbooks,
    diff_workbooks_streaming,
};
pub use grid_parser::GridParseError;
pub use hashing::normalize_text;
pub use output::json::{
    deserialize_diff_report, serialize_diff_report, serialize_diff_report_pretty,
};
pub use output::json_lines::JsonLinesSink;
pub use sink::{CallbackSink, DiffSink, VecSink};
pub use source::{
    CsvSource, LoadError, ReaderSource, WorkbookSource, load_workbook, load_workbook_with_limits,
};
pub use workbook::{Cell, CellValue, Grid, GridError, Sheet, Workbook};
