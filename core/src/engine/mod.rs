//! Core diffing engine for workbook comparison.
//!
//! - `workbook_diff`: sheet pairing, per-pair alignment with fallbacks, and
//!   ordered emission into a [`DiffSink`](crate::sink::DiffSink)
//! - `grid_diff`: the lazy walk over one aligned sheet pair

mod grid_diff;
mod workbook_diff;

pub use grid_diff::{GridDiff, GridDiffIter, diff_grids};
pub use workbook_diff::{diff_sheets, diff_sheets_by_name, diff_workbooks, diff_workbooks_streaming};
