use crate::alignment_types::{AlignStep, AlignmentMap};
use crate::config::TextComparison;
use crate::diff::ChangeRecord;
use crate::workbook::Grid;

/// The changes between two aligned grids, produced on demand.
///
/// Each call to [`iter`](GridDiff::iter) starts a fresh walk and yields the
/// same records in the same order: column structure first, then the merged
/// row script, where every matched row compares its matched columns in
/// column-script order.
#[derive(Debug, Clone)]
pub struct GridDiff<'a> {
    sheet: String,
    grid_a: &'a Grid,
    grid_b: &'a Grid,
    col_steps: Vec<AlignStep>,
    row_steps: Vec<AlignStep>,
    matched_cols: Vec<(u32, u32)>,
    matched_rows: Vec<(u32, u32)>,
    text_comparison: TextComparison,
}

/// Prepare the diff of `grid_a` against `grid_b` under `alignment`. No
/// records are produced until the result is iterated.
pub fn diff_grids<'a>(
    sheet: impl Into<String>,
    grid_a: &'a Grid,
    grid_b: &'a Grid,
    alignment: &AlignmentMap,
) -> GridDiff<'a> {
    GridDiff {
        sheet: sheet.into(),
        grid_a,
        grid_b,
        col_steps: alignment.cols.steps(),
        row_steps: alignment.rows.steps(),
        matched_cols: alignment.cols.matched().collect(),
        matched_rows: alignment.rows.matched().collect(),
        text_comparison: TextComparison::Exact,
    }
}

impl<'a> GridDiff<'a> {
    /// Compare text under `mode` instead of exactly.
    pub fn with_text_comparison(mut self, mode: TextComparison) -> Self {
        self.text_comparison = mode;
        self
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn iter(&self) -> GridDiffIter<'_, 'a> {
        GridDiffIter {
            diff: self,
            col_pos: 0,
            row_pos: 0,
            cell_pos: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_records(&self) -> Vec<ChangeRecord> {
        self.iter().collect()
    }

    fn column_deleted(&self, col: u32) -> ChangeRecord {
        ChangeRecord::ColumnDeleted {
            sheet: self.sheet.clone(),
            col,
            cells: self
                .grid_a
                .col_values(col, self.matched_rows.iter().map(|&(a, _)| a)),
        }
    }

    fn column_inserted(&self, col: u32) -> ChangeRecord {
        ChangeRecord::ColumnInserted {
            sheet: self.sheet.clone(),
            col,
            cells: self
                .grid_b
                .col_values(col, self.matched_rows.iter().map(|&(_, b)| b)),
        }
    }

    fn value_change(&self, row_a: u32, row_b: u32, col_a: u32, col_b: u32) -> Option<ChangeRecord> {
        let from = self.grid_a.value(row_a, col_a);
        let to = self.grid_b.value(row_b, col_b);
        if from.equivalent(to, self.text_comparison) {
            return None;
        }
        Some(ChangeRecord::ValueChanged {
            sheet: self.sheet.clone(),
            row: row_b,
            col: col_b,
            source_row: row_a,
            source_col: col_a,
            from: from.clone(),
            to: to.clone(),
        })
    }
}

impl<'d, 'a> IntoIterator for &'d GridDiff<'a> {
    type Item = ChangeRecord;
    type IntoIter = GridDiffIter<'d, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One walk over a [`GridDiff`].
#[derive(Debug, Clone)]
pub struct GridDiffIter<'d, 'a> {
    diff: &'d GridDiff<'a>,
    col_pos: usize,
    row_pos: usize,
    /// Next matched column to compare within the current matched row.
    cell_pos: usize,
}

impl Iterator for GridDiffIter<'_, '_> {
    type Item = ChangeRecord;

    fn next(&mut self) -> Option<ChangeRecord> {
        let diff = self.diff;

        while let Some(step) = diff.col_steps.get(self.col_pos) {
            self.col_pos += 1;
            match *step {
                AlignStep::Deleted { source } => return Some(diff.column_deleted(source)),
                AlignStep::Inserted { target } => return Some(diff.column_inserted(target)),
                AlignStep::Matched { .. } => {}
            }
        }

        while let Some(step) = diff.row_steps.get(self.row_pos) {
            match *step {
                AlignStep::Deleted { source } => {
                    self.row_pos += 1;
                    return Some(ChangeRecord::RowDeleted {
                        sheet: diff.sheet.clone(),
                        row: source,
                        cells: diff.grid_a.row_values(source),
                    });
                }
                AlignStep::Inserted { target } => {
                    self.row_pos += 1;
                    return Some(ChangeRecord::RowInserted {
                        sheet: diff.sheet.clone(),
                        row: target,
                        cells: diff.grid_b.row_values(target),
                    });
                }
                AlignStep::Matched { source, target } => {
                    while let Some(&(col_a, col_b)) = diff.matched_cols.get(self.cell_pos) {
                        self.cell_pos += 1;
                        if let Some(record) = diff.value_change(source, target, col_a, col_b) {
                            return Some(record);
                        }
                    }
                    self.cell_pos = 0;
                    self.row_pos += 1;
                }
            }
        }

        None
    }
}
