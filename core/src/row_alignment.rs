//! Row alignment by content similarity over matched columns.

use crate::alignment::lcs::oriented_lcs_pairs;
use crate::alignment_types::AxisAlignment;
use crate::config::{DiffConfig, TextComparison};
use crate::hashing::row_signature;
use crate::workbook::{CellValue, Grid};

/// One row restricted to the matched columns, in column-script order.
struct ProjectedRow<'a> {
    signature: u128,
    values: Vec<&'a CellValue>,
}

fn project<'a>(grid: &'a Grid, cols: &[u32], mode: TextComparison) -> Vec<ProjectedRow<'a>> {
    (0..grid.nrows)
        .map(|row| ProjectedRow {
            signature: row_signature(grid, row, cols, mode),
            values: cols.iter().map(|&col| grid.value(row, col)).collect(),
        })
        .collect()
}

/// Fraction of considered column pairs whose values are equal, where a pair
/// is considered if either side is non-empty. Rows blank across every
/// matched column score 1.
pub(crate) fn row_similarity(a: &[&CellValue], b: &[&CellValue], mode: TextComparison) -> f64 {
    let mut considered = 0u32;
    let mut equal = 0u32;
    for (va, vb) in a.iter().zip(b) {
        if va.is_empty() && vb.is_empty() {
            continue;
        }
        considered += 1;
        if va.equivalent(vb, mode) {
            equal += 1;
        }
    }
    if considered == 0 {
        1.0
    } else {
        equal as f64 / considered as f64
    }
}

pub(crate) fn align_rows_lcs(
    grid_a: &Grid,
    grid_b: &Grid,
    cols: &AxisAlignment,
    config: &DiffConfig,
) -> AxisAlignment {
    let mode = config.text_comparison;
    let (cols_a, cols_b): (Vec<u32>, Vec<u32>) = cols.matched().unzip();
    let rows_a = project(grid_a, &cols_a, mode);
    let rows_b = project(grid_b, &cols_b, mode);

    let keys_a: Vec<u128> = rows_a.iter().map(|r| r.signature).collect();
    let keys_b: Vec<u128> = rows_b.iter().map(|r| r.signature).collect();
    let threshold = config.similarity_threshold;
    let pairs = oriented_lcs_pairs(&keys_a, &keys_b, |i, j| {
        let (ra, rb) = (&rows_a[i], &rows_b[j]);
        ra.signature == rb.signature || row_similarity(&ra.values, &rb.values, mode) >= threshold
    });
    AxisAlignment::from_valid_pairs(grid_a.nrows, grid_b.nrows, &pairs)
}
