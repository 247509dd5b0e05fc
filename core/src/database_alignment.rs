//! Row alignment by key columns, treating each sheet as a table.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::alignment::lis::lis_indices;
use crate::alignment_types::AxisAlignment;
use crate::config::TextComparison;
use crate::hashing::{canonical_float_bits, comparable_text};
use crate::workbook::{CellValue, Grid};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum KeyPart {
    Empty,
    Number(u64),
    Text(String),
    Bool(bool),
    Error(String),
}

impl KeyPart {
    fn from_value(value: &CellValue, mode: TextComparison) -> KeyPart {
        match value {
            CellValue::Empty => KeyPart::Empty,
            CellValue::Number(n) => KeyPart::Number(canonical_float_bits(*n)),
            CellValue::Text(s) => KeyPart::Text(comparable_text(s, mode).into_owned()),
            CellValue::Bool(b) => KeyPart::Bool(*b),
            CellValue::Error(e) => KeyPart::Error(e.clone()),
        }
    }
}

type RowKey = Vec<KeyPart>;

fn row_key(grid: &Grid, row: u32, cols: &[u32], mode: TextComparison) -> RowKey {
    cols.iter()
        .map(|&col| KeyPart::from_value(grid.value(row, col), mode))
        .collect()
}

/// Align rows whose key tuples are equal. The k-th source row with a key
/// pairs with the k-th target row with that key; crossing pairs are dropped
/// so the result stays monotonic. Which crossing pairs survive is decided
/// from the side whose key sequence sorts first, so swapping the grids
/// transposes the result.
pub(crate) fn align_rows_by_key(
    grid_a: &Grid,
    grid_b: &Grid,
    key_cols_a: &[u32],
    key_cols_b: &[u32],
    mode: TextComparison,
) -> AxisAlignment {
    let keys_a: Vec<RowKey> = (0..grid_a.nrows)
        .map(|row| row_key(grid_a, row, key_cols_a, mode))
        .collect();
    let keys_b: Vec<RowKey> = (0..grid_b.nrows)
        .map(|row| row_key(grid_b, row, key_cols_b, mode))
        .collect();

    let chain = if keys_a <= keys_b {
        pair_keys(&keys_a, &keys_b)
    } else {
        pair_keys(&keys_b, &keys_a)
            .into_iter()
            .map(|(b, a)| (a, b))
            .collect()
    };
    AxisAlignment::from_valid_pairs(grid_a.nrows, grid_b.nrows, &chain)
}

fn pair_keys(source: &[RowKey], target: &[RowKey]) -> Vec<(u32, u32)> {
    let mut targets: FxHashMap<(&RowKey, u32), u32> = FxHashMap::default();
    let mut seen: FxHashMap<&RowKey, u32> = FxHashMap::default();
    for (row, key) in target.iter().enumerate() {
        let occurrence = seen.entry(key).or_insert(0);
        targets.insert((key, *occurrence), row as u32);
        *occurrence += 1;
    }

    let mut candidates: Vec<(u32, u32)> = Vec::new();
    seen.clear();
    for (row, key) in source.iter().enumerate() {
        let occurrence = seen.entry(key).or_insert(0);
        if let Some(&target_row) = targets.get(&(key, *occurrence)) {
            candidates.push((row as u32, target_row));
        }
        *occurrence += 1;
    }

    lis_indices(&candidates, |&(_, target_row)| target_row)
        .into_iter()
        .map(|idx| candidates[idx])
        .collect()
}

fn is_key_header(value: &CellValue) -> bool {
    let Some(text) = value.as_text() else {
        return false;
    };
    let text = text.trim().to_lowercase();
    text == "id" || text == "key" || text == "no" || text.ends_with("_id") || text.ends_with(" id")
}

/// Pick a single column that identifies rows in `grid`: every data row has a
/// distinct non-empty value in it. The first row is treated as a header when
/// there is more than one row; a header naming an identifier wins over
/// column order. Returns an empty list when no column qualifies.
pub fn suggest_key_columns(grid: &Grid, mode: TextComparison) -> Vec<u32> {
    let data_start = if grid.nrows > 1 { 1 } else { 0 };
    if grid.nrows == data_start || grid.ncols == 0 {
        return Vec::new();
    }

    let is_unique = |col: u32| -> bool {
        let mut seen: FxHashSet<KeyPart> = FxHashSet::default();
        (data_start..grid.nrows).all(|row| {
            let value = grid.value(row, col);
            !value.is_empty() && seen.insert(KeyPart::from_value(value, mode))
        })
    };

    let unique: Vec<u32> = (0..grid.ncols).filter(|&col| is_unique(col)).collect();
    let named = unique
        .iter()
        .copied()
        .find(|&col| data_start == 1 && is_key_header(grid.value(0, col)));
    named.or(unique.first().copied()).into_iter().collect()
}
