//! Hash utilities for cell values and row/column content signatures.
//!
//! Signatures let the aligner treat byte-identical rows and columns as matches
//! without a cell-by-cell comparison. Every function here agrees with
//! [`CellValue`] equality under the active [`TextComparison`] mode.

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::Xxh3;

use crate::config::TextComparison;
use crate::workbook::{CellValue, Grid};

const TAG_EMPTY: u8 = 0;
const TAG_NUMBER: u8 = 1;
const TAG_TEXT: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_ERROR: u8 = 4;

/// Bit pattern used for equality and hashing of numbers: `-0.0` folds into
/// `0.0` and every NaN folds into one canonical NaN.
pub(crate) fn canonical_float_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

/// Fold text for [`TextComparison::Normalized`]: full-width ASCII and the
/// ideographic space become half-width, whitespace runs collapse to a single
/// space, and the result is trimmed.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        let folded = match ch {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => {
                char::from_u32(ch as u32 - 0xFEE0).unwrap_or(ch)
            }
            other => other,
        };
        if folded.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(folded);
    }
    out
}

pub(crate) fn comparable_text(text: &str, mode: TextComparison) -> Cow<'_, str> {
    match mode {
        TextComparison::Exact => Cow::Borrowed(text),
        TextComparison::Normalized => Cow::Owned(normalize_text(text)),
    }
}

pub(crate) fn hash_value<H: Hasher>(value: &CellValue, mode: TextComparison, state: &mut H) {
    match value {
        CellValue::Empty => TAG_EMPTY.hash(state),
        CellValue::Number(n) => {
            TAG_NUMBER.hash(state);
            canonical_float_bits(*n).hash(state);
        }
        CellValue::Text(s) => {
            TAG_TEXT.hash(state);
            comparable_text(s, mode).hash(state);
        }
        CellValue::Bool(b) => {
            TAG_BOOL.hash(state);
            b.hash(state);
        }
        CellValue::Error(e) => {
            TAG_ERROR.hash(state);
            e.hash(state);
        }
    }
}

pub(crate) fn value_hash64(value: &CellValue, mode: TextComparison) -> u64 {
    let mut hasher = Xxh3::new();
    hash_value(value, mode, &mut hasher);
    hasher.finish()
}

/// Signature of one row, restricted to (and ordered by) `cols`.
pub(crate) fn row_signature(grid: &Grid, row: u32, cols: &[u32], mode: TextComparison) -> u128 {
    let mut hasher = Xxh3::new();
    for (position, &col) in cols.iter().enumerate() {
        let value = grid.value(row, col);
        if value.is_empty() {
            continue;
        }
        (position as u32).hash(&mut hasher);
        hash_value(value, mode, &mut hasher);
    }
    hasher.digest128()
}

/// Signature of one column over every row of the grid.
pub(crate) fn col_signature(grid: &Grid, col: u32, mode: TextComparison) -> u128 {
    let mut hasher = Xxh3::new();
    for row in 0..grid.nrows {
        let value = grid.value(row, col);
        if value.is_empty() {
            continue;
        }
        row.hash(&mut hasher);
        hash_value(value, mode, &mut hasher);
    }
    hasher.digest128()
}
