//! Column alignment by order-insensitive content overlap.
//!
//! A column is summarized as the multiset of its non-empty values. Two
//! columns are similar when the multiset intersection covers at least
//! `similarity_threshold` of the larger multiset, so inserting or deleting
//! rows barely moves the score.

use rustc_hash::FxHashMap;

use crate::alignment::lcs::oriented_lcs_pairs;
use crate::alignment_types::AxisAlignment;
use crate::config::{DiffConfig, TextComparison};
use crate::hashing::{col_signature, value_hash64};
use crate::workbook::Grid;

/// Multiset of value hashes for one column, plus a positional signature
/// that lets identical columns skip the multiset comparison.
#[derive(Debug, Default)]
pub(crate) struct ColumnProfile {
    signature: u128,
    counts: FxHashMap<u64, u32>,
    total: u32,
}

impl ColumnProfile {
    pub(crate) fn build(grid: &Grid, col: u32, mode: TextComparison) -> ColumnProfile {
        let mut profile = ColumnProfile {
            signature: col_signature(grid, col, mode),
            ..ColumnProfile::default()
        };
        for row in 0..grid.nrows {
            let value = grid.value(row, col);
            if value.is_empty() {
                continue;
            }
            *profile.counts.entry(value_hash64(value, mode)).or_insert(0) += 1;
            profile.total += 1;
        }
        profile
    }

    pub(crate) fn similarity(&self, other: &ColumnProfile) -> f64 {
        let larger = self.total.max(other.total);
        if larger == 0 || self.signature == other.signature {
            return 1.0;
        }
        let (small, big) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        let shared: u32 = small
            .counts
            .iter()
            .map(|(hash, &count)| count.min(big.counts.get(hash).copied().unwrap_or(0)))
            .sum();
        shared as f64 / larger as f64
    }
}

pub(crate) fn align_columns_lcs(grid_a: &Grid, grid_b: &Grid, config: &DiffConfig) -> AxisAlignment {
    let mode = config.text_comparison;
    let profiles_a: Vec<ColumnProfile> = (0..grid_a.ncols)
        .map(|col| ColumnProfile::build(grid_a, col, mode))
        .collect();
    let profiles_b: Vec<ColumnProfile> = (0..grid_b.ncols)
        .map(|col| ColumnProfile::build(grid_b, col, mode))
        .collect();

    let keys_a: Vec<u128> = profiles_a.iter().map(|p| p.signature).collect();
    let keys_b: Vec<u128> = profiles_b.iter().map(|p| p.signature).collect();
    let threshold = config.similarity_threshold;
    let pairs = oriented_lcs_pairs(&keys_a, &keys_b, |i, j| {
        profiles_a[i].similarity(&profiles_b[j]) >= threshold
    });
    AxisAlignment::from_valid_pairs(grid_a.ncols, grid_b.ncols, &pairs)
}
