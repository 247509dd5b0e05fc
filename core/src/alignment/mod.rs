//! Row and column alignment between two grids.
//!
//! Columns are aligned first, by order-insensitive content overlap
//! (`column_alignment`). Rows are then aligned either by key columns
//! (`database_alignment`) or by similarity over the matched columns
//! (`row_alignment`). Both unkeyed passes run an LCS over a flat table
//! (`lcs`) whose size is bounded by `max_align_cells`; the keyed pass uses a
//! longest increasing subsequence (`lis`) and has no such bound.

pub(crate) mod lcs;
pub(crate) mod lis;

use thiserror::Error;
use tracing::warn;

use crate::alignment_types::{AlignmentMap, Axis, AxisAlignment};
use crate::column_alignment::align_columns_lcs;
use crate::config::{ConfigError, DiffConfig, LimitBehavior};
use crate::database_alignment::{align_rows_by_key, suggest_key_columns};
use crate::error_codes;
use crate::row_alignment::align_rows_lcs;
use crate::workbook::Grid;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum AlignError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error(
        "{axis} alignment of {source_len} x {target_len} needs {cells} table cells (limit {limit})"
    )]
    AlignmentTooLarge {
        axis: Axis,
        source_len: u32,
        target_len: u32,
        cells: u64,
        limit: u64,
    },
    #[error("key column {col} has no counterpart in the target sheet")]
    KeyColumnUnmatched { col: u32 },
}

impl AlignError {
    pub fn code(&self) -> &'static str {
        match self {
            AlignError::InvalidConfiguration(err) => err.code(),
            AlignError::AlignmentTooLarge { .. } => error_codes::ALIGN_TOO_LARGE,
            AlignError::KeyColumnUnmatched { .. } => error_codes::ALIGN_KEY_COLUMN_UNMATCHED,
        }
    }
}

fn check_table_size(
    axis: Axis,
    source_len: u32,
    target_len: u32,
    limit: u64,
) -> Result<(), AlignError> {
    let cells = source_len as u64 * target_len as u64;
    if cells > limit {
        return Err(AlignError::AlignmentTooLarge {
            axis,
            source_len,
            target_len,
            cells,
            limit,
        });
    }
    Ok(())
}

/// Align the rows and columns of two grids.
///
/// The configuration is validated and every size bound is checked before
/// any table is built, so bad options or an oversized input fail fast and
/// never yield a partial map. A grid with no rows (or
/// columns) leaves every row (or column) of the other side unmatched.
pub fn align(grid_a: &Grid, grid_b: &Grid, options: &DiffConfig) -> Result<AlignmentMap, AlignError> {
    options.validate()?;
    let limit = options.max_align_cells;
    check_table_size(Axis::Columns, grid_a.ncols, grid_b.ncols, limit)?;
    if options.key_columns.is_none() {
        check_table_size(Axis::Rows, grid_a.nrows, grid_b.nrows, limit)?;
    }

    let cols = align_columns(grid_a, grid_b, options)?;
    let rows = match &options.key_columns {
        Some(keys) => align_rows_keyed(grid_a, grid_b, &cols, keys, options)?,
        None => align_rows(grid_a, grid_b, &cols, options)?,
    };
    Ok(AlignmentMap { rows, cols })
}

pub fn align_columns(
    grid_a: &Grid,
    grid_b: &Grid,
    options: &DiffConfig,
) -> Result<AxisAlignment, AlignError> {
    check_table_size(Axis::Columns, grid_a.ncols, grid_b.ncols, options.max_align_cells)?;
    Ok(align_columns_lcs(grid_a, grid_b, options))
}

pub fn align_rows(
    grid_a: &Grid,
    grid_b: &Grid,
    cols: &AxisAlignment,
    options: &DiffConfig,
) -> Result<AxisAlignment, AlignError> {
    check_table_size(Axis::Rows, grid_a.nrows, grid_b.nrows, options.max_align_cells)?;
    Ok(align_rows_lcs(grid_a, grid_b, cols, options))
}

/// Align rows by source key columns, mapped into the target through `cols`.
pub fn align_rows_keyed(
    grid_a: &Grid,
    grid_b: &Grid,
    cols: &AxisAlignment,
    key_columns: &[u32],
    options: &DiffConfig,
) -> Result<AxisAlignment, AlignError> {
    let target_keys = key_columns
        .iter()
        .map(|&col| cols.target_of(col).ok_or(AlignError::KeyColumnUnmatched { col }))
        .collect::<Result<Vec<u32>, AlignError>>()?;
    Ok(align_rows_by_key(
        grid_a,
        grid_b,
        key_columns,
        &target_keys,
        options.text_comparison,
    ))
}

/// Alignment after [`align`] failed with `AlignmentTooLarge`, following
/// `on_limit_exceeded`. Returns `None` under [`LimitBehavior::ReturnError`].
///
/// Oversized column tables fall back to positional columns. Oversized row
/// tables fall back to positional rows, or for
/// [`LimitBehavior::FallbackToKeyed`] to a key column suggested from the
/// source grid when one exists. Each fallback is described in `warnings`.
pub(crate) fn align_with_fallback(
    grid_a: &Grid,
    grid_b: &Grid,
    options: &DiffConfig,
    warnings: &mut Vec<String>,
) -> Result<Option<AlignmentMap>, AlignError> {
    if options.on_limit_exceeded == LimitBehavior::ReturnError {
        return Ok(None);
    }

    let cols = match align_columns(grid_a, grid_b, options) {
        Ok(cols) => cols,
        Err(err @ AlignError::AlignmentTooLarge { .. }) => {
            warnings.push(format!("{err}; columns aligned by position"));
            AxisAlignment::positional(grid_a.ncols, grid_b.ncols)
        }
        Err(err) => return Err(err),
    };

    if let Some(keys) = &options.key_columns {
        let rows = align_rows_keyed(grid_a, grid_b, &cols, keys, options)?;
        return Ok(Some(AlignmentMap { rows, cols }));
    }

    let rows = match align_rows(grid_a, grid_b, &cols, options) {
        Ok(rows) => rows,
        Err(err @ AlignError::AlignmentTooLarge { .. }) => {
            fallback_rows(grid_a, grid_b, &cols, options, &err, warnings)
        }
        Err(err) => return Err(err),
    };
    Ok(Some(AlignmentMap { rows, cols }))
}

fn fallback_rows(
    grid_a: &Grid,
    grid_b: &Grid,
    cols: &AxisAlignment,
    options: &DiffConfig,
    cause: &AlignError,
    warnings: &mut Vec<String>,
) -> AxisAlignment {
    if options.on_limit_exceeded == LimitBehavior::FallbackToKeyed {
        let suggested = suggest_key_columns(grid_a, options.text_comparison);
        if !suggested.is_empty()
            && let Ok(rows) = align_rows_keyed(grid_a, grid_b, cols, &suggested, options)
        {
            warnings.push(format!(
                "{cause}; rows aligned by suggested key column {}",
                crate::addressing::column_label(suggested[0])
            ));
            return rows;
        }
        warn!("no usable key column found; falling back to positional rows");
    }
    warnings.push(format!("{cause}; rows aligned by position"));
    AxisAlignment::positional(grid_a.nrows, grid_b.nrows)
}
