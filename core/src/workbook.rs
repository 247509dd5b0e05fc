//! Workbook, sheet, and grid data structures.
//!
//! This module defines the normalized cell model every comparison runs on:
//! - [`Workbook`]: sheets in source order
//! - [`Sheet`]: a named worksheet with its [`Grid`]
//! - [`Grid`]: a sparse 2D grid of typed cells
//! - [`Cell`] / [`CellValue`]: one cell and its closed set of value types

use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TextComparison;
use crate::hashing::{canonical_float_bits, comparable_text, hash_value};

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// The typed content of a cell.
///
/// Equality is exact and typed: a number never equals the text spelling of
/// that number. Numbers compare by value with `-0.0 == 0.0` and NaN equal to
/// NaN, so a grid always compares equal to itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        if let CellValue::Text(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        if let CellValue::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let CellValue::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Typed equality under a text comparison mode. `Exact` is the same as `==`.
    pub fn equivalent(&self, other: &CellValue, mode: TextComparison) -> bool {
        match (self, other) {
            (CellValue::Text(a), CellValue::Text(b)) => {
                a == b || comparable_text(a, mode) == comparable_text(b, mode)
            }
            _ => self == other,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Empty, CellValue::Empty) => true,
            (CellValue::Number(a), CellValue::Number(b)) => {
                canonical_float_bits(*a) == canonical_float_bits(*b)
            }
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Error(a), CellValue::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(self, TextComparison::Exact, state);
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::Error(e) => write!(f, "{e}"),
        }
    }
}

/// A single cell within a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Zero-based row index, as found in the source.
    pub row: u32,
    /// Zero-based column index, as found in the source.
    pub col: u32,
    pub value: CellValue,
    /// Display number-format code (e.g. `"0.00%"`), if the cell carries one.
    /// Never consulted for equality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Cell {
    pub fn new(row: u32, col: u32, value: CellValue) -> Cell {
        Cell {
            row,
            col,
            value,
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Cell {
        self.format = Some(format.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) lies outside the {nrows}x{ncols} grid")]
    OutOfBounds {
        row: u32,
        col: u32,
        nrows: u32,
        ncols: u32,
    },
    #[error("duplicate cell at ({row}, {col})")]
    DuplicateCell { row: u32, col: u32 },
}

/// A sparse 2D grid of cells representing sheet data.
///
/// # Invariants
///
/// Every stored cell satisfies `row < nrows` and `col < ncols`, and no two
/// cells share a coordinate. Absent coordinates read as [`CellValue::Empty`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    /// Number of rows in the grid's bounding rectangle.
    pub nrows: u32,
    /// Number of columns in the grid's bounding rectangle.
    pub ncols: u32,
    cells: FxHashMap<(u32, u32), Cell>,
}

impl Grid {
    pub fn new(nrows: u32, ncols: u32) -> Grid {
        Grid {
            nrows,
            ncols,
            cells: FxHashMap::default(),
        }
    }

    /// Build a dense grid from row-major values. Rows may be ragged; the grid
    /// is as wide as the longest row.
    pub fn from_rows<R, V>(rows: R) -> Grid
    where
        R: IntoIterator<Item = V>,
        V: IntoIterator<Item = CellValue>,
    {
        let mut grid = Grid::default();
        for (r, row) in rows.into_iter().enumerate() {
            let r = r as u32;
            grid.nrows = r + 1;
            for (c, value) in row.into_iter().enumerate() {
                let c = c as u32;
                grid.ncols = grid.ncols.max(c + 1);
                grid.insert_cell(r, c, value);
            }
        }
        grid
    }

    /// Insert or replace the value at `(row, col)`. Empty values are not stored.
    pub fn insert_cell(&mut self, row: u32, col: u32, value: CellValue) {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "cell coordinates must lie within the grid bounds"
        );
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), Cell::new(row, col, value));
        }
    }

    /// Insert a cell read from a source, enforcing the grid invariants.
    pub fn try_insert(&mut self, cell: Cell) -> Result<(), GridError> {
        if cell.row >= self.nrows || cell.col >= self.ncols {
            return Err(GridError::OutOfBounds {
                row: cell.row,
                col: cell.col,
                nrows: self.nrows,
                ncols: self.ncols,
            });
        }
        let key = (cell.row, cell.col);
        if self.cells.contains_key(&key) {
            return Err(GridError::DuplicateCell {
                row: cell.row,
                col: cell.col,
            });
        }
        self.cells.insert(key, cell);
        Ok(())
    }

    /// Drop every stored cell for which `keep` is false. Dimensions are
    /// unchanged.
    pub fn retain_cells(&mut self, mut keep: impl FnMut(&Cell) -> bool) {
        self.cells.retain(|_, cell| keep(cell));
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.cells
            .get(&(row, col))
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY_VALUE)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|cell| cell.value.is_empty())
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Non-empty cells of one row, ordered by column.
    pub fn row_values(&self, row: u32) -> Vec<(u32, CellValue)> {
        (0..self.ncols)
            .filter_map(|col| {
                let value = self.value(row, col);
                (!value.is_empty()).then(|| (col, value.clone()))
            })
            .collect()
    }

    /// Non-empty cells of one column restricted to `rows`, in the given order.
    pub fn col_values(&self, col: u32, rows: impl Iterator<Item = u32>) -> Vec<(u32, CellValue)> {
        rows.filter_map(|row| {
            let value = self.value(row, col);
            (!value.is_empty()).then(|| (row, value.clone()))
        })
        .collect()
    }
}

/// A single worksheet within a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// The display name of the sheet (e.g., "Sheet1", "Data").
    pub name: String,
    pub grid: Grid,
}

impl Sheet {
    pub fn new(name: impl Into<String>, grid: Grid) -> Sheet {
        Sheet {
            name: name.into(),
            grid,
        }
    }
}

/// A workbook: its worksheets in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Workbook {
        Workbook { sheets }
    }

    /// Look up a sheet by name. Sheet names are matched case-insensitively,
    /// as spreadsheet applications do.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        let wanted = name.to_lowercase();
        self.sheets
            .iter()
            .find(|sheet| sheet.name.to_lowercase() == wanted)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}
