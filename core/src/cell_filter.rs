//! Content-based cell exclusion.
//!
//! Each pattern is matched at the start of a text cell. Matching cells are
//! removed from the grid before alignment, so they read as empty in every
//! later stage.

use std::borrow::Cow;

use regex::Regex;

use crate::config::ConfigError;
use crate::workbook::{CellValue, Sheet};

#[derive(Debug, Clone, Default)]
pub(crate) struct CellFilter {
    patterns: Vec<Regex>,
}

impl CellFilter {
    pub(crate) fn new(patterns: &[String]) -> Result<CellFilter, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})")).map_err(|err| {
                    ConfigError::InvalidCellPattern {
                        pattern: pattern.clone(),
                        message: err.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CellFilter { patterns })
    }

    pub(crate) fn skips(&self, value: &CellValue) -> bool {
        match value {
            CellValue::Text(text) => self.patterns.iter().any(|re| re.is_match(text)),
            _ => false,
        }
    }

    /// `sheet` with skipped cells removed, borrowed when nothing matches.
    pub(crate) fn apply<'s>(&self, sheet: &'s Sheet) -> Cow<'s, Sheet> {
        if self.patterns.is_empty() || !sheet.grid.iter_cells().any(|cell| self.skips(&cell.value)) {
            return Cow::Borrowed(sheet);
        }
        let mut filtered = sheet.clone();
        filtered.grid.retain_cells(|cell| !self.skips(&cell.value));
        Cow::Owned(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Grid;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn patterns_match_at_the_start_of_text_only() {
        let filter = CellFilter::new(&["Updated:".to_string(), r"\d{4}-\d{2}".to_string()]).unwrap();
        assert!(filter.skips(&text("Updated: 2024-05-01")));
        assert!(filter.skips(&text("2024-05 report")));
        assert!(!filter.skips(&text("Last Updated: today")));
        assert!(!filter.skips(&CellValue::Number(2024.0)));
        assert!(!filter.skips(&CellValue::Empty));
    }

    #[test]
    fn apply_borrows_untouched_sheets() {
        let sheet = Sheet::new(
            "S",
            Grid::from_rows(vec![vec![text("keep"), text("Updated: now")]]),
        );
        let filter = CellFilter::new(&["Updated:".to_string()]).unwrap();
        let filtered = filter.apply(&sheet);
        assert!(matches!(filtered, Cow::Owned(_)));
        assert_eq!(filtered.grid.value(0, 1), &CellValue::Empty);
        assert_eq!(filtered.grid.value(0, 0), &text("keep"));
        assert_eq!((filtered.grid.nrows, filtered.grid.ncols), (1, 2));

        let none = CellFilter::default();
        assert!(matches!(none.apply(&sheet), Cow::Borrowed(_)));
    }
}
