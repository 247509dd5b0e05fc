//! Configuration for the diff engine.
//!
//! `DiffConfig` is passed explicitly to every comparison. It carries the
//! alignment knobs, the fallback policy for oversized tables, and the
//! sheet and text filters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell_filter::CellFilter;
use crate::error_codes;

/// What the engine does when an alignment table would exceed
/// [`DiffConfig::max_align_cells`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitBehavior {
    /// Report the sheet pair as a failure.
    #[default]
    ReturnError,
    /// Pair rows (or columns) index-to-index and record a warning.
    FallbackToPositional,
    /// Retry with `key_columns`; positional when no keys are configured.
    FallbackToKeyed,
}

/// How text values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextComparison {
    #[default]
    Exact,
    /// Fold full-width ASCII to half-width, collapse whitespace, and trim
    /// before comparing.
    Normalized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Source column indices forming the row identity. `None` aligns rows by
    /// content similarity.
    pub key_columns: Option<Vec<u32>>,
    /// Minimum similarity in `[0, 1]` for two rows to be matched.
    #[serde(alias = "threshold")]
    pub similarity_threshold: f64,
    /// Upper bound on `n * m` for any alignment table.
    pub max_align_cells: u64,
    pub on_limit_exceeded: LimitBehavior,
    /// Case-insensitive substrings; sheets whose names contain any of them
    /// are left out on both sides.
    pub skip_sheets: Vec<String>,
    /// Regular expressions anchored at the start of a text cell. Matching
    /// cells are read as empty on both sides.
    pub skip_cell_patterns: Vec<String>,
    pub text_comparison: TextComparison,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            key_columns: None,
            similarity_threshold: 0.5,
            max_align_cells: 25_000_000,
            on_limit_exceeded: LimitBehavior::ReturnError,
            skip_sheets: Vec::new(),
            skip_cell_patterns: Vec::new(),
            text_comparison: TextComparison::Exact,
        }
    }
}

impl DiffConfig {
    /// Smaller tables, degrading to positional alignment rather than failing.
    pub fn fastest() -> Self {
        Self {
            max_align_cells: 1_000_000,
            on_limit_exceeded: LimitBehavior::FallbackToPositional,
            ..Default::default()
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }

    /// Stricter row matching and a larger table budget.
    pub fn most_precise() -> Self {
        Self {
            similarity_threshold: 0.8,
            max_align_cells: 100_000_000,
            ..Default::default()
        }
    }

    pub fn builder() -> DiffConfigBuilder {
        DiffConfigBuilder {
            inner: DiffConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.similarity_threshold.is_finite()
            || self.similarity_threshold < 0.0
            || self.similarity_threshold > 1.0
        {
            return Err(ConfigError::InvalidSimilarityThreshold {
                value: self.similarity_threshold,
            });
        }

        if self.max_align_cells == 0 {
            return Err(ConfigError::NonPositiveLimit {
                field: "max_align_cells",
                value: 0,
            });
        }

        if matches!(&self.key_columns, Some(keys) if keys.is_empty()) {
            return Err(ConfigError::EmptyKeyColumns);
        }

        CellFilter::new(&self.skip_cell_patterns)?;

        Ok(())
    }

    /// Whether a sheet is excluded by `skip_sheets`.
    pub fn skips_sheet(&self, name: &str) -> bool {
        if self.skip_sheets.is_empty() {
            return false;
        }
        let lowered = name.to_lowercase();
        self.skip_sheets
            .iter()
            .filter(|pattern| !pattern.is_empty())
            .any(|pattern| lowered.contains(&pattern.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("similarity_threshold must be in [0.0, 1.0] and finite (got {value})")]
    InvalidSimilarityThreshold { value: f64 },
    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveLimit { field: &'static str, value: u64 },
    #[error("key_columns must name at least one column when set")]
    EmptyKeyColumns,
    #[error("invalid skip_cell_patterns entry '{pattern}': {message}")]
    InvalidCellPattern { pattern: String, message: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        error_codes::CONFIG_INVALID
    }
}

#[derive(Debug, Clone)]
pub struct DiffConfigBuilder {
    inner: DiffConfig,
}

impl Default for DiffConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffConfigBuilder {
    pub fn new() -> Self {
        DiffConfig::builder()
    }

    pub fn key_columns(mut self, cols: impl IntoIterator<Item = u32>) -> Self {
        self.inner.key_columns = Some(cols.into_iter().collect());
        self
    }

    pub fn similarity_threshold(mut self, value: f64) -> Self {
        self.inner.similarity_threshold = value;
        self
    }

    pub fn max_align_cells(mut self, value: u64) -> Self {
        self.inner.max_align_cells = value;
        self
    }

    pub fn on_limit_exceeded(mut self, value: LimitBehavior) -> Self {
        self.inner.on_limit_exceeded = value;
        self
    }

    pub fn skip_sheet(mut self, pattern: impl Into<String>) -> Self {
        self.inner.skip_sheets.push(pattern.into());
        self
    }

    pub fn skip_cell_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.inner.skip_cell_patterns.push(pattern.into());
        self
    }

    pub fn text_comparison(mut self, value: TextComparison) -> Self {
        self.inner.text_comparison = value;
        self
    }

    pub fn build(self) -> Result<DiffConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let cfg = DiffConfig::default();
        assert_eq!(cfg.similarity_threshold, 0.5);
        assert_eq!(cfg.max_align_cells, 25_000_000);
        assert_eq!(cfg.on_limit_exceeded, LimitBehavior::ReturnError);
        assert_eq!(cfg.text_comparison, TextComparison::Exact);
        assert!(cfg.key_columns.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn serde_roundtrip_preserves_defaults() {
        let cfg = DiffConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize default config");
        let parsed: DiffConfig = serde_json::from_str(&json).expect("deserialize default config");
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "key_columns": [0, 2],
            "threshold": 0.75,
            "on_limit_exceeded": "fallback_to_keyed",
            "text_comparison": "normalized"
        }"#;
        let cfg: DiffConfig = serde_json::from_str(json).expect("deserialize partial config");
        assert_eq!(cfg.key_columns, Some(vec![0, 2]));
        assert_eq!(cfg.similarity_threshold, 0.75);
        assert_eq!(cfg.on_limit_exceeded, LimitBehavior::FallbackToKeyed);
        assert_eq!(cfg.text_comparison, TextComparison::Normalized);
        assert_eq!(cfg.max_align_cells, 25_000_000);
    }

    #[test]
    fn builder_rejects_invalid_similarity_threshold() {
        let err = DiffConfig::builder()
            .similarity_threshold(1.5)
            .build()
            .expect_err("builder should reject threshold above one");
        assert!(matches!(
            err,
            ConfigError::InvalidSimilarityThreshold { value } if (value - 1.5).abs() < f64::EPSILON
        ));

        let err = DiffConfig::builder()
            .similarity_threshold(f64::NAN)
            .build()
            .expect_err("NaN threshold is invalid");
        assert!(matches!(err, ConfigError::InvalidSimilarityThreshold { .. }));
    }

    #[test]
    fn zero_limit_and_empty_keys_rejected() {
        let err = DiffConfig::builder().max_align_cells(0).build().unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonPositiveLimit {
                field: "max_align_cells",
                value: 0
            }
        );

        let err = DiffConfig::builder()
            .key_columns(Vec::new())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyKeyColumns);
        assert_eq!(err.code(), error_codes::CONFIG_INVALID);
    }

    #[test]
    fn skip_sheets_match_substrings_case_insensitively() {
        let cfg = DiffConfig::builder()
            .skip_sheet("history")
            .skip_sheet("")
            .build()
            .unwrap();
        assert!(cfg.skips_sheet("Change History"));
        assert!(cfg.skips_sheet("HISTORY_2024"));
        assert!(!cfg.skips_sheet("Data"));
    }

    #[test]
    fn malformed_cell_patterns_are_rejected() {
        let err = DiffConfig::builder()
            .skip_cell_pattern("^Note:")
            .skip_cell_pattern("(unclosed")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidCellPattern { ref pattern, .. } if pattern == "(unclosed"
        ));
        assert_eq!(err.code(), error_codes::CONFIG_INVALID);

        let json = r#"{ "skip_cell_patterns": ["[0-9]{4}/[0-9]{2}"] }"#;
        let cfg: DiffConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.skip_cell_patterns, vec!["[0-9]{4}/[0-9]{2}".to_string()]);
    }

    #[test]
    fn presets_differ_in_expected_directions() {
        let fastest = DiffConfig::fastest();
        let balanced = DiffConfig::balanced();
        let precise = DiffConfig::most_precise();

        assert!(fastest.max_align_cells < balanced.max_align_cells);
        assert_eq!(fastest.on_limit_exceeded, LimitBehavior::FallbackToPositional);
        assert!(precise.similarity_threshold > balanced.similarity_threshold);
        assert!(precise.max_align_cells > balanced.max_align_cells);
        for cfg in [fastest, balanced, precise] {
            assert!(cfg.validate().is_ok());
        }
    }
}
