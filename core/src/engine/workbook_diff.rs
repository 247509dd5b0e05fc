use std::borrow::Cow;
use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::alignment::{AlignError, align, align_with_fallback};
use crate::alignment_types::AlignmentMap;
use crate::cell_filter::CellFilter;
use crate::config::DiffConfig;
use crate::diff::{ChangeRecord, DiffError, DiffReport, DiffSummary, SheetFailure};
use crate::sink::{DiffSink, VecSink};
use crate::workbook::{Sheet, Workbook};

use super::grid_diff::diff_grids;

/// How one sheet of either workbook takes part in the comparison.
enum SheetPlan<'a> {
    Removed(&'a Sheet),
    Paired(&'a Sheet, &'a Sheet),
    Added(&'a Sheet),
}

/// Outcome of aligning one sheet pair.
enum PairAlignment {
    Aligned {
        map: AlignmentMap,
        warnings: Vec<String>,
    },
    Failed(SheetFailure),
}

fn sheet_key(sheet: &Sheet) -> String {
    sheet.name.to_lowercase()
}

/// Source sheets in order (removed or paired), then target-only sheets in
/// order. Sheets excluded by `skip_sheets` take no part on either side.
fn plan_sheets<'a>(
    old: &'a Workbook,
    new: &'a Workbook,
    config: &DiffConfig,
    warnings: &mut Vec<String>,
) -> Vec<SheetPlan<'a>> {
    let keep = |sheet: &&Sheet| !config.skips_sheet(&sheet.name);
    let old_sheets: Vec<&Sheet> = old.sheets.iter().filter(keep).collect();
    let new_sheets: Vec<&Sheet> = new.sheets.iter().filter(keep).collect();

    let mut new_by_name: FxHashMap<String, usize> = FxHashMap::default();
    for (idx, sheet) in new_sheets.iter().enumerate() {
        match new_by_name.entry(sheet_key(sheet)) {
            Entry::Occupied(_) => warnings.push(format!(
                "duplicate sheet name '{}' in new workbook; only the first is compared",
                sheet.name
            )),
            Entry::Vacant(slot) => {
                slot.insert(idx);
            }
        }
    }

    let mut used = vec![false; new_sheets.len()];
    let mut plan = Vec::with_capacity(old_sheets.len() + new_sheets.len());
    for sheet in old_sheets {
        match new_by_name.get(&sheet_key(sheet)) {
            Some(&idx) if !used[idx] => {
                used[idx] = true;
                plan.push(SheetPlan::Paired(sheet, new_sheets[idx]));
            }
            Some(_) => {
                warnings.push(format!(
                    "duplicate sheet name '{}' in old workbook; only the first is compared",
                    sheet.name
                ));
                plan.push(SheetPlan::Removed(sheet));
            }
            None => plan.push(SheetPlan::Removed(sheet)),
        }
    }
    for (idx, sheet) in new_sheets.into_iter().enumerate() {
        if !used[idx] {
            plan.push(SheetPlan::Added(sheet));
        }
    }
    plan
}

fn align_pair(old: &Sheet, new: &Sheet, config: &DiffConfig) -> PairAlignment {
    let (grid_a, grid_b) = (&old.grid, &new.grid);
    let failed = |err: AlignError| {
        warn!(sheet = %old.name, code = err.code(), "sheet pair not compared: {err}");
        PairAlignment::Failed(SheetFailure {
            sheet: old.name.clone(),
            code: err.code().to_string(),
            message: err.to_string(),
        })
    };

    let (map, warnings) = match align(grid_a, grid_b, config) {
        Ok(map) => (map, Vec::new()),
        Err(err @ AlignError::AlignmentTooLarge { .. }) => {
            let mut notes = Vec::new();
            match align_with_fallback(grid_a, grid_b, config, &mut notes) {
                Ok(Some(map)) => {
                    let warnings: Vec<String> = notes
                        .into_iter()
                        .map(|note| format!("Sheet '{}': {note}", old.name))
                        .collect();
                    for warning in &warnings {
                        warn!("{warning}");
                    }
                    (map, warnings)
                }
                Ok(None) => return failed(err),
                Err(fallback_err) => return failed(fallback_err),
            }
        }
        Err(err) => return failed(err),
    };

    debug!(
        sheet = %old.name,
        source_rows = grid_a.nrows,
        source_cols = grid_a.ncols,
        target_rows = grid_b.nrows,
        target_cols = grid_b.ncols,
        matched_rows = map.rows.matched_count(),
        matched_cols = map.cols.matched_count(),
        "aligned sheet pair"
    );
    PairAlignment::Aligned { map, warnings }
}

#[cfg(feature = "parallel")]
fn align_pairs<'a>(
    pairs: &[(&'a Sheet, &'a Sheet)],
    config: &DiffConfig,
) -> impl Iterator<Item = PairAlignment> {
    use rayon::prelude::*;

    let aligned: Vec<PairAlignment> = pairs
        .par_iter()
        .map(|(old, new)| align_pair(old, new, config))
        .collect();
    aligned.into_iter()
}

#[cfg(not(feature = "parallel"))]
fn align_pairs<'p>(
    pairs: &'p [(&Sheet, &Sheet)],
    config: &'p DiffConfig,
) -> impl Iterator<Item = PairAlignment> + 'p {
    pairs.iter().map(move |(old, new)| align_pair(old, new, config))
}

fn emit_pair<S: DiffSink>(
    old: &Sheet,
    new: &Sheet,
    alignment: PairAlignment,
    config: &DiffConfig,
    sink: &mut S,
    summary: &mut DiffSummary,
) -> Result<(), DiffError> {
    match alignment {
        PairAlignment::Aligned { map, warnings } => {
            summary.sheets_compared += 1;
            summary.warnings.extend(warnings);
            let diff = diff_grids(old.name.as_str(), &old.grid, &new.grid, &map)
                .with_text_comparison(config.text_comparison);
            for record in &diff {
                sink.emit(record)?;
                summary.record_count += 1;
            }
        }
        PairAlignment::Failed(failure) => summary.failures.push(failure),
    }
    Ok(())
}

fn emit_plan<S: DiffSink>(
    plan: &[SheetPlan<'_>],
    config: &DiffConfig,
    sink: &mut S,
    summary: &mut DiffSummary,
) -> Result<(), DiffError> {
    let filter = CellFilter::new(&config.skip_cell_patterns)?;
    let prepared: Vec<(Cow<'_, Sheet>, Cow<'_, Sheet>)> = plan
        .iter()
        .filter_map(|entry| match entry {
            SheetPlan::Paired(old, new) => Some((filter.apply(old), filter.apply(new))),
            _ => None,
        })
        .collect();
    let pairs: Vec<(&Sheet, &Sheet)> = prepared
        .iter()
        .map(|(old, new)| (old.as_ref(), new.as_ref()))
        .collect();
    let mut alignments = align_pairs(&pairs, config);
    let mut paired = pairs.iter();

    for entry in plan {
        let record = match entry {
            SheetPlan::Removed(sheet) => ChangeRecord::SheetRemoved {
                sheet: sheet.name.clone(),
            },
            SheetPlan::Added(sheet) => ChangeRecord::SheetAdded {
                sheet: sheet.name.clone(),
            },
            SheetPlan::Paired(..) => {
                let (Some(alignment), Some((old, new))) = (alignments.next(), paired.next()) else {
                    continue;
                };
                emit_pair(old, new, alignment, config, sink, summary)?;
                continue;
            }
        };
        sink.emit(record)?;
        summary.record_count += 1;
    }
    Ok(())
}

/// Stream the changes between two workbooks into `sink`.
///
/// The configuration is validated before any work. A sheet pair that cannot
/// be aligned is recorded as a failure in the summary and the run continues.
/// `finish` is called on the sink whether or not emission succeeded.
pub fn diff_workbooks_streaming<S: DiffSink>(
    old: &Workbook,
    new: &Workbook,
    config: &DiffConfig,
    sink: &mut S,
) -> Result<DiffSummary, DiffError> {
    config.validate()?;

    let mut summary = DiffSummary::default();
    let plan = plan_sheets(old, new, config, &mut summary.warnings);

    sink.begin()?;
    let emitted = emit_plan(&plan, config, sink, &mut summary);
    let finished = sink.finish();
    emitted?;
    finished?;

    info!(
        records = summary.record_count,
        sheets_compared = summary.sheets_compared,
        failures = summary.failures.len(),
        warnings = summary.warnings.len(),
        "workbook diff complete"
    );
    Ok(summary)
}

/// Compare two workbooks and collect every change into a [`DiffReport`].
pub fn diff_workbooks(
    old: &Workbook,
    new: &Workbook,
    config: &DiffConfig,
) -> Result<DiffReport, DiffError> {
    let mut sink = VecSink::new();
    let summary = diff_workbooks_streaming(old, new, config, &mut sink)?;
    Ok(DiffReport::from_records_and_summary(sink.into_records(), summary))
}

/// Compare two specific sheets regardless of their names. Records carry the
/// source sheet's name. `skip_sheets` does not apply.
pub fn diff_sheets(old: &Sheet, new: &Sheet, config: &DiffConfig) -> Result<DiffReport, DiffError> {
    config.validate()?;

    let filter = CellFilter::new(&config.skip_cell_patterns)?;
    let (old, new) = (filter.apply(old), filter.apply(new));
    let mut sink = VecSink::new();
    let mut summary = DiffSummary::default();
    let alignment = align_pair(&old, &new, config);
    emit_pair(&old, &new, alignment, config, &mut sink, &mut summary)?;
    Ok(DiffReport::from_records_and_summary(sink.into_records(), summary))
}

/// [`diff_sheets`] with sheets looked up by case-insensitive name.
pub fn diff_sheets_by_name(
    old: &Workbook,
    old_sheet: &str,
    new: &Workbook,
    new_sheet: &str,
    config: &DiffConfig,
) -> Result<DiffReport, DiffError> {
    fn lookup<'w>(workbook: &'w Workbook, name: &str) -> Result<&'w Sheet, DiffError> {
        workbook.sheet(name).ok_or_else(|| DiffError::SheetNotFound {
            requested: name.to_string(),
            available: workbook.sheet_names().into_iter().map(String::from).collect(),
        })
    }

    diff_sheets(lookup(old, old_sheet)?, lookup(new, new_sheet)?, config)
}
