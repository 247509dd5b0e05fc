use crate::commands::diff::Verbosity;
use anyhow::Result;
use excel_checker::{CellValue, ChangeRecord, DiffReport, column_label, index_to_address};
use std::io::Write;

pub fn write_text_report<W: Write>(
    w: &mut W,
    report: &DiffReport,
    verbosity: Verbosity,
) -> Result<()> {
    if report.records.is_empty() {
        writeln!(w, "No differences found.")?;
        write_summary(w, report, verbosity)?;
        return Ok(());
    }

    if verbosity != Verbosity::Quiet {
        for (sheet_name, records) in group_by_sheet(report) {
            writeln!(w, "Sheet \"{}\":", sheet_name)?;
            for record in records {
                for line in render_record(record, verbosity) {
                    writeln!(w, "  {}", line)?;
                }
            }
            writeln!(w)?;
        }
    }

    write_summary(w, report, verbosity)?;

    Ok(())
}

/// Records grouped by sheet, in the order sheets first appear.
fn group_by_sheet(report: &DiffReport) -> Vec<(&str, Vec<&ChangeRecord>)> {
    let mut groups: Vec<(&str, Vec<&ChangeRecord>)> = Vec::new();
    for record in &report.records {
        match groups.last_mut() {
            Some((sheet, records)) if *sheet == record.sheet() => records.push(record),
            _ => groups.push((record.sheet(), vec![record])),
        }
    }
    groups
}

fn render_record(record: &ChangeRecord, verbosity: Verbosity) -> Vec<String> {
    let verbose = verbosity == Verbosity::Verbose;
    match record {
        ChangeRecord::SheetAdded { .. } => vec!["Sheet ADDED".to_string()],
        ChangeRecord::SheetRemoved { .. } => vec!["Sheet REMOVED".to_string()],
        ChangeRecord::RowInserted { row, cells, .. } => {
            let mut lines = vec![format!("Row {}: ADDED", row + 1)];
            if verbose {
                lines.extend(cells.iter().map(|(col, value)| {
                    format!("  {} = {}", index_to_address(*row, *col), format_cell_value(value))
                }));
            }
            lines
        }
        ChangeRecord::RowDeleted { row, cells, .. } => {
            let mut lines = vec![format!("Row {}: REMOVED", row + 1)];
            if verbose {
                lines.extend(cells.iter().map(|(col, value)| {
                    format!("  {} = {}", index_to_address(*row, *col), format_cell_value(value))
                }));
            }
            lines
        }
        ChangeRecord::ColumnInserted { col, cells, .. } => {
            let mut lines = vec![format!("Column {}: ADDED", column_label(*col))];
            if verbose {
                lines.extend(cells.iter().map(|(row, value)| {
                    format!("  {} = {}", index_to_address(*row, *col), format_cell_value(value))
                }));
            }
            lines
        }
        ChangeRecord::ColumnDeleted { col, cells, .. } => {
            let mut lines = vec![format!("Column {}: REMOVED", column_label(*col))];
            if verbose {
                lines.extend(cells.iter().map(|(row, value)| {
                    format!("  {} = {}", index_to_address(*row, *col), format_cell_value(value))
                }));
            }
            lines
        }
        ChangeRecord::ValueChanged {
            row,
            col,
            source_row,
            source_col,
            from,
            to,
            ..
        } => {
            let mut line = format!(
                "Cell {}: {} -> {}",
                index_to_address(*row, *col),
                format_cell_value(from),
                format_cell_value(to)
            );
            if verbose && (row, col) != (source_row, source_col) {
                line.push_str(&format!(" (was {})", index_to_address(*source_row, *source_col)));
            }
            vec![line]
        }
        other => vec![format!("{} change", other.kind())],
    }
}

fn format_cell_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => "<empty>".to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(text) => format!("\"{}\"", escape_string(text)),
        CellValue::Bool(true) => "TRUE".to_string(),
        CellValue::Bool(false) => "FALSE".to_string(),
        CellValue::Error(code) => code.clone(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        let s = format!("{:.10}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .replace('"', "\\\"")
}

fn write_summary<W: Write>(w: &mut W, report: &DiffReport, verbosity: Verbosity) -> Result<()> {
    if verbosity == Verbosity::Quiet && report.records.is_empty() && !report.is_partial() {
        return Ok(());
    }

    writeln!(w, "---")?;
    writeln!(w, "Summary:")?;
    writeln!(w, "  Total changes: {}", report.records.len())?;

    let counts = count_records(report);
    if counts.sheets > 0 {
        writeln!(w, "  Sheet changes: {}", counts.sheets)?;
    }
    if counts.rows > 0 {
        writeln!(w, "  Row changes: {}", counts.rows)?;
    }
    if counts.cols > 0 {
        writeln!(w, "  Column changes: {}", counts.cols)?;
    }
    if counts.cells > 0 {
        writeln!(w, "  Cell edits: {}", counts.cells)?;
    }
    if !report.failures.is_empty() {
        writeln!(w, "  Sheets not compared: {}", report.failures.len())?;
    }

    if report.is_partial() {
        writeln!(w, "  Status: PARTIAL (see warnings)")?;
    } else {
        writeln!(w, "  Status: complete")?;
    }

    Ok(())
}

#[derive(Default)]
struct RecordCounts {
    sheets: usize,
    rows: usize,
    cols: usize,
    cells: usize,
}

fn count_records(report: &DiffReport) -> RecordCounts {
    let mut counts = RecordCounts::default();
    for record in &report.records {
        match record {
            ChangeRecord::SheetAdded { .. } | ChangeRecord::SheetRemoved { .. } => counts.sheets += 1,
            ChangeRecord::RowInserted { .. } | ChangeRecord::RowDeleted { .. } => counts.rows += 1,
            ChangeRecord::ColumnInserted { .. } | ChangeRecord::ColumnDeleted { .. } => {
                counts.cols += 1
            }
            ChangeRecord::ValueChanged { .. } => counts.cells += 1,
            _ => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(report: &DiffReport, verbosity: Verbosity) -> String {
        let mut out = Vec::new();
        write_text_report(&mut out, report, verbosity).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_report_says_so() {
        let out = render(&DiffReport::default(), Verbosity::Normal);
        assert!(out.starts_with("No differences found."));
        assert!(out.contains("Status: complete"));
    }

    #[test]
    fn records_are_grouped_by_sheet_with_a1_addresses() {
        let report = DiffReport::new(vec![
            ChangeRecord::ValueChanged {
                sheet: "People".into(),
                row: 2,
                col: 1,
                source_row: 3,
                source_col: 1,
                from: CellValue::Text("Bob".into()),
                to: CellValue::Text("Robert".into()),
            },
            ChangeRecord::ColumnDeleted {
                sheet: "People".into(),
                col: 27,
                cells: vec![],
            },
            ChangeRecord::SheetAdded {
                sheet: "New".into(),
            },
        ]);

        let out = render(&report, Verbosity::Verbose);

        assert!(out.contains("Sheet \"People\":\n  Cell B3: \"Bob\" -> \"Robert\" (was B4)\n"));
        assert!(out.contains("  Column AB: REMOVED"));
        assert!(out.contains("Sheet \"New\":\n  Sheet ADDED"));
        assert!(out.contains("Cell edits: 1"));
    }

    #[test]
    fn quiet_mode_prints_only_the_summary() {
        let report = DiffReport::new(vec![ChangeRecord::RowInserted {
            sheet: "S".into(),
            row: 4,
            cells: vec![(0, CellValue::Number(2.5))],
        }]);
        let out = render(&report, Verbosity::Quiet);
        assert!(!out.contains("Row 5"));
        assert!(out.contains("Row changes: 1"));
    }

    #[test]
    fn numbers_render_without_trailing_zeros() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.50), "2.5");
        assert_eq!(format_cell_value(&CellValue::Bool(false)), "FALSE");
    }
}
