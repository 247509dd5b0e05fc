//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use excel_checker::{CellValue, ChangeRecord, Grid, Sheet, Workbook};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Type a literal the way a CSV import would: "" is empty, numerals are
/// numbers, everything else is text.
pub fn value(raw: &str) -> CellValue {
    if raw.is_empty() {
        return CellValue::Empty;
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

pub fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

/// Every field stays text, which is what the row scenarios compare.
pub fn text_grid(rows: &[&[&str]]) -> Grid {
    Grid::from_rows(rows.iter().map(|row| {
        row.iter()
            .map(|s| if s.is_empty() { CellValue::Empty } else { text(s) })
            .collect::<Vec<_>>()
    }))
}

pub fn typed_grid(rows: &[&[&str]]) -> Grid {
    Grid::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|s| value(s)).collect::<Vec<_>>()),
    )
}

pub fn grid_from_numbers(values: &[&[i32]]) -> Grid {
    Grid::from_rows(values.iter().map(|row| {
        row.iter()
            .map(|&v| CellValue::Number(v as f64))
            .collect::<Vec<_>>()
    }))
}

pub fn single_sheet_workbook(name: &str, grid: Grid) -> Workbook {
    Workbook::new(vec![Sheet::new(name, grid)])
}

pub fn workbook(sheets: Vec<(&str, Grid)>) -> Workbook {
    Workbook::new(
        sheets
            .into_iter()
            .map(|(name, grid)| Sheet::new(name, grid))
            .collect(),
    )
}

pub fn count_kind(records: &[ChangeRecord], kind: &str) -> usize {
    records.iter().filter(|r| r.kind() == kind).count()
}

/// Rebuild the target grid from the source grid and the records of one
/// sheet pair. Matched rows and columns are recovered as the indices not
/// named by an insertion or deletion, paired in order.
pub fn apply_records(source: &Grid, target_rows: u32, target_cols: u32, records: &[ChangeRecord]) -> Grid {
    let mut deleted_rows = BTreeSet::new();
    let mut inserted_rows = BTreeSet::new();
    let mut deleted_cols = BTreeSet::new();
    let mut inserted_cols = BTreeSet::new();
    for record in records {
        match record {
            ChangeRecord::RowDeleted { row, .. } => {
                deleted_rows.insert(*row);
            }
            ChangeRecord::RowInserted { row, .. } => {
                inserted_rows.insert(*row);
            }
            ChangeRecord::ColumnDeleted { col, .. } => {
                deleted_cols.insert(*col);
            }
            ChangeRecord::ColumnInserted { col, .. } => {
                inserted_cols.insert(*col);
            }
            _ => {}
        }
    }

    let kept_rows: Vec<u32> = (0..source.nrows).filter(|r| !deleted_rows.contains(r)).collect();
    let kept_cols: Vec<u32> = (0..source.ncols).filter(|c| !deleted_cols.contains(c)).collect();
    let target_matched_rows: Vec<u32> = (0..target_rows).filter(|r| !inserted_rows.contains(r)).collect();
    let target_matched_cols: Vec<u32> = (0..target_cols).filter(|c| !inserted_cols.contains(c)).collect();
    assert_eq!(kept_rows.len(), target_matched_rows.len(), "row bookkeeping");
    assert_eq!(kept_cols.len(), target_matched_cols.len(), "column bookkeeping");

    let mut out = Grid::new(target_rows, target_cols);
    for (&ra, &rb) in kept_rows.iter().zip(&target_matched_rows) {
        for (&ca, &cb) in kept_cols.iter().zip(&target_matched_cols) {
            out.insert_cell(rb, cb, source.value(ra, ca).clone());
        }
    }
    for record in records {
        match record {
            ChangeRecord::RowInserted { row, cells, .. } => {
                for (col, v) in cells {
                    out.insert_cell(*row, *col, v.clone());
                }
            }
            ChangeRecord::ColumnInserted { col, cells, .. } => {
                for (row, v) in cells {
                    out.insert_cell(*row, *col, v.clone());
                }
            }
            ChangeRecord::ValueChanged { row, col, to, .. } => {
                out.insert_cell(*row, *col, to.clone());
            }
            _ => {}
        }
    }
    out
}

pub fn assert_same_values(actual: &Grid, expected: &Grid) {
    assert_eq!((actual.nrows, actual.ncols), (expected.nrows, expected.ncols));
    for row in 0..expected.nrows {
        for col in 0..expected.ncols {
            assert_eq!(
                actual.value(row, col),
                expected.value(row, col),
                "mismatch at ({row}, {col})"
            );
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn cell_xml(row: u32, col: u32, value: &CellValue) -> Option<String> {
    let address = excel_checker::index_to_address(row, col);
    match value {
        CellValue::Empty => None,
        CellValue::Number(n) => Some(format!(r#"<c r="{address}"><v>{n}</v></c>"#)),
        CellValue::Bool(b) => Some(format!(r#"<c r="{address}" t="b"><v>{}</v></c>"#, u8::from(*b))),
        CellValue::Text(s) => Some(format!(
            r#"<c r="{address}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            escape_xml(s)
        )),
        CellValue::Error(e) => Some(format!(r#"<c r="{address}" t="e"><v>{}</v></c>"#, escape_xml(e))),
    }
}

pub fn sheet_xml(grid: &Grid) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for row in 0..grid.nrows {
        let cells: String = (0..grid.ncols)
            .filter_map(|col| cell_xml(row, col, grid.value(row, col)))
            .collect();
        if !cells.is_empty() {
            xml.push_str(&format!(r#"<row r="{}">{cells}</row>"#, row + 1));
        }
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Parts of a minimal package for `workbook`, in archive order.
pub fn xlsx_parts(workbook: &Workbook) -> Vec<(String, String)> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut sheets_xml = String::new();
    let mut rels_xml = String::new();
    let mut parts = Vec::new();
    for (idx, sheet) in workbook.sheets.iter().enumerate() {
        let n = idx + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        sheets_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape_xml(&sheet.name)
        ));
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
        parts.push((format!("xl/worksheets/sheet{n}.xml"), sheet_xml(&sheet.grid)));
    }
    content_types.push_str("</Types>");

    let mut all = vec![
        ("[Content_Types].xml".to_string(), content_types),
        (
            "xl/workbook.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheets_xml}</sheets></workbook>"#
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels_xml}</Relationships>"#
            ),
        ),
    ];
    all.extend(parts);
    all
}

pub fn zip_parts(parts: &[(String, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in parts {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn xlsx_bytes(workbook: &Workbook) -> Vec<u8> {
    zip_parts(&xlsx_parts(workbook))
}

pub fn write_xlsx(dir: &Path, file_name: &str, workbook: &Workbook) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, xlsx_bytes(workbook)).unwrap();
    path
}
