use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn excel_checker_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_excel-checker"))
}

fn run(args: &[&str]) -> Output {
    excel_checker_cmd()
        .args(args)
        .env_remove("EXCEL_CHECKER_LOG")
        .output()
        .expect("failed to run excel-checker")
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

/// Write `old` and `new` under the same file name in sibling directories, so
/// their sheets pair up by name.
fn write_pair(dir: &TempDir, name: &str, old: &str, new: &str) -> (String, String) {
    let mut paths = Vec::new();
    for (side, contents) in [("old", old), ("new", new)] {
        let side_dir = dir.path().join(side);
        std::fs::create_dir_all(&side_dir).unwrap();
        let path = side_dir.join(name);
        std::fs::write(&path, contents).unwrap();
        paths.push(path.to_string_lossy().into_owned());
    }
    let new_path = paths.pop().unwrap();
    (paths.pop().unwrap(), new_path)
}

/// A one-sheet package with inline-string cells, one row per line.
fn write_xlsx(dir: &Path, name: &str, sheet: &str, rows: &[&[&str]]) -> PathBuf {
    let mut data = String::new();
    for (r, row) in rows.iter().enumerate() {
        data.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let col = (b'A' + c as u8) as char;
            data.push_str(&format!(
                r#"<c r="{col}{}" t="inlineStr"><is><t>{value}</t></is></c>"#,
                r + 1
            ));
        }
        data.push_str("</row>");
    }
    let parts = [
        ("[Content_Types].xml", "<Types/>".to_string()),
        (
            "xl/workbook.xml",
            format!(r#"<workbook><sheets><sheet name="{sheet}" sheetId="1"/></sheets></workbook>"#),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!("<worksheet><sheetData>{data}</sheetData></worksheet>"),
        ),
    ];

    let path = dir.join(name);
    let mut writer = ZipWriter::new(std::fs::File::create(&path).unwrap());
    for (part, body) in parts {
        writer.start_file(part, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

const PEOPLE_OLD: &str = "id,name\n1,Alice\n2,Bob\n";
const PEOPLE_NEW: &str = "id,name\n1,Alice\n2,Robert\n";

#[test]
fn identical_files_exit_0() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = write_pair(&dir, "people.csv", PEOPLE_OLD, PEOPLE_OLD);

    let output = run(&["diff", &a, &b]);

    assert!(
        output.status.success(),
        "identical files should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("No differences found."));
}

#[test]
fn different_files_exit_1_with_text_report() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = write_pair(&dir, "people.csv", PEOPLE_OLD, PEOPLE_NEW);

    let output = run(&["diff", "--keys", "A", &a, &b]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sheet \"people\":"), "{stdout}");
    assert!(stdout.contains("Cell B3: \"Bob\" -> \"Robert\""), "{stdout}");
    assert!(stdout.contains("Cell edits: 1"), "{stdout}");
}

#[test]
fn json_output_is_a_versioned_report() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_xlsx(dir.path(), "a.xlsx", "People", &[&["id", "name"], &["1", "Alice"], &["2", "Bob"]]);
    let b = write_xlsx(dir.path(), "b.xlsx", "People", &[&["id", "name"], &["1", "Alice"], &["2", "Robert"]]);

    let output = run(&[
        "diff",
        "--format",
        "json",
        "--keys",
        "0",
        a.to_str().unwrap(),
        b.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["version"], "1");
    let records = report["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "ValueChanged");
    assert_eq!(records[0]["sheet"], "People");
    assert_eq!(records[0]["to"]["value"], "Robert");
}

#[test]
fn jsonl_output_has_header_records_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = write_pair(
        &dir,
        "rows.csv",
        "a,1,x\nb,2,y\nc,3,z\n",
        "a,1,x\nnew,9,q\nb,2,y\nc,3,z\n",
    );

    let output = run(&["diff", "--format", "jsonl", &a, &b]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect();
    let kinds: Vec<&str> = lines.iter().map(|l| l["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["Header", "RowInserted", "Summary"]);
    assert_eq!(lines[1]["row"], 1);
    assert_eq!(lines[2]["record_count"], 1);
}

#[test]
fn missing_workbook_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(&dir, "a.csv", PEOPLE_OLD);
    let missing = dir.path().join("nope.xlsx");

    let output = run(&["diff", &a, missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: Failed to load new workbook"), "{stderr}");
}

#[test]
fn non_workbook_input_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(&dir, "a.xlsx", "definitely not a zip");

    let output = run(&["info", &a]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unreadable workbook"));
}

#[test]
fn invalid_threshold_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(&dir, "a.csv", PEOPLE_OLD);

    let output = run(&["diff", "--similarity", "1.5", &a, &a]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn conflicting_presets_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(&dir, "a.csv", PEOPLE_OLD);

    let output = run(&["diff", "--fast", "--precise", &a, &a]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--fast and --precise"));
}

#[test]
fn config_file_values_are_overridden_by_flags() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        &dir,
        "config.json",
        r#"{"max_align_cells": 4, "on_limit_exceeded": "return_error"}"#,
    );
    let (a, b) = write_pair(&dir, "people.csv", PEOPLE_OLD, PEOPLE_NEW);

    let strict = run(&["diff", "--config", &config, "--keys", "A", &a, &b]);
    assert_eq!(strict.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&strict.stdout).contains("Cell B3"));

    let partial = run(&["diff", "--config", &config, &a, &b]);
    assert_eq!(partial.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&partial.stderr);
    assert!(stderr.contains("Warning: sheet 'people' not compared"), "{stderr}");
}

#[test]
fn oversized_sheet_falls_back_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = write_pair(&dir, "data.csv", "1\n2\n3\n4\n", "1\n2\n3\n4\n");

    let output = run(&[
        "diff",
        "--max-align-cells",
        "4",
        "--on-limit",
        "positional",
        &a,
        &b,
    ]);

    assert_eq!(output.status.code(), Some(1), "partial runs exit 1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Warning: Sheet 'data': "), "{stderr}");
}

#[test]
fn cross_sheet_mode_compares_named_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_xlsx(dir.path(), "a.xlsx", "Jan", &[&["x", "1"], &["y", "2"]]);
    let b = write_xlsx(dir.path(), "b.xlsx", "Feb", &[&["x", "1"], &["y", "2"]]);
    let (a, b) = (a.to_str().unwrap(), b.to_str().unwrap());

    let same = run(&["diff", "--sheet", "jan", "--against-sheet", "FEB", a, b]);
    assert_eq!(same.status.code(), Some(0));

    let missing = run(&["diff", "--sheet", "Jan", "--against-sheet", "Mar", a, b]);
    assert_eq!(missing.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Available sheets: Feb"));
}

#[test]
fn skip_sheet_and_normalized_text() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = write_pair(&dir, "notes.csv", "Total ,k\nx,y\n", "  Total,k\nx,y\n");

    assert_eq!(run(&["diff", &a, &b]).status.code(), Some(1));
    assert_eq!(run(&["diff", "--normalize-text", &a, &b]).status.code(), Some(0));
    assert_eq!(run(&["diff", "--skip-sheet", "NOTES", &a, &b]).status.code(), Some(0));
}

#[test]
fn skip_cell_patterns_hide_volatile_text() {
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = write_pair(
        &dir,
        "report.csv",
        "name,value\nGenerated: Monday,x\na,1\n",
        "name,value\nGenerated: Tuesday,x\na,1\n",
    );

    assert_eq!(run(&["diff", &a, &b]).status.code(), Some(1));
    assert_eq!(run(&["diff", "--skip-cell", "Generated:", &a, &b]).status.code(), Some(0));

    let invalid = run(&["diff", "--skip-cell", "(", &a, &b]);
    assert_eq!(invalid.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&invalid.stderr).contains("skip_cell_patterns"));
}

#[test]
fn info_lists_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_xlsx(dir.path(), "book.xlsx", "Data", &[&["a", "b", "c"], &["d"]]);

    let output = run(&["info", path.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Workbook: book.xlsx"), "{stdout}");
    assert!(stdout.contains("Sheets: 1"));
    assert!(stdout.contains("\"Data\" 2x3, 4 cells (A1:C2)"), "{stdout}");
}
