use anyhow::{Context, Result};
use excel_checker::{Grid, column_label, load_workbook};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

pub fn run(path: &str) -> Result<ExitCode> {
    let workbook =
        load_workbook(path).with_context(|| format!("Failed to load workbook: {}", path))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let filename = Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| path.into());

    writeln!(handle, "Workbook: {}", filename)?;
    writeln!(handle, "Sheets: {}", workbook.sheets.len())?;

    for sheet in &workbook.sheets {
        writeln!(
            handle,
            "  - \"{}\" {}x{}, {} cells{}",
            sheet.name,
            sheet.grid.nrows,
            sheet.grid.ncols,
            sheet.grid.cell_count(),
            used_range(&sheet.grid)
        )?;
    }

    Ok(ExitCode::from(0))
}

fn used_range(grid: &Grid) -> String {
    if grid.nrows == 0 || grid.ncols == 0 {
        return String::new();
    }
    format!(" (A1:{}{})", column_label(grid.ncols - 1), grid.nrows)
}
