use anyhow::Result;
use excel_checker::{DiffReport, serialize_diff_report_pretty};
use std::io::Write;

pub fn write_json_report<W: Write>(w: &mut W, report: &DiffReport) -> Result<()> {
    let json = serialize_diff_report_pretty(report)?;
    writeln!(w, "{json}")?;
    Ok(())
}
