use std::io::Write;

use serde::Serialize;

use crate::diff::{ChangeRecord, DiffError, DiffSummary};
use crate::sink::DiffSink;

#[derive(Serialize)]
struct JsonLinesHeader<'a> {
    kind: &'static str,
    version: &'a str,
}

#[derive(Serialize)]
struct JsonLinesSummary<'a> {
    kind: &'static str,
    #[serde(flatten)]
    summary: &'a DiffSummary,
}

fn sink_error(err: impl std::fmt::Display) -> DiffError {
    DiffError::SinkError {
        message: err.to_string(),
    }
}

/// Writes one JSON object per line: a `Header` line, then one line per
/// [`ChangeRecord`], and optionally a closing `Summary` line.
pub struct JsonLinesSink<W: Write> {
    w: W,
    wrote_header: bool,
    version: &'static str,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            wrote_header: false,
            version: crate::diff::DiffReport::SCHEMA_VERSION,
        }
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> Result<(), DiffError> {
        serde_json::to_writer(&mut self.w, value).map_err(sink_error)?;
        self.w.write_all(b"\n").map_err(sink_error)
    }

    pub fn write_summary(&mut self, summary: &DiffSummary) -> Result<(), DiffError> {
        self.write_line(&JsonLinesSummary {
            kind: "Summary",
            summary,
        })?;
        self.w.flush().map_err(sink_error)
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

impl<W: Write> DiffSink for JsonLinesSink<W> {
    fn begin(&mut self) -> Result<(), DiffError> {
        if self.wrote_header {
            return Ok(());
        }
        let header = JsonLinesHeader {
            kind: "Header",
            version: self.version,
        };
        self.write_line(&header)?;
        self.wrote_header = true;
        Ok(())
    }

    fn emit(&mut self, record: ChangeRecord) -> Result<(), DiffError> {
        self.write_line(&record)
    }

    fn finish(&mut self) -> Result<(), DiffError> {
        self.w.flush().map_err(sink_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::{CellValue, Grid, Sheet, Workbook};

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_header_records_and_summary() {
        let old = Workbook::new(vec![Sheet::new("A", Grid::new(0, 0))]);
        let new = Workbook::new(vec![Sheet::new(
            "B",
            Grid::from_rows(vec![vec![CellValue::Number(1.0)]]),
        )]);
        let mut sink = JsonLinesSink::new(Vec::new());
        let summary = crate::engine::diff_workbooks_streaming(
            &old,
            &new,
            &crate::config::DiffConfig::default(),
            &mut sink,
        )
        .unwrap();
        sink.write_summary(&summary).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["kind"], "Header");
        assert_eq!(lines[0]["version"], "1");
        assert_eq!(lines[1]["kind"], "SheetRemoved");
        assert_eq!(lines[2]["kind"], "SheetAdded");
        assert_eq!(lines[3]["kind"], "Summary");
        assert_eq!(lines[3]["record_count"], 2);
    }

    #[test]
    fn write_failures_become_sink_errors() {
        let mut sink = JsonLinesSink::new(BrokenPipe);
        let err = sink.begin().unwrap_err();
        assert_eq!(err.code(), crate::error_codes::DIFF_SINK_ERROR);
    }
}
