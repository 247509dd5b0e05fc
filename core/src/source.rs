//! Workbook sources and loading.
//!
//! [`load_workbook`] accepts anything implementing [`WorkbookSource`]: file
//! paths, in-memory buffers, seekable readers, and CSV streams. The format is
//! sniffed from the content (ZIP magic for OOXML) or, for paths, from a
//! `.csv` extension.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::container::{ContainerError, ContainerLimits, OpcContainer};
use crate::error_codes;
use crate::excel_open_xml::open_workbook_from_container;
use crate::workbook::{CellValue, Grid, Sheet, Workbook};

const ZIP_MAGIC: &[u8; 2] = b"PK";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("unreadable workbook: {reason}")]
    UnreadableWorkbook { reason: String },
    #[error("corrupt sheet '{sheet}': {detail}")]
    CorruptSheet { sheet: String, detail: String },
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::UnreadableWorkbook { .. } => error_codes::LOAD_UNREADABLE_WORKBOOK,
            LoadError::CorruptSheet { .. } => error_codes::LOAD_CORRUPT_SHEET,
        }
    }

    fn unreadable(reason: impl Into<String>) -> LoadError {
        LoadError::UnreadableWorkbook {
            reason: reason.into(),
        }
    }
}

impl From<ContainerError> for LoadError {
    fn from(err: ContainerError) -> Self {
        LoadError::unreadable(err.to_string())
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::unreadable(err.to_string())
    }
}

/// Something a [`Workbook`] can be loaded from.
pub trait WorkbookSource {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError>;
}

/// Load a workbook with the default container limits.
pub fn load_workbook(source: impl WorkbookSource) -> Result<Workbook, LoadError> {
    source.load(&ContainerLimits::default())
}

pub fn load_workbook_with_limits(
    source: impl WorkbookSource,
    limits: &ContainerLimits,
) -> Result<Workbook, LoadError> {
    source.load(limits)
}

/// A seekable stream holding an OOXML package.
#[derive(Debug)]
pub struct ReaderSource<R>(pub R);

/// A CSV stream, loaded as a workbook with a single sheet.
///
/// Fields are typed the way a spreadsheet application types them on import:
/// blank fields are empty, numeric fields become numbers, `TRUE`/`FALSE`
/// become booleans, and everything else stays text.
#[derive(Debug)]
pub struct CsvSource<R> {
    reader: R,
    sheet_name: String,
}

impl<R: Read> CsvSource<R> {
    pub fn new(reader: R, sheet_name: impl Into<String>) -> Self {
        CsvSource {
            reader,
            sheet_name: sheet_name.into(),
        }
    }
}

impl<R: Read> WorkbookSource for CsvSource<R> {
    fn load(self, _limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        let grid = read_csv_grid(self.reader)?;
        Ok(Workbook::new(vec![Sheet::new(self.sheet_name, grid)]))
    }
}

impl<R: Read + Seek + 'static> WorkbookSource for ReaderSource<R> {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        let mut reader = self.0;
        let mut magic = [0u8; 2];
        let read = read_prefix(&mut reader, &mut magic)?;
        reader.seek(SeekFrom::Start(0))?;
        if &magic[..read] != ZIP_MAGIC {
            return Err(LoadError::unreadable("not an OOXML package (no ZIP signature)"));
        }
        let mut container = OpcContainer::open_with_limits(reader, *limits)?;
        open_workbook_from_container(&mut container)
    }
}

impl WorkbookSource for Vec<u8> {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        ReaderSource(Cursor::new(self)).load(limits)
    }
}

impl WorkbookSource for &[u8] {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        self.to_vec().load(limits)
    }
}

impl WorkbookSource for &Path {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        let file = File::open(self).map_err(|err| {
            LoadError::unreadable(format!("cannot open {}: {err}", self.display()))
        })?;

        if has_csv_extension(self) {
            let sheet_name = self
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Sheet1".to_string());
            return CsvSource::new(file, sheet_name).load(limits);
        }

        ReaderSource(file).load(limits)
    }
}

impl WorkbookSource for PathBuf {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        self.as_path().load(limits)
    }
}

impl WorkbookSource for &PathBuf {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        self.as_path().load(limits)
    }
}

impl WorkbookSource for &str {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        Path::new(self).load(limits)
    }
}

impl WorkbookSource for String {
    fn load(self, limits: &ContainerLimits) -> Result<Workbook, LoadError> {
        Path::new(&self).load(limits)
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn read_prefix<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn read_csv_grid<R: Read>(reader: R) -> Result<Grid, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| LoadError::unreadable(format!("CSV: {err}")))?;
        rows.push(record.iter().map(csv_field_value).collect::<Vec<_>>());
    }
    Ok(Grid::from_rows(rows))
}

fn csv_field_value(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Bool(false);
    }
    if trimmed.bytes().any(|b| b.is_ascii_digit())
        && let Ok(n) = trimmed.parse::<f64>()
        && n.is_finite()
    {
        return CellValue::Number(n);
    }
    CellValue::Text(field.to_string())
}
