//! XML parsing for Excel worksheet grids.
//!
//! Reads the parts of an OOXML package that carry cell data: shared strings,
//! `workbook.xml` and its relationships, `styles.xml` number formats, and each
//! worksheet. Only cached values are read; formulas are skipped.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::addressing::{address_to_index, index_to_address};
use crate::workbook::{Cell, CellValue, Grid};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GridParseError {
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("invalid cell address '{0}'")]
    InvalidAddress(String),
    #[error("shared string index {index} out of range ({len} strings)")]
    SharedStringOutOfRange { index: usize, len: usize },
    #[error("cell {address} lies outside the declared dimension {dimension}")]
    OutsideDimension { address: String, dimension: String },
    #[error("duplicate cell {address}")]
    DuplicateCell { address: String },
    #[error("cell {address} has invalid {kind} value '{raw}'")]
    InvalidValue {
        address: String,
        kind: &'static str,
        raw: String,
    },
}

/// A `<sheet>` entry of `workbook.xml`, in workbook order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub rel_id: Option<String>,
    pub sheet_id: Option<u32>,
}

/// Number-format codes addressed by cell style index (`s` attribute).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberFormats {
    custom: HashMap<u32, String>,
    xf_format_ids: Vec<u32>,
}

impl NumberFormats {
    /// Format code for a cell style, or `None` for the General format.
    pub fn for_style(&self, style: u32) -> Option<&str> {
        let id = *self.xf_format_ids.get(style as usize)?;
        if id == 0 {
            return None;
        }
        self.custom
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format(id))
    }
}

fn builtin_format(id: u32) -> Option<&'static str> {
    Some(match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

pub fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                strings.push(read_text_runs(&mut reader, b"si")?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Concatenate the `<t>` runs up to the closing `end` tag. Phonetic guides
/// (`<rPh>`) are not part of the cell text.
fn read_text_runs(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String, GridParseError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => phonetic_depth += 1,
            Event::End(e) if e.local_name().as_ref() == b"rPh" => {
                phonetic_depth = phonetic_depth.saturating_sub(1)
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let run = read_element_text(reader, &e)?;
                if phonetic_depth == 0 {
                    text.push_str(&run);
                }
            }
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => {
                return Err(GridParseError::Xml(format!(
                    "unexpected EOF inside <{}>",
                    String::from_utf8_lossy(end)
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn read_element_text(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<String, GridParseError> {
    let raw = reader.read_text(start.name()).map_err(xml_err)?;
    quick_xml::escape::unescape(&raw)
        .map(|text| text.into_owned())
        .map_err(|e| GridParseError::Xml(e.to_string()))
}

pub fn parse_workbook_xml(xml: &[u8]) -> Result<Vec<SheetEntry>, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name")?;
                let rel_id = attr(&e, b"r:id")?;
                let sheet_id = attr(&e, b"sheetId")?.and_then(|v| v.parse().ok());
                if let Some(name) = name {
                    sheets.push(SheetEntry {
                        name,
                        rel_id,
                        sheet_id,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Worksheet relationship targets keyed by relationship id.
pub fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let is_worksheet = attr(&e, b"Type")?
                    .is_some_and(|rel_type| rel_type.ends_with("/worksheet"));
                if let (true, Some(id), Some(target)) =
                    (is_worksheet, attr(&e, b"Id")?, attr(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// Part name of a worksheet. Falls back to the conventional
/// `xl/worksheets/sheetN.xml` when the relationship is missing.
pub fn resolve_sheet_target(
    sheet: &SheetEntry,
    relationships: &HashMap<String, String>,
    position: usize,
) -> String {
    let target = sheet
        .rel_id
        .as_ref()
        .and_then(|id| relationships.get(id))
        .cloned()
        .unwrap_or_else(|| {
            let n = sheet.sheet_id.unwrap_or(position as u32 + 1);
            format!("worksheets/sheet{n}.xml")
        });

    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if target.starts_with("xl/") => target,
        None => format!("xl/{target}"),
    }
}

pub fn parse_styles(xml: &[u8]) -> Result<NumberFormats, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut formats = NumberFormats::default();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"numFmt" => {
                let id = attr(&e, b"numFmtId")?.and_then(|v| v.parse::<u32>().ok());
                if let (Some(id), Some(code)) = (id, attr(&e, b"formatCode")?) {
                    formats.custom.insert(id, code);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) | Event::Empty(e)
                if in_cell_xfs && e.local_name().as_ref() == b"xf" =>
            {
                let id = attr(&e, b"numFmtId")?
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                formats.xf_format_ids.push(id);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(formats)
}

/// The rectangle declared by `<dimension ref="...">`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dimension {
    first_row: u32,
    first_col: u32,
    last_row: u32,
    last_col: u32,
}

impl Dimension {
    fn parse(reference: &str) -> Option<Dimension> {
        let (start, end) = reference.split_once(':').unwrap_or((reference, reference));
        let (first_row, first_col) = address_to_index(start)?;
        let (last_row, last_col) = address_to_index(end)?;
        if last_row < first_row || last_col < first_col {
            return None;
        }
        Some(Dimension {
            first_row,
            first_col,
            last_row,
            last_col,
        })
    }

    fn contains(&self, row: u32, col: u32) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            index_to_address(self.first_row, self.first_col),
            index_to_address(self.last_row, self.last_col)
        )
    }
}

/// Parse one worksheet into a grid. Row and column indices are kept exactly
/// as addressed in the part.
pub fn parse_sheet_xml(
    xml: &[u8],
    shared_strings: &[String],
    formats: &NumberFormats,
) -> Result<Grid, GridParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut dimension: Option<Dimension> = None;
    let mut cells: Vec<Cell> = Vec::new();
    let mut seen: FxHashSet<(u32, u32)> = FxHashSet::default();
    let mut cursor = CellCursor::default();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"dimension" => {
                if let Some(reference) = attr(&e, b"ref")? {
                    dimension = Some(
                        Dimension::parse(&reference)
                            .ok_or(GridParseError::InvalidAddress(reference))?,
                    );
                }
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                cursor.start_row(attr(&e, b"r")?.as_deref())?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let header = CellHeader::read(&e, &mut cursor)?;
                let content = read_cell_content(&mut reader)?;
                push_cell(header, Some(content), shared_strings, formats, &mut cells, &mut seen)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let header = CellHeader::read(&e, &mut cursor)?;
                push_cell(header, None, shared_strings, formats, &mut cells, &mut seen)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if cells.is_empty() {
        return Ok(Grid::new(0, 0));
    }

    let (nrows, ncols) = match dimension {
        Some(dim) => {
            if let Some(outside) = cells.iter().find(|c| !dim.contains(c.row, c.col)) {
                return Err(GridParseError::OutsideDimension {
                    address: index_to_address(outside.row, outside.col),
                    dimension: dim.to_string(),
                });
            }
            (dim.last_row + 1, dim.last_col + 1)
        }
        None => (
            cells.iter().map(|c| c.row + 1).max().unwrap_or(0),
            cells.iter().map(|c| c.col + 1).max().unwrap_or(0),
        ),
    };

    let mut grid = Grid::new(nrows, ncols);
    for cell in cells {
        let address = index_to_address(cell.row, cell.col);
        grid.try_insert(cell)
            .map_err(|_| GridParseError::DuplicateCell { address })?;
    }
    Ok(grid)
}

/// Tracks the implicit position of cells and rows that omit their `r`
/// attribute.
#[derive(Debug, Default)]
struct CellCursor {
    row: Option<u32>,
    next_col: u32,
}

impl CellCursor {
    fn start_row(&mut self, reference: Option<&str>) -> Result<(), GridParseError> {
        let row = match reference {
            Some(r) => r
                .parse::<u32>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| GridParseError::InvalidAddress(r.to_string()))?,
            None => match self.row {
                None => 0,
                Some(r) => r
                    .checked_add(1)
                    .filter(|&next| next < u32::MAX)
                    .ok_or_else(|| GridParseError::InvalidAddress(format!("row after {}", r as u64 + 1)))?,
            },
        };
        self.row = Some(row);
        self.next_col = 0;
        Ok(())
    }

    fn place(&mut self, reference: Option<&str>) -> Result<(u32, u32), GridParseError> {
        let (row, col) = match reference {
            Some(r) => address_to_index(r).ok_or_else(|| GridParseError::InvalidAddress(r.to_string()))?,
            None => (self.row.unwrap_or(0), self.next_col),
        };
        if col == u32::MAX {
            return Err(GridParseError::InvalidAddress(index_to_address(row, col)));
        }
        self.row = Some(row);
        self.next_col = col + 1;
        Ok((row, col))
    }
}

struct CellHeader {
    row: u32,
    col: u32,
    kind: Option<String>,
    style: Option<u32>,
}

impl CellHeader {
    fn read(start: &BytesStart<'_>, cursor: &mut CellCursor) -> Result<CellHeader, GridParseError> {
        let (row, col) = cursor.place(attr(start, b"r")?.as_deref())?;
        Ok(CellHeader {
            row,
            col,
            kind: attr(start, b"t")?,
            style: attr(start, b"s")?.and_then(|s| s.parse().ok()),
        })
    }
}

#[derive(Debug, Default)]
struct CellContent {
    value: Option<String>,
    inline: Option<String>,
}

fn read_cell_content(reader: &mut Reader<&[u8]>) -> Result<CellContent, GridParseError> {
    let mut buf = Vec::new();
    let mut content = CellContent::default();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"v" => {
                content.value = Some(read_element_text(reader, &e)?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"f" => {
                reader.read_to_end(e.name()).map_err(xml_err)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"is" => {
                content.inline = Some(read_text_runs(reader, b"is")?);
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => return Err(GridParseError::Xml("unexpected EOF inside cell".into())),
            _ => {}
        }
        buf.clear();
    }

    Ok(content)
}

fn push_cell(
    header: CellHeader,
    content: Option<CellContent>,
    shared_strings: &[String],
    formats: &NumberFormats,
    cells: &mut Vec<Cell>,
    seen: &mut FxHashSet<(u32, u32)>,
) -> Result<(), GridParseError> {
    if !seen.insert((header.row, header.col)) {
        return Err(GridParseError::DuplicateCell {
            address: index_to_address(header.row, header.col),
        });
    }

    let value = match content {
        Some(content) => convert_value(&header, content, shared_strings)?,
        None => CellValue::Empty,
    };
    let format = header
        .style
        .and_then(|s| formats.for_style(s))
        .map(str::to_string);

    if value.is_empty() && format.is_none() {
        return Ok(());
    }
    cells.push(Cell {
        row: header.row,
        col: header.col,
        value,
        format,
    });
    Ok(())
}

fn convert_value(
    header: &CellHeader,
    content: CellContent,
    shared_strings: &[String],
) -> Result<CellValue, GridParseError> {
    let invalid = |kind: &'static str, raw: &str| GridParseError::InvalidValue {
        address: index_to_address(header.row, header.col),
        kind,
        raw: raw.to_string(),
    };

    if let Some(text) = content.inline {
        return Ok(CellValue::Text(text));
    }
    let Some(raw) = content.value else {
        return Ok(CellValue::Empty);
    };

    match header.kind.as_deref() {
        Some("s") => {
            let index = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid("shared string index", &raw))?;
            shared_strings
                .get(index)
                .cloned()
                .map(CellValue::Text)
                .ok_or(GridParseError::SharedStringOutOfRange {
                    index,
                    len: shared_strings.len(),
                })
        }
        Some("str") | Some("inlineStr") | Some("d") => Ok(CellValue::Text(raw)),
        Some("b") => match raw.trim() {
            "1" | "true" => Ok(CellValue::Bool(true)),
            "0" | "false" => Ok(CellValue::Bool(false)),
            _ => Err(invalid("boolean", &raw)),
        },
        Some("e") => Ok(CellValue::Error(raw.trim().to_string())),
        _ => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(CellValue::Empty);
            }
            trimmed
                .parse::<f64>()
                .map(CellValue::Number)
                .map_err(|_| invalid("numeric", &raw))
        }
    }
}

fn attr(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, GridParseError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| GridParseError::Xml(e.to_string()))?;
        if attribute.key.as_ref() == key {
            let value = attribute.unescape_value().map_err(xml_err)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn xml_err(err: quick_xml::Error) -> GridParseError {
    GridParseError::Xml(err.to_string())
}
