//! Excel Open XML workbook reading.
//!
//! Turns an opened [`OpcContainer`] into a [`Workbook`]: one [`Sheet`] per
//! `<sheet>` entry of `workbook.xml`, in workbook order.

use std::collections::HashMap;

use tracing::debug;

use crate::container::{ContainerError, OpcContainer};
use crate::grid_parser::{
    GridParseError, NumberFormats, parse_relationships, parse_shared_strings, parse_sheet_xml,
    parse_styles, parse_workbook_xml, resolve_sheet_target,
};
use crate::source::LoadError;
use crate::workbook::{Sheet, Workbook};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

fn unreadable_part(part: &str, err: GridParseError) -> LoadError {
    LoadError::UnreadableWorkbook {
        reason: format!("{part}: {err}"),
    }
}

pub(crate) fn open_workbook_from_container(
    container: &mut OpcContainer,
) -> Result<Workbook, LoadError> {
    let shared_strings = match container.read_optional_part(SHARED_STRINGS_PART)? {
        Some(bytes) => {
            parse_shared_strings(&bytes).map_err(|e| unreadable_part(SHARED_STRINGS_PART, e))?
        }
        None => Vec::new(),
    };

    let formats = match container.read_optional_part(STYLES_PART)? {
        Some(bytes) => parse_styles(&bytes).map_err(|e| unreadable_part(STYLES_PART, e))?,
        None => NumberFormats::default(),
    };

    let workbook_bytes = container.read_part(WORKBOOK_PART).map_err(|err| match err {
        ContainerError::MissingPart { .. } => LoadError::UnreadableWorkbook {
            reason: format!("missing {WORKBOOK_PART}"),
        },
        other => other.into(),
    })?;
    let entries =
        parse_workbook_xml(&workbook_bytes).map_err(|e| unreadable_part(WORKBOOK_PART, e))?;

    let relationships = match container.read_optional_part(WORKBOOK_RELS_PART)? {
        Some(bytes) => {
            parse_relationships(&bytes).map_err(|e| unreadable_part(WORKBOOK_RELS_PART, e))?
        }
        None => HashMap::new(),
    };

    let mut sheets = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let target = resolve_sheet_target(entry, &relationships, position);
        let bytes = container.read_part(&target).map_err(|err| match err {
            ContainerError::MissingPart { part } => LoadError::UnreadableWorkbook {
                reason: format!("worksheet part '{part}' for sheet '{}' is missing", entry.name),
            },
            other => other.into(),
        })?;
        let grid = parse_sheet_xml(&bytes, &shared_strings, &formats).map_err(|err| {
            LoadError::CorruptSheet {
                sheet: entry.name.clone(),
                detail: err.to_string(),
            }
        })?;
        debug!(
            sheet = %entry.name,
            part = %target,
            rows = grid.nrows,
            cols = grid.ncols,
            cells = grid.cell_count(),
            "parsed worksheet"
        );
        sheets.push(Sheet::new(entry.name.clone(), grid));
    }

    Ok(Workbook::new(sheets))
}
