//! A1-style addressing helpers.
//!
//! Grids are indexed zero-based internally; these helpers convert to and from
//! the spreadsheet-facing notation used in reports and on the command line.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell address '{input}'")]
pub struct AddressParseError {
    pub input: String,
}

/// Convert a zero-based column index to its letter label (`0 -> "A"`, `26 -> "AA"`).
pub fn column_label(col: u32) -> String {
    let mut remaining = col as u64 + 1;
    let mut label = Vec::new();
    while remaining > 0 {
        let rem = ((remaining - 1) % 26) as u8;
        label.push(b'A' + rem);
        remaining = (remaining - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Parse a column label such as `"C"` or `"ab"` into a zero-based index.
pub fn parse_column_label(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    Some(col - 1)
}

/// Parse a column given either as letters (`"C"`) or as a zero-based index
/// (`"2"`).
pub fn parse_column_ref(input: &str) -> Result<u32, AddressParseError> {
    let trimmed = input.trim();
    let parsed = if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        trimmed.parse::<u32>().ok()
    } else {
        parse_column_label(trimmed)
    };
    parsed.ok_or_else(|| AddressParseError {
        input: input.to_string(),
    })
}

/// Convert zero-based (row, col) indices to an A1 address string.
pub fn index_to_address(row: u32, col: u32) -> String {
    format!("{}{}", column_label(col), row as u64 + 1)
}

/// Parse an A1 address into zero-based (row, col) indices.
/// Returns `None` for malformed addresses. `$` anchors are accepted and ignored.
pub fn address_to_index(a1: &str) -> Option<(u32, u32)> {
    let cleaned: String = a1.chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    if letters.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let col = parse_column_label(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}
