//! Utilities for parsing, formatting, and translating Excel-style cell
//! references.
//!
//! Addresses are 1-indexed: `A1` is row 1, column 1. Column letters are
//! bijective base-26 (A=1 … Z=26, AA=27 …), so every valid (row, col) pair
//! round-trips exactly through its A1 string form.

use crate::error::{Result, XlcellsError};
use serde::Serialize;

/// Highest row an XLSX worksheet can address.
pub const MAX_ROWS: u32 = 1_048_576;
/// Highest column an XLSX worksheet can address (XFD).
pub const MAX_COLUMNS: u32 = 16_384;

/// A sheet-scoped cell position, 1-indexed in both dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    /// Build an address from 1-indexed row and column.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for CellAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_address(*self))
    }
}

/// Parse a cell reference like "A1" or "$B$10" into a [`CellAddress`].
///
/// The accepted shape is strict: an optional `$`, a column letter run, an
/// optional `$`, then a row digit run, with nothing else before or after.
/// Anything else fails with [`XlcellsError::MalformedAddress`].
pub fn parse_address(text: &str) -> Result<CellAddress> {
    parse_address_bytes(text.as_bytes())
        .ok_or_else(|| XlcellsError::MalformedAddress(text.to_string()))
}

/// Parse a cell reference from raw bytes (ASCII).
///
/// This is the bytes equivalent of [`parse_address`] for use when working
/// with raw XML attribute values (e.g., `attr.value` from quick-xml).
#[must_use]
pub fn parse_address_bytes(text: &[u8]) -> Option<CellAddress> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;
    let mut i = 0;

    if text.first() == Some(&b'$') {
        i += 1;
    }
    while let Some(&b) = text.get(i) {
        if !b.is_ascii_alphabetic() {
            break;
        }
        let upper = b.to_ascii_uppercase();
        col = col.checked_mul(26)?.checked_add(u32::from(upper - b'A') + 1)?;
        saw_col = true;
        i += 1;
    }
    if text.get(i) == Some(&b'$') {
        i += 1;
    }
    while let Some(&b) = text.get(i) {
        if !b.is_ascii_digit() {
            return None;
        }
        row = row
            .checked_mul(10)?
            .checked_add(u32::from(b - b'0'))?;
        saw_row = true;
        i += 1;
    }

    if !saw_col || !saw_row || row == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
        return None;
    }

    Some(CellAddress { row, col })
}

/// Format a [`CellAddress`] back into its A1 string form.
///
/// Exact inverse of [`parse_address`] for every in-bounds address.
#[must_use]
pub fn format_address(address: CellAddress) -> String {
    let mut out = column_letters(address.col);
    out.push_str(&address.row.to_string());
    out
}

/// Convert a 1-indexed column number to its bijective base-26 letter run.
#[must_use]
pub fn column_letters(col: u32) -> String {
    let mut letters = Vec::with_capacity(3);
    let mut num = col;
    while num > 0 {
        let digit = u8::try_from((num - 1) % 26).unwrap_or(0);
        letters.push(b'A' + digit);
        num = (num - 1) / 26;
    }
    letters.reverse();
    letters.into_iter().map(char::from).collect()
}

/// One component of an A1 reference: its value and whether it carried a `$`.
struct RefComponent {
    absolute: bool,
    value: u32,
}

/// Translate a single A1 reference by a row/column delta.
///
/// `$` markers make a component absolute: absolute components are copied
/// unchanged, relative components shift by the delta. A reference with both
/// row and column absolute is returned unchanged. If the reference does not
/// parse, or the shift would leave the sheet, the text is returned verbatim.
#[must_use]
pub fn translate_reference(reference: &str, delta_row: i64, delta_col: i64) -> String {
    let Some((col, row)) = split_reference(reference) else {
        return reference.to_string();
    };

    if col.absolute && row.absolute {
        return reference.to_string();
    }

    let new_col = if col.absolute {
        i64::from(col.value)
    } else {
        i64::from(col.value) + delta_col
    };
    let new_row = if row.absolute {
        i64::from(row.value)
    } else {
        i64::from(row.value) + delta_row
    };

    if new_col < 1 || new_row < 1 || new_col > i64::from(MAX_COLUMNS) || new_row > i64::from(MAX_ROWS)
    {
        return reference.to_string();
    }

    let (Ok(new_col), Ok(new_row)) = (u32::try_from(new_col), u32::try_from(new_row)) else {
        return reference.to_string();
    };

    let mut out = String::new();
    if col.absolute {
        out.push('$');
    }
    out.push_str(&column_letters(new_col));
    if row.absolute {
        out.push('$');
    }
    out.push_str(&new_row.to_string());
    out
}

/// Split an A1 reference into its column and row components, tracking `$`.
fn split_reference(reference: &str) -> Option<(RefComponent, RefComponent)> {
    let bytes = reference.as_bytes();
    let mut i = 0;

    let col_absolute = bytes.first() == Some(&b'$');
    if col_absolute {
        i += 1;
    }
    let col_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
        i += 1;
    }
    if i == col_start {
        return None;
    }
    let mut col: u32 = 0;
    for &b in bytes.get(col_start..i)? {
        col = col
            .checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A') + 1)?;
    }

    let row_absolute = bytes.get(i) == Some(&b'$');
    if row_absolute {
        i += 1;
    }
    let row_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    if i == row_start || i != bytes.len() {
        return None;
    }
    let mut row: u32 = 0;
    for &b in bytes.get(row_start..i)? {
        row = row.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }

    if row == 0 || row > MAX_ROWS || col == 0 || col > MAX_COLUMNS {
        return None;
    }

    Some((
        RefComponent {
            absolute: col_absolute,
            value: col,
        },
        RefComponent {
            absolute: row_absolute,
            value: row,
        },
    ))
}

/// Parse a range like "A1:B10" or "A1" into its corner addresses.
///
/// A single-cell range collapses both corners onto the same address.
pub fn parse_range(range: &str) -> Result<(CellAddress, CellAddress)> {
    if let Some((start, end)) = range.split_once(':') {
        Ok((parse_address(start)?, parse_address(end)?))
    } else {
        let single = parse_address(range)?;
        Ok((single, single))
    }
}
