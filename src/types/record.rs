//! The per-cell output record.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::cell_ref::{format_address, CellAddress};
use crate::formula::{FormulaInfo, FormulaKind};
use crate::value::{CellValue, TypeCode};

/// One extracted cell: one row of the flat output, constructed once by the
/// sheet pass and never mutated afterward.
///
/// Serializes to the fixed column contract expected by downstream
/// consumers: `sheet, address, row, col, content, formula, formula_type,
/// formula_ref, formula_group, type, data_type, error, logical, numeric,
/// date, character, comment, height, width, style_format, local_format_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub sheet: String,
    pub address: CellAddress,
    /// Raw pre-inference content as read from the file; absent for empty
    /// cells. A missing shared-string index keeps the raw index here.
    pub content: Option<String>,
    pub formula: Option<FormulaInfo>,
    /// Raw Excel type letter; absent for implicit numeric cells.
    pub type_code: TypeCode,
    pub value: CellValue,
    pub comment: Option<String>,
    /// Row height in points (sheet default when the row declares none).
    pub height: f64,
    /// Column width in character units (sheet default when undeclared).
    pub width: f64,
    /// Style-level format id; the workbook default style (0) when unset.
    pub style_format: u32,
    /// Cell-level format override; absent when none exists.
    pub local_format_id: Option<u32>,
}

impl Serialize for CellRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("sheet", &self.sheet)?;
        map.serialize_entry("address", &format_address(self.address))?;
        map.serialize_entry("row", &self.address.row)?;
        map.serialize_entry("col", &self.address.col)?;
        if let Some(content) = &self.content {
            map.serialize_entry("content", content)?;
        }
        if let Some(formula) = &self.formula {
            map.serialize_entry("formula", &formula.text)?;
            // Shared membership is implied by formula_group presence; only
            // array formulas are called out explicitly.
            if formula.kind == FormulaKind::Array {
                map.serialize_entry("formula_type", "array")?;
            }
            if let Some(ref_text) = formula.ref_text() {
                map.serialize_entry("formula_ref", &ref_text)?;
            }
            if let Some(group) = formula.group_id {
                map.serialize_entry("formula_group", &group)?;
            }
        }
        if let Some(letter) = self.type_code.as_letter() {
            map.serialize_entry("type", letter)?;
        }
        // data_type plus exactly one matching value column.
        match &self.value {
            CellValue::Error(code) => {
                map.serialize_entry("data_type", "error")?;
                map.serialize_entry("error", code)?;
            }
            CellValue::Logical(flag) => {
                map.serialize_entry("data_type", "logical")?;
                map.serialize_entry("logical", flag)?;
            }
            CellValue::Numeric(num) => {
                map.serialize_entry("data_type", "numeric")?;
                map.serialize_entry("numeric", num)?;
            }
            CellValue::Date(date) => {
                map.serialize_entry("data_type", "date")?;
                map.serialize_entry("date", date)?;
            }
            CellValue::Character(text) => {
                map.serialize_entry("data_type", "character")?;
                map.serialize_entry("character", text)?;
            }
            CellValue::Blank => {
                map.serialize_entry("data_type", "blank")?;
            }
        }
        if let Some(comment) = &self.comment {
            map.serialize_entry("comment", comment)?;
        }
        map.serialize_entry("height", &self.height)?;
        map.serialize_entry("width", &self.width)?;
        map.serialize_entry("style_format", &self.style_format)?;
        if let Some(local) = self.local_format_id {
            map.serialize_entry("local_format_id", &local)?;
        }
        map.end()
    }
}
