//! Workbook-level result types and sheet selection.

use serde::Serialize;

use super::record::CellRecord;
use crate::error::Diagnostic;
use crate::numfmt::DateSystem;

/// Which sheets to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// Every sheet, in workbook order.
    All,
    /// Sheets by name; an unknown name is fatal.
    Names(Vec<String>),
    /// Sheets by 1-based workbook position; an unknown position is fatal.
    Positions(Vec<usize>),
}

/// One sheet's extracted records.
///
/// A sheet that failed mid-pass keeps the records produced up to the
/// failure point and carries the reason in `error`; sibling sheets are
/// unaffected.
#[derive(Debug, Serialize)]
pub struct SheetCells {
    pub name: String,
    pub records: Vec<CellRecord>,
    /// Reason this sheet's pass aborted, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SheetCells {
    /// Whether the sheet's pass aborted before consuming every cell node.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// The full extraction result for one workbook.
#[derive(Debug, Serialize)]
pub struct WorkbookCells {
    /// Serial-date calendar system declared by the workbook.
    pub date_system: DateSystem,
    /// Selected sheets, in selection order.
    pub sheets: Vec<SheetCells>,
    /// Non-fatal, cell-local degradations recorded during the run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl WorkbookCells {
    /// Total number of records across all sheets.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.records.len()).sum()
    }
}
