//! xlcells - flat, typed cell extraction from XLSX workbooks
//!
//! Extracts every cell of a workbook into one record per cell — no
//! rectangularization — exposing:
//! - the raw content and the inferred canonical value (error, logical,
//!   numeric, date, character, or blank), with Excel-faithful serial-date
//!   decoding for both the 1900 and 1904 systems
//! - resolved formula text, with shared formula groups translated per
//!   member and array formulas propagated verbatim
//! - comments, row/column dimensions, and the two-tier style/local format
//!   indices
//!
//! Cell-level fidelity is the point: mixed types per column and multiple
//! tables per sheet survive extraction intact.
//!
//! # Usage
//!
//! ```no_run
//! let data = std::fs::read("report.xlsx")?;
//! let workbook = xlcells::extract(&data)?;
//! for sheet in &workbook.sheets {
//!     for record in &sheet.records {
//!         println!("{}!{} = {:?}", record.sheet, record.address, record.value);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cell_ref;
pub mod comments;
pub mod error;
pub mod formula;
pub mod numfmt;
pub mod parser;
pub mod types;
pub mod value;

pub use cell_ref::CellAddress;
pub use error::{Diagnostic, Result, XlcellsError};
pub use formula::{FormulaInfo, FormulaKind};
pub use numfmt::DateSystem;
pub use parser::{extract, extract_with};
pub use types::{CellRecord, SheetCells, SheetSelector, WorkbookCells};
pub use value::{CellValue, DateTimeValue};

/// Extract every sheet of the workbook at `path`.
///
/// # Errors
/// Fails when the file cannot be read, is not a readable archive, or has
/// no workbook part.
pub fn extract_path(path: impl AsRef<std::path::Path>) -> Result<WorkbookCells> {
    let data = std::fs::read(path)?;
    extract(&data)
}

/// Get the library version.
#[must_use]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
