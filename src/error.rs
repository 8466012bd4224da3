//! Structured error types for xlcells.
//!
//! Fatal errors abort the call; cell-local failures degrade to a safe
//! default and are recorded as [`Diagnostic`] values on the workbook result.

use serde::Serialize;

/// All fatal errors that can occur while extracting a workbook.
#[derive(Debug, thiserror::Error)]
pub enum XlcellsError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error (the file is not a readable archive).
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Invalid A1-style cell reference.
    #[error("malformed cell address: {0}")]
    MalformedAddress(String),

    /// A requested sheet name or position does not exist in the workbook.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// A required workbook part is missing or unreadable.
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlcellsError>;

/// A non-fatal, cell-local degradation recorded on the workbook result.
///
/// Diagnostics never widen the per-cell record contract; they annotate the
/// overall result instead.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Diagnostic {
    /// Sheet the degradation occurred in.
    pub sheet: String,
    /// Cell address, when the degradation is attributable to one cell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Human-readable description of what was degraded and to what default.
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn cell(sheet: &str, address: &str, message: impl Into<String>) -> Self {
        Self {
            sheet: sheet.to_string(),
            address: Some(address.to_string()),
            message: message.into(),
        }
    }

    pub(crate) fn sheet(sheet: &str, message: impl Into<String>) -> Self {
        Self {
            sheet: sheet.to_string(),
            address: None,
            message: message.into(),
        }
    }
}
