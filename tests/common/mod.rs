//! Common test helpers for the extraction integration suites.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use xlcells::{CellRecord, WorkbookCells};

/// Extract a workbook built by the fixtures, panicking on fatal errors.
pub fn extract_ok(data: &[u8]) -> WorkbookCells {
    xlcells::extract(data).expect("extraction failed")
}

/// Find the record for one cell, panicking when it is absent.
pub fn find_record<'a>(workbook: &'a WorkbookCells, sheet: &str, address: &str) -> &'a CellRecord {
    try_find_record(workbook, sheet, address)
        .unwrap_or_else(|| panic!("no record for {sheet}!{address}"))
}

/// Find the record for one cell, if extracted.
pub fn try_find_record<'a>(
    workbook: &'a WorkbookCells,
    sheet: &str,
    address: &str,
) -> Option<&'a CellRecord> {
    workbook
        .sheets
        .iter()
        .find(|s| s.name == sheet)?
        .records
        .iter()
        .find(|record| record.address.to_string() == address)
}
