//! Main workbook extractor.
//!
//! Orchestrates one run: open the archive, build the workbook-level tables
//! (shared strings, formats, sheet list, date system), select sheets, and
//! stream each selected sheet into records. The tables are built once and
//! read-only afterwards; sheets are independent and a failed sheet never
//! disturbs its siblings.

mod relationships;
pub(crate) mod styles;
pub(crate) mod worksheet;

use std::io::Cursor;
use zip::ZipArchive;

use crate::error::{Diagnostic, Result, XlcellsError};
use crate::numfmt::DateSystem;
use crate::types::{SheetSelector, WorkbookCells};

use relationships::{list_sheets, parse_shared_strings, parse_workbook_relationships, SheetMeta};
use styles::FormatTables;
use worksheet::extract_sheet;

/// Read-only workbook context shared by every sheet pass.
pub(crate) struct SheetContext<'a> {
    pub shared_strings: &'a [String],
    pub formats: &'a FormatTables,
    pub date_system: DateSystem,
}

/// Record a non-fatal degradation and surface it through the log facade.
pub(crate) fn note(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    match &diagnostic.address {
        Some(address) => log::warn!(
            "{}!{}: {}",
            diagnostic.sheet,
            address,
            diagnostic.message
        ),
        None => log::warn!("{}: {}", diagnostic.sheet, diagnostic.message),
    }
    diagnostics.push(diagnostic);
}

/// Extract every sheet of an XLSX workbook.
pub fn extract(data: &[u8]) -> Result<WorkbookCells> {
    extract_with(data, &SheetSelector::All)
}

/// Extract the selected sheets of an XLSX workbook.
///
/// # Errors
/// Fails when the data is not a readable archive, the workbook part is
/// missing, or a requested sheet name/position does not exist. Per-sheet
/// corruption is NOT an error here: the affected sheet is flagged on the
/// result instead.
pub fn extract_with(data: &[u8], selector: &SheetSelector) -> Result<WorkbookCells> {
    let cursor = Cursor::new(data);
    let mut archive = ZipArchive::new(cursor)?;

    let relationships = parse_workbook_relationships(&mut archive);
    let (available, date_system) = list_sheets(&mut archive, &relationships)?;
    let shared_strings =
        parse_shared_strings(&mut archive, relationships.shared_strings.as_deref());
    let formats = FormatTables::parse(&mut archive, relationships.styles.as_deref());

    let selected = select_sheets(selector, &available)?;

    let ctx = SheetContext {
        shared_strings: &shared_strings,
        formats: &formats,
        date_system,
    };

    let mut diagnostics = Vec::new();
    let mut sheets = Vec::with_capacity(selected.len());
    for meta in &selected {
        let sheet = extract_sheet(&mut archive, meta, &ctx, &mut diagnostics);
        if let Some(reason) = &sheet.error {
            note(
                &mut diagnostics,
                Diagnostic::sheet(&sheet.name, format!("sheet failed: {reason}")),
            );
        }
        sheets.push(sheet);
    }

    Ok(WorkbookCells {
        date_system,
        sheets,
        diagnostics,
    })
}

/// Narrow the available sheets to the requested subset.
///
/// Names select in request order; positions are 1-based workbook order. An
/// unknown name or out-of-range position is fatal to the whole call.
fn select_sheets(selector: &SheetSelector, available: &[SheetMeta]) -> Result<Vec<SheetMeta>> {
    match selector {
        SheetSelector::All => Ok(available.to_vec()),
        SheetSelector::Names(names) => names
            .iter()
            .map(|name| {
                available
                    .iter()
                    .find(|meta| meta.name == *name)
                    .cloned()
                    .ok_or_else(|| XlcellsError::SheetNotFound(name.clone()))
            })
            .collect(),
        SheetSelector::Positions(positions) => positions
            .iter()
            .map(|&position| {
                position
                    .checked_sub(1)
                    .and_then(|idx| available.get(idx))
                    .cloned()
                    .ok_or_else(|| XlcellsError::SheetNotFound(format!("position {position}")))
            })
            .collect(),
    }
}
