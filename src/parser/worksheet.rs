//! Worksheet extraction - streams one sheet's cell nodes into records.
//!
//! A single pass in document order. Formula-group registration is strictly
//! order-dependent (anchor before dependents), so the pass is sequential;
//! members seen before their anchor are buffered and patched in a finishing
//! pass once the sheet's cells are exhausted.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::cell_ref::{format_address, parse_address_bytes, parse_range, CellAddress};
use crate::comments::parse_comments;
use crate::error::Diagnostic;
use crate::formula::{FormulaGroup, FormulaInfo, FormulaKind, GroupArena, GroupKind, PendingRef};
use crate::types::{CellRecord, SheetCells};
use crate::value::{infer_value, parse_type_code, TypeCode};

use super::relationships::SheetMeta;
use super::{note, SheetContext};

/// Standard row height in points when the sheet declares none.
const DEFAULT_ROW_HEIGHT: f64 = 15.0;
/// Standard column width in character units when the sheet declares none.
const DEFAULT_COL_WIDTH: f64 = 8.43;

pub(crate) fn parse_u32_bytes(value: &[u8]) -> Option<u32> {
    let mut num: u32 = 0;
    let mut seen = false;
    for &b in value {
        if !b.is_ascii_digit() {
            return None;
        }
        seen = true;
        num = num.saturating_mul(10).saturating_add(u32::from(b - b'0'));
    }
    seen.then_some(num)
}

fn parse_f64_bytes(value: &[u8]) -> Option<f64> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok())
}

/// The `<f>` element of a cell as read: attributes plus the stored text.
#[derive(Debug, Default)]
struct RawFormula {
    text: String,
    is_shared: bool,
    is_array: bool,
    si: Option<u32>,
    ref_range: Option<(CellAddress, CellAddress)>,
}

/// Row/column dimension tables accumulated while streaming the sheet.
#[derive(Debug)]
struct Dimensions {
    default_row_height: f64,
    default_col_width: f64,
    /// Explicit heights keyed by 1-based row number.
    row_heights: Vec<(u32, f64)>,
    /// Explicit widths as (min, max, width) column spans, 1-based inclusive.
    col_widths: Vec<(u32, u32, f64)>,
}

impl Dimensions {
    fn new() -> Self {
        Self {
            default_row_height: DEFAULT_ROW_HEIGHT,
            default_col_width: DEFAULT_COL_WIDTH,
            row_heights: Vec::new(),
            col_widths: Vec::new(),
        }
    }

    fn height(&self, row: u32) -> f64 {
        self.row_heights
            .iter()
            .find(|&&(r, _)| r == row)
            .map_or(self.default_row_height, |&(_, h)| h)
    }

    fn width(&self, col: u32) -> f64 {
        self.col_widths
            .iter()
            .find(|&&(min, max, _)| col >= min && col <= max)
            .map_or(self.default_col_width, |&(_, _, w)| w)
    }
}

/// Extract every cell of one sheet, in document order.
///
/// Never propagates an error: structural corruption aborts this sheet only,
/// keeping the records produced so far and flagging the sheet as failed so
/// sibling sheets proceed unaffected.
pub(super) fn extract_sheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    meta: &SheetMeta,
    ctx: &SheetContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> SheetCells {
    let comments = meta
        .comments_path
        .as_deref()
        .map(|path| parse_comments(archive, path))
        .unwrap_or_default();

    let file = match archive.by_name(&meta.path) {
        Ok(file) => file,
        Err(err) => {
            return SheetCells {
                name: meta.name.clone(),
                records: Vec::new(),
                error: Some(format!("worksheet part {} unreadable: {err}", meta.path)),
            };
        }
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut records: Vec<CellRecord> = Vec::new();
    let mut arena = GroupArena::new();
    let mut dims = Dimensions::new();
    let mut sheet_error: Option<String> = None;

    let mut buf = Vec::new();
    let mut cell_buf = Vec::new();
    let mut text_buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(_) | Event::Empty(_))) => {
                let (Event::Start(ref e) | Event::Empty(ref e)) = event else {
                    continue;
                };
                let is_start_event = matches!(event, Event::Start(_));

                match e.local_name().as_ref() {
                    b"sheetFormatPr" => {
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"defaultRowHeight" => {
                                    if let Some(h) = parse_f64_bytes(&attr.value) {
                                        dims.default_row_height = h;
                                    }
                                }
                                b"defaultColWidth" => {
                                    if let Some(w) = parse_f64_bytes(&attr.value) {
                                        dims.default_col_width = w;
                                    }
                                }
                                _ => {}
                            }
                        }
                    }

                    b"col" => {
                        let mut min: u32 = 0;
                        let mut max: u32 = 0;
                        let mut width: Option<f64> = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"min" => min = parse_u32_bytes(&attr.value).unwrap_or(0),
                                b"max" => max = parse_u32_bytes(&attr.value).unwrap_or(0),
                                b"width" => width = parse_f64_bytes(&attr.value),
                                _ => {}
                            }
                        }
                        if let Some(width) = width {
                            if min > 0 && max >= min {
                                dims.col_widths.push((min, max, width));
                            }
                        }
                    }

                    b"row" => {
                        let mut row_num: Option<u32> = None;
                        let mut height: Option<f64> = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => row_num = parse_u32_bytes(&attr.value),
                                b"ht" => height = parse_f64_bytes(&attr.value),
                                _ => {}
                            }
                        }
                        if let (Some(row), Some(height)) = (row_num, height) {
                            dims.row_heights.push((row, height));
                        }
                    }

                    b"c" => {
                        let mut address: Option<CellAddress> = None;
                        let mut type_code = TypeCode::Implicit;
                        let mut style_attr: Option<u32> = None;

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => address = parse_address_bytes(&attr.value),
                                b"t" => type_code = parse_type_code(&attr.value),
                                b"s" => style_attr = parse_u32_bytes(&attr.value),
                                _ => {}
                            }
                        }

                        // A cell node without a usable address is structural
                        // corruption: this sheet stops here, siblings go on.
                        let Some(address) = address else {
                            sheet_error = Some(format!(
                                "cell node {} is missing a usable address",
                                records.len() + 1
                            ));
                            break;
                        };

                        let mut content: Option<String> = None;
                        let mut formula: Option<RawFormula> = None;

                        if is_start_event {
                            read_cell_children(
                                &mut xml,
                                &mut cell_buf,
                                &mut text_buf,
                                &mut content,
                                &mut formula,
                            );
                        }

                        let formula_info = resolve_formula(
                            formula,
                            address,
                            &meta.name,
                            &mut arena,
                            records.len(),
                            diagnostics,
                        );

                        let (resolution, format_diag) = ctx.formats.resolve(style_attr);
                        if let Some(message) = format_diag {
                            note(
                                diagnostics,
                                Diagnostic::cell(&meta.name, &format_address(address), message),
                            );
                        }

                        let inference = infer_value(
                            type_code,
                            content.as_deref(),
                            resolution.format.as_deref(),
                            ctx.shared_strings,
                            ctx.date_system,
                        );
                        if let Some(message) = inference.diagnostic {
                            note(
                                diagnostics,
                                Diagnostic::cell(&meta.name, &format_address(address), message),
                            );
                        }

                        records.push(CellRecord {
                            sheet: meta.name.clone(),
                            address,
                            content,
                            formula: formula_info,
                            type_code,
                            value: inference.value,
                            comment: comments.get(&address).cloned(),
                            height: dims.height(address.row),
                            width: dims.width(address.col),
                            style_format: resolution.style_format,
                            local_format_id: resolution.local_format_id,
                        });
                    }

                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                sheet_error = Some(format!("worksheet XML is corrupt: {err}"));
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    // Finishing pass: members that appeared before their anchor.
    for pending in arena.take_pending() {
        match arena.resolve_member(pending.group_id, pending.address) {
            Some(text) => {
                if let Some(record) = records.get_mut(pending.record_index) {
                    record.formula = Some(FormulaInfo {
                        text,
                        kind: FormulaKind::Shared,
                        group_id: Some(pending.group_id),
                        ref_range: None,
                    });
                }
            }
            None => note(
                diagnostics,
                Diagnostic::cell(
                    &meta.name,
                    &format_address(pending.address),
                    format!(
                        "formula group {} was never registered; leaving the formula absent",
                        pending.group_id
                    ),
                ),
            ),
        }
    }

    SheetCells {
        name: meta.name.clone(),
        records,
        error: sheet_error,
    }
}

/// Read the children of a non-empty `<c>` element: `<v>`, `<is>`, `<f>`.
fn read_cell_children<R: std::io::BufRead>(
    xml: &mut Reader<R>,
    cell_buf: &mut Vec<u8>,
    text_buf: &mut Vec<u8>,
    content: &mut Option<String>,
    formula: &mut Option<RawFormula>,
) {
    loop {
        cell_buf.clear();
        match xml.read_event_into(cell_buf) {
            Ok(Event::Start(ref inner)) => match inner.local_name().as_ref() {
                b"v" => {
                    text_buf.clear();
                    if let Ok(Event::Text(text)) = xml.read_event_into(text_buf) {
                        *content = text.unescape().ok().map(|s| s.to_string());
                    }
                }
                b"is" => {
                    // Inline string container <is><r><t>..</t></r></is>;
                    // concatenate every <t> run.
                    let mut inline = String::new();
                    let mut in_t = false;
                    loop {
                        text_buf.clear();
                        match xml.read_event_into(text_buf) {
                            Ok(Event::Start(ref is_inner)) => {
                                if is_inner.local_name().as_ref() == b"t" {
                                    in_t = true;
                                }
                            }
                            Ok(Event::Text(text)) if in_t => {
                                if let Ok(unescaped) = text.unescape() {
                                    inline.push_str(&unescaped);
                                }
                            }
                            Ok(Event::End(ref is_inner)) => match is_inner.local_name().as_ref() {
                                b"t" => in_t = false,
                                b"is" => break,
                                _ => {}
                            },
                            Ok(Event::Eof) | Err(_) => break,
                            _ => {}
                        }
                    }
                    *content = Some(inline);
                }
                b"f" => {
                    let mut raw = parse_formula_attrs(inner);
                    loop {
                        text_buf.clear();
                        match xml.read_event_into(text_buf) {
                            Ok(Event::Text(text)) => {
                                if let Ok(unescaped) = text.unescape() {
                                    raw.text.push_str(&unescaped);
                                }
                            }
                            Ok(Event::End(ref f_inner))
                                if f_inner.local_name().as_ref() == b"f" =>
                            {
                                break;
                            }
                            Ok(Event::Eof) | Err(_) => break,
                            _ => {}
                        }
                    }
                    *formula = Some(raw);
                }
                _ => {}
            },
            // Member cells store an attribute-only formula: <f t="shared" si="0"/>
            Ok(Event::Empty(ref inner)) if inner.local_name().as_ref() == b"f" => {
                *formula = Some(parse_formula_attrs(inner));
            }
            Ok(Event::End(ref inner)) if inner.local_name().as_ref() == b"c" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
}

fn parse_formula_attrs(element: &quick_xml::events::BytesStart<'_>) -> RawFormula {
    let mut raw = RawFormula::default();
    for attr in element.attributes().flatten() {
        match attr.key.as_ref() {
            b"t" => match attr.value.as_ref() {
                b"shared" => raw.is_shared = true,
                b"array" => raw.is_array = true,
                _ => {}
            },
            b"si" => raw.si = parse_u32_bytes(&attr.value),
            b"ref" => {
                raw.ref_range = std::str::from_utf8(&attr.value)
                    .ok()
                    .and_then(|s| parse_range(s).ok());
            }
            _ => {}
        }
    }
    raw
}

/// Route a cell's stored formula through the group machinery.
///
/// Returns the formula attached to this cell's record now; a shared member
/// whose group is not yet registered returns `None` and is patched by the
/// finishing pass.
fn resolve_formula(
    raw: Option<RawFormula>,
    address: CellAddress,
    sheet: &str,
    arena: &mut GroupArena,
    record_index: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<FormulaInfo> {
    let Some(raw) = raw else {
        // No <f> element: the cell may still sit inside a registered array
        // group's range, receiving the anchor text verbatim.
        return arena.array_covering(address).map(|group| FormulaInfo {
            text: group.text.clone(),
            kind: FormulaKind::Array,
            group_id: None,
            ref_range: None,
        });
    };

    if raw.is_array {
        if raw.text.is_empty() {
            return arena.array_covering(address).map(|group| FormulaInfo {
                text: group.text.clone(),
                kind: FormulaKind::Array,
                group_id: None,
                ref_range: None,
            });
        }
        let member_range = raw.ref_range.unwrap_or((address, address));
        if let Some(message) = arena.register(FormulaGroup {
            kind: GroupKind::Array,
            id: raw.si,
            anchor: address,
            text: raw.text.clone(),
            member_range,
        }) {
            note(
                diagnostics,
                Diagnostic::cell(sheet, &format_address(address), message),
            );
        }
        return Some(FormulaInfo {
            text: raw.text,
            kind: FormulaKind::Array,
            group_id: None,
            ref_range: raw.ref_range,
        });
    }

    if raw.is_shared {
        let Some(si) = raw.si else {
            // Shared without a group id: degrade to an ordinary formula.
            if raw.text.is_empty() {
                note(
                    diagnostics,
                    Diagnostic::cell(
                        sheet,
                        &format_address(address),
                        "shared formula reference carries no group id".to_string(),
                    ),
                );
                return None;
            }
            return Some(FormulaInfo {
                text: raw.text,
                kind: FormulaKind::Ordinary,
                group_id: None,
                ref_range: None,
            });
        };

        if raw.text.is_empty() {
            // Member cell: resolve against the registered anchor, or buffer
            // for the finishing pass when the anchor comes later.
            return match arena.resolve_member(si, address) {
                Some(text) => Some(FormulaInfo {
                    text,
                    kind: FormulaKind::Shared,
                    group_id: Some(si),
                    ref_range: None,
                }),
                None => {
                    arena.defer(PendingRef {
                        record_index,
                        group_id: si,
                        address,
                    });
                    None
                }
            };
        }

        // Anchor cell: it is the only node carrying the stored text.
        let member_range = raw.ref_range.unwrap_or((address, address));
        if let Some(message) = arena.register(FormulaGroup {
            kind: GroupKind::Shared,
            id: Some(si),
            anchor: address,
            text: raw.text.clone(),
            member_range,
        }) {
            note(
                diagnostics,
                Diagnostic::cell(sheet, &format_address(address), message),
            );
        }
        return Some(FormulaInfo {
            text: raw.text,
            kind: FormulaKind::Shared,
            group_id: Some(si),
            ref_range: raw.ref_range,
        });
    }

    if raw.text.is_empty() {
        return None;
    }
    Some(FormulaInfo {
        text: raw.text,
        kind: FormulaKind::Ordinary,
        group_id: None,
        ref_range: None,
    })
}
