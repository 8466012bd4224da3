//! Shared/array formula group resolution.
//!
//! A shared formula is stored once at its anchor cell and applies to a
//! rectangular group with cell references shifted relative to the anchor;
//! an array formula applies verbatim to every cell of its declared range.
//! Groups are accumulated in a per-sheet arena while scanning in document
//! order, with a pending list for member cells seen before their anchor.

use std::collections::HashMap;

use serde::Serialize;

use crate::cell_ref::{format_address, translate_reference, CellAddress};

/// How a cell came by its formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaKind {
    Ordinary,
    Shared,
    Array,
}

/// Formula data attached to a cell record.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaInfo {
    /// Resolved formula text (translated for shared group members).
    pub text: String,
    pub kind: FormulaKind,
    /// Group id for shared formulas.
    pub group_id: Option<u32>,
    /// Declared extent, present on the anchor cell of a group.
    pub ref_range: Option<(CellAddress, CellAddress)>,
}

impl FormulaInfo {
    /// The declared extent as an A1 range string, e.g. "A1:B3".
    #[must_use]
    pub fn ref_text(&self) -> Option<String> {
        self.ref_range.map(|(start, end)| {
            if start == end {
                format_address(start)
            } else {
                format!("{}:{}", format_address(start), format_address(end))
            }
        })
    }
}

/// Group kind: shared groups translate references, array groups copy text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupKind {
    Shared,
    Array,
}

/// One formula group registered while scanning a sheet.
#[derive(Debug, Clone)]
pub(crate) struct FormulaGroup {
    pub kind: GroupKind,
    /// The `si` id for shared groups; `None` for array groups, which are
    /// matched by range membership instead.
    pub id: Option<u32>,
    pub anchor: CellAddress,
    pub text: String,
    /// Inclusive member rectangle; for shared groups the id is
    /// authoritative and the range is informative.
    pub member_range: (CellAddress, CellAddress),
}

impl FormulaGroup {
    fn contains(&self, address: CellAddress) -> bool {
        let (start, end) = self.member_range;
        address.row >= start.row
            && address.row <= end.row
            && address.col >= start.col
            && address.col <= end.col
    }
}

/// A member cell visited before its group was registered.
#[derive(Debug)]
pub(crate) struct PendingRef {
    /// Index of the already-emitted record to patch in the finishing pass.
    pub record_index: usize,
    pub group_id: u32,
    pub address: CellAddress,
}

/// Per-sheet registry of formula groups, dropped at end of sheet.
#[derive(Debug, Default)]
pub(crate) struct GroupArena {
    groups: Vec<FormulaGroup>,
    by_id: HashMap<u32, usize>,
    pending: Vec<PendingRef>,
}

impl GroupArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group at its anchor. Returns a diagnostic message when
    /// the registration collides with an earlier one (first wins): a
    /// duplicate shared id, or an array range overlapping another group.
    pub fn register(&mut self, group: FormulaGroup) -> Option<String> {
        let diagnostic = match (group.kind, group.id) {
            (GroupKind::Shared, Some(id)) if self.by_id.contains_key(&id) => {
                return Some(format!(
                    "shared formula group {id} registered more than once; keeping the first anchor"
                ));
            }
            (GroupKind::Array, _) => self
                .groups
                .iter()
                .find(|existing| {
                    existing.kind == GroupKind::Array
                        && ranges_overlap(existing.member_range, group.member_range)
                })
                .map(|existing| {
                    format!(
                        "array formula range {}:{} overlaps the group anchored at {}; first group wins",
                        format_address(group.member_range.0),
                        format_address(group.member_range.1),
                        format_address(existing.anchor),
                    )
                }),
            _ => None,
        };

        let index = self.groups.len();
        if let Some(id) = group.id {
            self.by_id.entry(id).or_insert(index);
        }
        self.groups.push(group);
        diagnostic
    }

    /// Resolve the formula text a member cell receives from group
    /// `group_id`: translated by `address - anchor` for shared groups,
    /// the anchor text verbatim for array groups.
    pub fn resolve_member(&self, group_id: u32, address: CellAddress) -> Option<String> {
        let group = self.by_id.get(&group_id).and_then(|&i| self.groups.get(i))?;
        match group.kind {
            GroupKind::Shared => {
                let delta_row = i64::from(address.row) - i64::from(group.anchor.row);
                let delta_col = i64::from(address.col) - i64::from(group.anchor.col);
                if delta_row == 0 && delta_col == 0 {
                    Some(group.text.clone())
                } else {
                    Some(translate_formula(&group.text, delta_row, delta_col))
                }
            }
            GroupKind::Array => Some(group.text.clone()),
        }
    }

    /// The first registered array group covering `address`, if any.
    pub fn array_covering(&self, address: CellAddress) -> Option<&FormulaGroup> {
        self.groups
            .iter()
            .find(|group| group.kind == GroupKind::Array && group.contains(address))
    }

    /// Buffer a member cell whose group has not been registered yet.
    pub fn defer(&mut self, pending: PendingRef) {
        self.pending.push(pending);
    }

    /// Take the buffered forward references for the finishing pass.
    pub fn take_pending(&mut self) -> Vec<PendingRef> {
        std::mem::take(&mut self.pending)
    }
}

fn ranges_overlap(a: (CellAddress, CellAddress), b: (CellAddress, CellAddress)) -> bool {
    a.0.row <= b.1.row && b.0.row <= a.1.row && a.0.col <= b.1.col && b.0.col <= a.1.col
}

/// Shift every relative cell reference in a formula by a row/column delta.
///
/// String literals in double quotes, quoted sheet names, function names
/// (an alphanumeric run followed by `(`), sheet-name prefixes (followed by
/// `!`), and absolute reference components pass through unchanged. A
/// reference preceded by a bracketed external-workbook marker (`[n]`) is
/// copied verbatim; dereferencing other workbooks is out of scope.
#[must_use]
pub fn translate_formula(formula: &str, delta_row: i64, delta_col: i64) -> String {
    let mut out = String::with_capacity(formula.len() + 8);
    let mut token = String::new();
    // Set by a `[...]` workbook marker; the reference that follows (after
    // any sheet-name segment) is external and must not shift.
    let mut external = false;

    let mut chars = formula.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                flush_token(&mut out, &mut token, Some('"'), &mut external, delta_row, delta_col);
                out.push(c);
                for q in chars.by_ref() {
                    out.push(q);
                    if q == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                // Quoted sheet name; the '[' of an external path may hide here.
                flush_token(&mut out, &mut token, Some('\''), &mut external, delta_row, delta_col);
                out.push(c);
                for q in chars.by_ref() {
                    if q == '[' {
                        external = true;
                    }
                    out.push(q);
                    if q == '\'' {
                        break;
                    }
                }
            }
            '[' => {
                flush_token(&mut out, &mut token, Some('['), &mut external, delta_row, delta_col);
                external = true;
                out.push(c);
                for q in chars.by_ref() {
                    out.push(q);
                    if q == ']' {
                        break;
                    }
                }
            }
            _ if c.is_ascii_alphanumeric() || c == '$' || c == '_' || c == '.' => {
                token.push(c);
            }
            _ => {
                flush_token(&mut out, &mut token, Some(c), &mut external, delta_row, delta_col);
                out.push(c);
            }
        }
    }
    flush_token(&mut out, &mut token, None, &mut external, delta_row, delta_col);
    out
}

/// Emit a pending token, translating it when it is a shiftable reference.
fn flush_token(
    out: &mut String,
    token: &mut String,
    next: Option<char>,
    external: &mut bool,
    delta_row: i64,
    delta_col: i64,
) {
    if token.is_empty() {
        return;
    }
    let is_function_name = next == Some('(');
    let is_sheet_prefix = next == Some('!');
    if is_function_name || is_sheet_prefix {
        out.push_str(token);
    } else if *external {
        out.push_str(token);
        *external = false;
    } else {
        out.push_str(&translate_reference(token, delta_row, delta_col));
    }
    token.clear();
}
