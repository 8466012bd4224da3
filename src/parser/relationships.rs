//! Workbook-level part discovery: relationships, sheet list, date system,
//! and the shared-string table.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::comments::comments_path;
use crate::error::{Result, XlcellsError};
use crate::numfmt::DateSystem;

/// Workbook relationships parsed from xl/_rels/workbook.xml.rels.
///
/// Targets are resolved relative to the xl/ directory and stored as full
/// archive paths.
#[derive(Default, Debug)]
pub(super) struct WorkbookRelationships {
    /// Map of rId -> full worksheet path, e.g. "rId1" -> "xl/worksheets/sheet1.xml"
    pub worksheets: HashMap<String, String>,
    /// Path to the shared strings part, when present.
    pub shared_strings: Option<String>,
    /// Path to the styles part, when present.
    pub styles: Option<String>,
}

/// One sheet as listed by the workbook, in workbook order.
#[derive(Debug, Clone)]
pub(super) struct SheetMeta {
    pub name: String,
    pub path: String,
    pub comments_path: Option<String>,
}

pub(super) fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> WorkbookRelationships {
    let mut rels = WorkbookRelationships::default();

    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return rels; // Relationships file is optional
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = String::new();
                    let mut target = String::new();
                    let mut rel_type = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"Target" => {
                                target = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"Type" => {
                                rel_type = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }

                    // Resolve target path relative to xl/
                    let full_path = if let Some(stripped) = target.strip_prefix('/') {
                        stripped.to_string()
                    } else {
                        format!("xl/{target}")
                    };

                    if rel_type.ends_with("/worksheet") && !id.is_empty() && !target.is_empty() {
                        rels.worksheets.insert(id, full_path);
                    } else if rel_type.ends_with("/sharedStrings") {
                        rels.shared_strings = Some(full_path);
                    } else if rel_type.ends_with("/styles") {
                        rels.styles = Some(full_path);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    rels
}

/// List the workbook's sheets in order and read the date-system flag from
/// xl/workbook.xml. A workbook without that part is not a spreadsheet.
pub(super) fn list_sheets<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &WorkbookRelationships,
) -> Result<(Vec<SheetMeta>, DateSystem)> {
    let mut sheets = Vec::new();
    let mut date_system = DateSystem::Excel1900;

    {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlcellsError::Parse("missing xl/workbook.xml part".to_string()))?;
        let reader = BufReader::new(file);
        let mut xml = Reader::from_reader(reader);
        xml.trim_text(true);

        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                    match e.local_name().as_ref() {
                        b"workbookPr" => {
                            for attr in e.attributes().flatten() {
                                if attr.key.as_ref() == b"date1904" {
                                    let val = std::str::from_utf8(&attr.value).unwrap_or("0");
                                    if val == "1" || val.eq_ignore_ascii_case("true") {
                                        date_system = DateSystem::Excel1904;
                                    }
                                }
                            }
                        }
                        b"sheet" => {
                            let mut name = String::new();
                            let mut r_id = String::new();

                            for attr in e.attributes().flatten() {
                                match attr.key.as_ref() {
                                    b"name" => {
                                        name =
                                            String::from_utf8_lossy(&attr.value).into_owned();
                                    }
                                    // r:id attribute (namespace prefixed)
                                    key if key.ends_with(b":id") || key == b"id" => {
                                        r_id =
                                            String::from_utf8_lossy(&attr.value).into_owned();
                                    }
                                    _ => {}
                                }
                            }

                            if !name.is_empty() {
                                // Fall back to the conventional path when the
                                // relationship is missing.
                                let path = relationships
                                    .worksheets
                                    .get(&r_id)
                                    .cloned()
                                    .unwrap_or_else(|| {
                                        let idx = sheets.len() + 1;
                                        format!("xl/worksheets/sheet{idx}.xml")
                                    });
                                sheets.push(SheetMeta {
                                    name,
                                    path,
                                    comments_path: None,
                                });
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }
    }

    for sheet in &mut sheets {
        sheet.comments_path = comments_path(archive, &sheet.path);
    }

    Ok((sheets, date_system))
}

/// Parse the shared strings table. Rich-text runs inside an `<si>` item are
/// concatenated into one string.
pub(super) fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Vec<String> {
    let sst_path = path.unwrap_or("xl/sharedStrings.xml");
    let Ok(file) = archive.by_name(sst_path) else {
        return Vec::new(); // SharedStrings is optional
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current_string = String::new();
    let mut in_si = false;
    let mut in_t = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current_string.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current_string.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(current_string.clone());
                    in_si = false;
                }
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    strings
}
