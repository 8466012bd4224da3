//! Cell comment (note) extraction.
//!
//! Excel comments are stored in separate XML files within the XLSX package,
//! one per sheet (e.g., `xl/comments1.xml`), linked via the sheet's
//! relationship file (`xl/worksheets/_rels/sheet1.xml.rels`).
//!
//! ```xml
//! <comments>
//!   <authors><author>Jane Doe</author></authors>
//!   <commentList>
//!     <comment ref="A1" authorId="0">
//!       <text><r><t>Comment text</t></r></text>
//!     </comment>
//!   </commentList>
//! </comments>
//! ```

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::cell_ref::{parse_address_bytes, CellAddress};

/// Parse a comments XML file into an address-keyed map of plain text.
///
/// Rich-text runs are flattened; only the concatenated text survives.
/// A comment whose `ref` does not parse is skipped.
pub fn parse_comments<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    comments_path: &str,
) -> HashMap<CellAddress, String> {
    let mut comments = HashMap::new();
    let Ok(file) = archive.by_name(comments_path) else {
        return comments;
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut buf = Vec::new();
    let mut in_comment_list = false;
    let mut in_comment = false;
    let mut in_text = false;
    let mut current_address: Option<CellAddress> = None;
    let mut current_text = String::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"commentList" => in_comment_list = true,
                b"comment" if in_comment_list => {
                    in_comment = true;
                    current_text.clear();
                    current_address = None;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ref" {
                            current_address = parse_address_bytes(&attr.value);
                        }
                    }
                }
                b"text" if in_comment => in_text = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_text {
                    if let Ok(text) = e.unescape() {
                        current_text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"commentList" => in_comment_list = false,
                b"comment" => {
                    in_comment = false;
                    if let Some(address) = current_address.take() {
                        comments.insert(address, current_text.clone());
                    }
                }
                b"text" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    comments
}

/// Get the comments file path from a sheet's relationships, if it has one.
///
/// ```xml
/// <Relationships>
///   <Relationship Id="rId1"
///     Type=".../relationships/comments"
///     Target="../comments1.xml"/>
/// </Relationships>
/// ```
pub fn comments_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> Option<String> {
    // e.g., "xl/worksheets/sheet1.xml" -> "xl/worksheets/_rels/sheet1.xml.rels"
    let rels_path = if let Some(pos) = sheet_path.rfind('/') {
        let (dir, file) = sheet_path.split_at(pos + 1);
        format!("{dir}_rels/{file}.rels")
    } else {
        format!("_rels/{sheet_path}.rels")
    };

    let Ok(file) = archive.by_name(&rels_path) else {
        return None;
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut target = String::new();
                    let mut rel_type = String::new();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Target" => {
                                target = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"Type" => {
                                rel_type = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }
                    if rel_type.ends_with("/comments") && !target.is_empty() {
                        let sheet_dir = sheet_path
                            .rfind('/')
                            .map_or("", |pos| sheet_path.get(..pos + 1).unwrap_or(""));
                        return Some(resolve_relative_path(sheet_dir, &target));
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    None
}

/// Resolve a relative target path from a base directory.
pub(crate) fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        stripped.to_string()
    } else if let Some(stripped) = relative.strip_prefix("../") {
        let parent = base_dir
            .trim_end_matches('/')
            .rfind('/')
            .and_then(|pos| base_dir.get(..pos + 1))
            .unwrap_or("");
        resolve_relative_path(parent, stripped)
    } else {
        format!("{base_dir}{relative}")
    }
}
