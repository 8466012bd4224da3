//! Style and number-format tables - resolves the two-tier format indices.
//!
//! `xl/styles.xml` contributes two things to the extraction: the custom
//! `<numFmt>` entries (ids 164+) that supplement the built-in table, and the
//! `<cellXfs>` records a cell's `s` attribute indexes into. Each xf carries
//! the number format used for date detection and the `xfId` link into the
//! style-level formats.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::numfmt::builtin_format;

use super::worksheet::parse_u32_bytes;

/// One `<xf>` entry from `<cellXfs>`.
#[derive(Debug, Clone, Copy, Default)]
struct CellXf {
    num_fmt_id: u32,
    /// Link into cellStyleXfs; the style-level format id.
    xf_id: u32,
}

/// The workbook's number-format and cell-format tables, built once and
/// read-only for the rest of the run.
#[derive(Debug, Default)]
pub(crate) struct FormatTables {
    custom_formats: HashMap<u32, String>,
    xfs: Vec<CellXf>,
}

/// The format indices and resolved format string for one cell.
#[derive(Debug)]
pub(crate) struct FormatResolution {
    pub style_format: u32,
    pub local_format_id: Option<u32>,
    /// Number-format code used for date detection, when one resolves.
    pub format: Option<String>,
}

impl FormatTables {
    /// Parse xl/styles.xml. A workbook without the part gets empty tables
    /// (every cell resolves to the defaults).
    pub fn parse<R: Read + Seek>(archive: &mut ZipArchive<R>, path: Option<&str>) -> Self {
        let mut tables = Self::default();

        let styles_path = path.unwrap_or("xl/styles.xml");
        let Ok(file) = archive.by_name(styles_path) else {
            return tables; // Styles part is optional
        };

        let reader = BufReader::new(file);
        let mut xml = Reader::from_reader(reader);
        xml.trim_text(true);

        let mut buf = Vec::new();
        let mut in_cell_xfs = false;

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(ref event @ (Event::Start(_) | Event::Empty(_))) => {
                    let (Event::Start(ref e) | Event::Empty(ref e)) = event else {
                        continue;
                    };
                    match e.local_name().as_ref() {
                        b"numFmt" => {
                            let mut id: Option<u32> = None;
                            let mut code: Option<String> = None;
                            for attr in e.attributes().flatten() {
                                match attr.key.as_ref() {
                                    b"numFmtId" => id = parse_u32_bytes(&attr.value),
                                    b"formatCode" => {
                                        code = std::str::from_utf8(&attr.value)
                                            .ok()
                                            .map(ToString::to_string);
                                    }
                                    _ => {}
                                }
                            }
                            if let (Some(id), Some(code)) = (id, code) {
                                tables.custom_formats.insert(id, code);
                            }
                        }
                        b"cellXfs" => in_cell_xfs = true,
                        b"xf" if in_cell_xfs => {
                            let mut xf = CellXf::default();
                            for attr in e.attributes().flatten() {
                                match attr.key.as_ref() {
                                    b"numFmtId" => {
                                        xf.num_fmt_id =
                                            parse_u32_bytes(&attr.value).unwrap_or(0);
                                    }
                                    b"xfId" => {
                                        xf.xf_id = parse_u32_bytes(&attr.value).unwrap_or(0);
                                    }
                                    _ => {}
                                }
                            }
                            tables.xfs.push(xf);
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(ref e)) => {
                    if e.local_name().as_ref() == b"cellXfs" {
                        in_cell_xfs = false;
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }

        tables
    }

    /// Look up a number-format code by id: custom entries first (a file may
    /// shadow a built-in id), then the built-in table.
    pub fn format_string(&self, num_fmt_id: u32) -> Option<&str> {
        self.custom_formats
            .get(&num_fmt_id)
            .map(String::as_str)
            .or_else(|| builtin_format(num_fmt_id))
    }

    /// Resolve a cell's `s` attribute into the (style, local) index pair.
    ///
    /// `style_format` always resolves, defaulting to the workbook default
    /// style 0. An out-of-range local id is downgraded to the defaults and
    /// reported as the returned message rather than aborting the sheet.
    pub fn resolve(&self, local_id: Option<u32>) -> (FormatResolution, Option<String>) {
        let default_format = self
            .xfs
            .first()
            .and_then(|xf| self.format_string(xf.num_fmt_id))
            .map(ToString::to_string);

        match local_id {
            None => (
                FormatResolution {
                    style_format: 0,
                    local_format_id: None,
                    format: default_format,
                },
                None,
            ),
            Some(id) => match self.xfs.get(id as usize) {
                Some(xf) => (
                    FormatResolution {
                        style_format: xf.xf_id,
                        local_format_id: Some(id),
                        format: self.format_string(xf.num_fmt_id).map(ToString::to_string),
                    },
                    None,
                ),
                None => (
                    FormatResolution {
                        style_format: 0,
                        local_format_id: None,
                        format: default_format,
                    },
                    Some(format!(
                        "format id {id} is out of range ({} formats); using the default",
                        self.xfs.len()
                    )),
                ),
            },
        }
    }
}
