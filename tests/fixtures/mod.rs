//! Test fixtures for generating valid XLSX files in memory.
//!
//! Provides a builder for creating workbooks programmatically, useful for
//! exercising the extractor with known inputs — typed cells, shared/array
//! formula groups (in any document order), comments, custom number formats,
//! dimensions, and deliberately corrupt sheets.
//!
//! # Example
//!
//! ```rust
//! use fixtures::{Cell, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .add_sheet("Sheet1")
//!     .cell("A1", Cell::Text("Hello".into()), None)
//!     .cell("B1", Cell::Number(42.0), None)
//!     .build();
//!
//! let workbook = xlcells::extract(&xlsx).unwrap();
//! ```
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// One cell's payload as it will be stored in the sheet XML.
#[derive(Debug, Clone)]
pub enum Cell {
    /// Implicit numeric cell.
    Number(f64),
    /// Shared-string cell (`t="s"`).
    Text(String),
    /// Inline string cell (`t="inlineStr"`).
    InlineText(String),
    /// Boolean cell (`t="b"`).
    Bool(bool),
    /// Error cell (`t="e"`), e.g. "#DIV/0!".
    Error(String),
    /// Formula-result string cell (`t="str"`) with a cached value.
    CachedStr { formula: String, value: String },
    /// Ordinary formula with an optional cached numeric value.
    Formula { text: String, value: Option<String> },
    /// Shared-group anchor: stores the text and declares the group.
    SharedAnchor {
        si: u32,
        range: String,
        text: String,
        value: Option<String>,
    },
    /// Shared-group member: references the group by id only.
    SharedMember { si: u32, value: Option<String> },
    /// Array-group anchor: stores the text verbatim for its range.
    ArrayAnchor {
        range: String,
        text: String,
        value: Option<String>,
    },
    /// Style-only cell with no content.
    Empty,
    /// Raw inner XML of the `<c>` element, attributes included verbatim in
    /// place of the usual `r` attribute. For corruption tests.
    RawElement(String),
}

struct SheetSpec {
    name: String,
    /// (row, rendered `<c>` elements) in insertion order.
    rows: Vec<(u32, Vec<String>)>,
    row_heights: BTreeMap<u32, f64>,
    col_widths: Vec<(u32, u32, f64)>,
    comments: Vec<(String, String)>,
    /// Replaces the generated sheet XML entirely when set.
    raw_xml: Option<String>,
}

/// Builder for creating XLSX workbooks in memory.
pub struct XlsxBuilder {
    sheets: Vec<SheetSpec>,
    shared_strings: Vec<String>,
    /// cellXfs entries as (numFmtId, xfId); index 0 is the default.
    cell_xfs: Vec<(u32, u32)>,
    custom_formats: Vec<(u32, String)>,
    next_custom_format: u32,
    date1904: bool,
}

impl Default for XlsxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            shared_strings: Vec::new(),
            cell_xfs: vec![(0, 0)],
            custom_formats: Vec::new(),
            next_custom_format: 164,
            date1904: false,
        }
    }

    /// Use the 1904 date system.
    #[must_use]
    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    /// Register a cellXfs entry for a built-in number format id.
    /// Returns the style index for use with [`Self::cell`].
    pub fn style_with_builtin(&mut self, num_fmt_id: u32) -> u32 {
        self.style_entry(num_fmt_id, 0)
    }

    /// Register a custom number format plus its cellXfs entry.
    /// Returns the style index.
    pub fn style_with_format(&mut self, code: &str) -> u32 {
        let id = self.next_custom_format;
        self.next_custom_format += 1;
        self.custom_formats.push((id, code.to_string()));
        self.style_entry(id, 0)
    }

    /// Register a cellXfs entry with an explicit style-level xfId.
    pub fn style_entry(&mut self, num_fmt_id: u32, xf_id: u32) -> u32 {
        self.cell_xfs.push((num_fmt_id, xf_id));
        u32::try_from(self.cell_xfs.len() - 1).unwrap()
    }

    /// Start a new sheet; subsequent cell calls target it.
    #[must_use]
    pub fn add_sheet(mut self, name: &str) -> Self {
        self.sheets.push(SheetSpec {
            name: name.to_string(),
            rows: Vec::new(),
            row_heights: BTreeMap::new(),
            col_widths: Vec::new(),
            comments: Vec::new(),
            raw_xml: None,
        });
        self
    }

    /// Add a cell to the current sheet. Rows are emitted in the order they
    /// are first touched, so document order is fully caller-controlled.
    #[must_use]
    pub fn cell(mut self, address: &str, payload: Cell, style: Option<u32>) -> Self {
        let row = row_of(address);
        let rendered = self.render_cell(address, payload, style);
        let sheet = self.sheets.last_mut().expect("add_sheet first");
        if let Some((_, cells)) = sheet.rows.iter_mut().find(|(r, _)| *r == row) {
            cells.push(rendered);
        } else {
            sheet.rows.push((row, vec![rendered]));
        }
        self
    }

    /// Attach a comment to a cell of the current sheet.
    #[must_use]
    pub fn comment(mut self, address: &str, text: &str) -> Self {
        let sheet = self.sheets.last_mut().expect("add_sheet first");
        sheet.comments.push((address.to_string(), text.to_string()));
        self
    }

    /// Declare an explicit row height on the current sheet.
    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        let sheet = self.sheets.last_mut().expect("add_sheet first");
        sheet.row_heights.insert(row, height);
        self
    }

    /// Declare a column width span on the current sheet (1-based, inclusive).
    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        let sheet = self.sheets.last_mut().expect("add_sheet first");
        sheet.col_widths.push((min, max, width));
        self
    }

    /// Replace the current sheet's XML entirely (corruption tests).
    #[must_use]
    pub fn raw_sheet_xml(mut self, xml: &str) -> Self {
        let sheet = self.sheets.last_mut().expect("add_sheet first");
        sheet.raw_xml = Some(xml.to_string());
        self
    }

    fn shared_string_index(&mut self, text: &str) -> usize {
        if let Some(idx) = self.shared_strings.iter().position(|s| s == text) {
            idx
        } else {
            self.shared_strings.push(text.to_string());
            self.shared_strings.len() - 1
        }
    }

    fn render_cell(&mut self, address: &str, payload: Cell, style: Option<u32>) -> String {
        let style_attr = style.map_or(String::new(), |s| format!(" s=\"{s}\""));
        match payload {
            Cell::Number(value) => {
                format!("<c r=\"{address}\"{style_attr}><v>{value}</v></c>")
            }
            Cell::Text(text) => {
                let idx = self.shared_string_index(&text);
                format!("<c r=\"{address}\"{style_attr} t=\"s\"><v>{idx}</v></c>")
            }
            Cell::InlineText(text) => format!(
                "<c r=\"{address}\"{style_attr} t=\"inlineStr\"><is><t>{}</t></is></c>",
                xml_escape(&text)
            ),
            Cell::Bool(value) => format!(
                "<c r=\"{address}\"{style_attr} t=\"b\"><v>{}</v></c>",
                u8::from(value)
            ),
            Cell::Error(code) => format!(
                "<c r=\"{address}\"{style_attr} t=\"e\"><v>{}</v></c>",
                xml_escape(&code)
            ),
            Cell::CachedStr { formula, value } => format!(
                "<c r=\"{address}\"{style_attr} t=\"str\"><f>{}</f><v>{}</v></c>",
                xml_escape(&formula),
                xml_escape(&value)
            ),
            Cell::Formula { text, value } => format!(
                "<c r=\"{address}\"{style_attr}><f>{}</f>{}</c>",
                xml_escape(&text),
                value.map_or(String::new(), |v| format!("<v>{}</v>", xml_escape(&v)))
            ),
            Cell::SharedAnchor {
                si,
                range,
                text,
                value,
            } => format!(
                "<c r=\"{address}\"{style_attr}><f t=\"shared\" ref=\"{range}\" si=\"{si}\">{}</f>{}</c>",
                xml_escape(&text),
                value.map_or(String::new(), |v| format!("<v>{}</v>", xml_escape(&v)))
            ),
            Cell::SharedMember { si, value } => format!(
                "<c r=\"{address}\"{style_attr}><f t=\"shared\" si=\"{si}\"/>{}</c>",
                value.map_or(String::new(), |v| format!("<v>{}</v>", xml_escape(&v)))
            ),
            Cell::ArrayAnchor { range, text, value } => format!(
                "<c r=\"{address}\"{style_attr}><f t=\"array\" ref=\"{range}\">{}</f>{}</c>",
                xml_escape(&text),
                value.map_or(String::new(), |v| format!("<v>{}</v>", xml_escape(&v)))
            ),
            Cell::Empty => format!("<c r=\"{address}\"{style_attr}/>"),
            Cell::RawElement(xml) => xml,
        }
    }

    /// Assemble the workbook into XLSX bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let sheet_count = self.sheets.len();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(content_types(sheet_count).as_bytes()).unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(ROOT_RELS.as_bytes()).unwrap();

        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(self.workbook_xml().as_bytes()).unwrap();

        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(workbook_rels(sheet_count).as_bytes()).unwrap();

        zip.start_file("xl/styles.xml", options).unwrap();
        zip.write_all(self.styles_xml().as_bytes()).unwrap();

        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        zip.write_all(self.shared_strings_xml().as_bytes()).unwrap();

        for (i, sheet) in self.sheets.iter().enumerate() {
            let number = i + 1;
            zip.start_file(format!("xl/worksheets/sheet{number}.xml"), options)
                .unwrap();
            zip.write_all(sheet_xml(sheet).as_bytes()).unwrap();

            if !sheet.comments.is_empty() {
                zip.start_file(
                    format!("xl/worksheets/_rels/sheet{number}.xml.rels"),
                    options,
                )
                .unwrap();
                zip.write_all(sheet_rels(number).as_bytes()).unwrap();

                zip.start_file(format!("xl/comments{number}.xml"), options)
                    .unwrap();
                zip.write_all(comments_xml(&sheet.comments).as_bytes())
                    .unwrap();
            }
        }

        zip.finish().unwrap().into_inner()
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
             xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
        );
        if self.date1904 {
            xml.push_str("<workbookPr date1904=\"1\"/>");
        }
        xml.push_str("<sheets>");
        for (i, sheet) in self.sheets.iter().enumerate() {
            let number = i + 1;
            xml.push_str(&format!(
                "<sheet name=\"{}\" sheetId=\"{number}\" r:id=\"rId{number}\"/>",
                xml_escape(&sheet.name)
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn styles_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
        );
        if !self.custom_formats.is_empty() {
            xml.push_str(&format!("<numFmts count=\"{}\">", self.custom_formats.len()));
            for (id, code) in &self.custom_formats {
                xml.push_str(&format!(
                    "<numFmt numFmtId=\"{id}\" formatCode=\"{}\"/>",
                    xml_escape(code)
                ));
            }
            xml.push_str("</numFmts>");
        }
        xml.push_str("<cellStyleXfs count=\"1\"><xf numFmtId=\"0\"/></cellStyleXfs>");
        xml.push_str(&format!("<cellXfs count=\"{}\">", self.cell_xfs.len()));
        for (num_fmt_id, xf_id) in &self.cell_xfs {
            xml.push_str(&format!(
                "<xf numFmtId=\"{num_fmt_id}\" xfId=\"{xf_id}\" applyNumberFormat=\"1\"/>"
            ));
        }
        xml.push_str("</cellXfs></styleSheet>");
        xml
    }

    fn shared_strings_xml(&self) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
             count=\"{0}\" uniqueCount=\"{0}\">",
            self.shared_strings.len()
        );
        for text in &self.shared_strings {
            xml.push_str(&format!("<si><t>{}</t></si>", xml_escape(text)));
        }
        xml.push_str("</sst>");
        xml
    }
}

fn sheet_xml(sheet: &SheetSpec) -> String {
    if let Some(raw) = &sheet.raw_xml {
        return raw.clone();
    }

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
    );
    if !sheet.col_widths.is_empty() {
        xml.push_str("<cols>");
        for (min, max, width) in &sheet.col_widths {
            xml.push_str(&format!(
                "<col min=\"{min}\" max=\"{max}\" width=\"{width}\" customWidth=\"1\"/>"
            ));
        }
        xml.push_str("</cols>");
    }
    xml.push_str("<sheetData>");
    for (row, cells) in &sheet.rows {
        let height = sheet
            .row_heights
            .get(row)
            .map_or(String::new(), |h| format!(" ht=\"{h}\" customHeight=\"1\""));
        xml.push_str(&format!("<row r=\"{row}\"{height}>"));
        for cell in cells {
            xml.push_str(cell);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn comments_xml(comments: &[(String, String)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <comments xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <authors><author/></authors><commentList>",
    );
    for (address, text) in comments {
        xml.push_str(&format!(
            "<comment ref=\"{address}\" authorId=\"0\"><text><r><t>{}</t></r></text></comment>",
            xml_escape(text)
        ));
    }
    xml.push_str("</commentList></comments>");
    xml
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         <Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>\
         <Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>",
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{i}.xml\" \
             ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

const ROOT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
    <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
    <Relationship Id=\"rId1\" \
    Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
    Target=\"xl/workbook.xml\"/></Relationships>";

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{i}\" \
             Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
             Target=\"worksheets/sheet{i}.xml\"/>"
        ));
    }
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" \
         Target=\"styles.xml\"/>",
        sheet_count + 1
    ));
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings\" \
         Target=\"sharedStrings.xml\"/>",
        sheet_count + 2
    ));
    xml.push_str("</Relationships>");
    xml
}

fn sheet_rels(number: usize) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments\" \
         Target=\"../comments{number}.xml\"/></Relationships>"
    )
}

fn row_of(address: &str) -> u32 {
    address
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(1)
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
