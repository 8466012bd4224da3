//! Cell value inference - maps raw cell content to one canonical typed value.
//!
//! The cascade is a pure function from (type code, cached content, resolved
//! number format) to a closed [`CellValue`] variant; no other part of the
//! crate inspects cell types at runtime.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::numfmt::{is_date_format, serial_to_components, DateSystem};

/// Cell type tag from the `t` attribute of a `<c>` element.
///
/// A missing attribute means the cell content is an implicit number.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TypeCode {
    Bool,
    Error,
    Shared,
    Str,
    Inline,
    Implicit,
}

impl TypeCode {
    /// The raw attribute value, or `None` for implicit numeric cells.
    #[must_use]
    pub const fn as_letter(self) -> Option<&'static str> {
        match self {
            Self::Bool => Some("b"),
            Self::Error => Some("e"),
            Self::Shared => Some("s"),
            Self::Str => Some("str"),
            Self::Inline => Some("inlineStr"),
            Self::Implicit => None,
        }
    }
}

/// Parse the `t` attribute of a `<c>` element.
#[must_use]
pub fn parse_type_code(value: &[u8]) -> TypeCode {
    match value {
        b"b" => TypeCode::Bool,
        b"e" => TypeCode::Error,
        b"s" => TypeCode::Shared,
        b"str" => TypeCode::Str,
        b"inlineStr" => TypeCode::Inline,
        _ => TypeCode::Implicit,
    }
}

/// A decoded date/time as calendar components.
///
/// Components rather than a calendar library type: the 1900 system's
/// fictitious 1900-02-29 (serial 60) must be representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateTimeValue {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Calendar system the serial was decoded under.
    pub system: DateSystem,
}

impl DateTimeValue {
    /// Decode a serial date number under the given calendar system.
    #[must_use]
    pub fn from_serial(serial: f64, system: DateSystem) -> Self {
        let (year, month, day, hour, minute, second) = serial_to_components(serial, system);
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            system,
        }
    }
}

impl std::fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl Serialize for DateTimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The canonical typed value of a cell. Exactly one arm is active.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Error(String),
    Logical(bool),
    Numeric(f64),
    Date(DateTimeValue),
    Character(String),
    Blank,
}

impl CellValue {
    /// The `data_type` column value for this variant.
    #[must_use]
    pub const fn data_type(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::Logical(_) => "logical",
            Self::Numeric(_) => "numeric",
            Self::Date(_) => "date",
            Self::Character(_) => "character",
            Self::Blank => "blank",
        }
    }
}

// Serialized as the exploded column contract: `data_type` plus exactly one
// of the five value columns (none for blank). Flattened into the record.
impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = if matches!(self, Self::Blank) { 1 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("data_type", self.data_type())?;
        match self {
            Self::Error(code) => map.serialize_entry("error", code)?,
            Self::Logical(flag) => map.serialize_entry("logical", flag)?,
            Self::Numeric(num) => map.serialize_entry("numeric", num)?,
            Self::Date(date) => map.serialize_entry("date", date)?,
            Self::Character(text) => map.serialize_entry("character", text)?,
            Self::Blank => {}
        }
        map.end()
    }
}

/// Result of the inference cascade for one cell.
#[derive(Debug)]
pub struct Inference {
    pub value: CellValue,
    /// Message for a cell-local degradation, recorded by the caller.
    pub diagnostic: Option<String>,
}

impl Inference {
    fn ok(value: CellValue) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }

    fn degraded(value: CellValue, message: String) -> Self {
        Self {
            value,
            diagnostic: Some(message),
        }
    }
}

/// Resolve a cell's canonical value from its type code, cached content,
/// and resolved number-format string.
///
/// Never fails: every degradation falls back to a safe variant and reports
/// the reason through [`Inference::diagnostic`].
#[must_use]
pub fn infer_value(
    type_code: TypeCode,
    content: Option<&str>,
    format: Option<&str>,
    shared_strings: &[String],
    system: DateSystem,
) -> Inference {
    let Some(raw) = content else {
        return Inference::ok(CellValue::Blank);
    };

    match type_code {
        TypeCode::Bool => match raw {
            "1" => Inference::ok(CellValue::Logical(true)),
            "0" => Inference::ok(CellValue::Logical(false)),
            _ => Inference::degraded(
                CellValue::Character(raw.to_string()),
                format!("boolean cell content {raw:?} is not 0/1"),
            ),
        },
        TypeCode::Error => Inference::ok(CellValue::Error(raw.to_string())),
        TypeCode::Shared => match raw.parse::<usize>().ok().and_then(|idx| shared_strings.get(idx))
        {
            Some(text) => Inference::ok(CellValue::Character(text.clone())),
            None => Inference::degraded(
                CellValue::Blank,
                format!("shared string index {raw} is out of range"),
            ),
        },
        TypeCode::Inline => Inference::ok(CellValue::Character(raw.to_string())),
        TypeCode::Str => {
            // Cached formula result: re-interpret numeric text, with date
            // detection, the way Excel displays it.
            match raw.parse::<f64>() {
                Ok(num) if format.is_some_and(is_date_format) => {
                    Inference::ok(CellValue::Date(DateTimeValue::from_serial(num, system)))
                }
                Ok(num) => Inference::ok(CellValue::Numeric(num)),
                Err(_) => Inference::ok(CellValue::Character(raw.to_string())),
            }
        }
        TypeCode::Implicit => match raw.parse::<f64>() {
            Ok(num) if format.is_some_and(is_date_format) => {
                Inference::ok(CellValue::Date(DateTimeValue::from_serial(num, system)))
            }
            Ok(num) => Inference::ok(CellValue::Numeric(num)),
            Err(_) => Inference::degraded(
                CellValue::Character(raw.to_string()),
                format!("numeric cell content {raw:?} did not parse"),
            ),
        },
    }
}
