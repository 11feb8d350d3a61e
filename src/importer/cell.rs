//! Raw cell model shared by the container and delimited parsers.
//!
//! A parsed cell carries its source classification and its value as text;
//! conversion to the typed data model happens later, once per-column
//! transforms have been selected.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Source classification of a parsed cell.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Plain numeric values
    Number,
    /// Date/time serial numbers counted from the 1900 epoch
    SerialDate1900,
    /// Date/time serial numbers counted from the 1904 epoch
    SerialDate1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Formula error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format ids to determine whether a
    /// numeric cell holds a serial date.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<CellType> {
        match id {
            "14" | "15" | "16" | "17" | "18" | "19" | "20" | "21" | "22" | "45" | "46" | "47" => {
                Some(if is_1904 { CellType::SerialDate1904 } else { CellType::SerialDate1900 })
            }
            _ => None,
        }
    }

    /// Parses a custom number format string, classifying formats with any
    /// date or time code as serial dates.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> CellType {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_datetime = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => is_datetime = true,
                _ => (),
            }
        }

        if is_datetime {
            if is_1904 {
                CellType::SerialDate1904
            } else {
                CellType::SerialDate1900
            }
        } else {
            CellType::Number
        }
    }
}

/// A raw cell value, decoded from its source representation but not yet
/// normalized through a column transform.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Raw {
    Empty,
    Bool(bool),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl Raw {
    /// Stringifies the value, the way the string transform renders it.
    /// Returns `None` for empty cells.
    pub(crate) fn to_text(&self) -> Option<String> {
        match self {
            Raw::Empty => None,
            Raw::Bool(value) => Some(value.to_string()),
            Raw::Number(value) => Some(value.to_string()),
            Raw::Date(value) => Some(value.to_rfc3339()),
            Raw::Text(value) => Some(value.to_owned()),
        }
    }
}

/// Represents a single parsed cell with position, classification, and value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell classification
    pub(crate) kind: CellType,
    /// Cell value as text
    pub(crate) value: String,
}

impl Cell {
    /// Decodes the cell into a raw value. Values that fail to decode under
    /// their declared classification degrade to text; formula errors keep
    /// their display text.
    pub(crate) fn to_raw(&self) -> Raw {
        match self.kind {
            CellType::Empty => Raw::Empty,
            CellType::Boolean => Raw::Bool(self.value == "1"),
            CellType::Number => match self.value.parse::<f64>() {
                Ok(number) => Raw::Number(number),
                Err(_) => Raw::Text(self.value.to_owned()),
            },
            CellType::SerialDate1900 | CellType::SerialDate1904 => {
                let is_1904 = self.kind == CellType::SerialDate1904;
                self.value
                    .parse::<f64>()
                    .ok()
                    .and_then(|serial| serial_to_datetime(serial, is_1904))
                    .map(Raw::Date)
                    .unwrap_or_else(|| Raw::Text(self.value.to_owned()))
            }
            CellType::IsoDateTime => parse_datetime(&self.value)
                .map(Raw::Date)
                .unwrap_or_else(|| Raw::Text(self.value.to_owned())),
            CellType::InlineString | CellType::SharedString | CellType::Error => {
                Raw::Text(self.value.to_owned())
            }
        }
    }
}

/// Converts an Excel serial number to a UTC date/time.
///
/// The 1900 epoch inherits the Lotus 1-2-3 leap-year bug: serials below 60
/// are shifted by one day so that serial 1 maps to 1900-01-01, and the
/// fictitious 1900-02-29 (serial 60) is skipped.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let serial = if is_1904 {
        serial + 1_462.0
    } else if serial < 60.0 {
        serial + 1.0
    } else {
        serial
    };
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let microseconds = (serial * 86_400_000_000f64).round() as i64;
    let datetime = base.checked_add_signed(Duration::microseconds(microseconds))?;
    Some(Utc.from_utc_datetime(&datetime))
}

/// Date/time formats attempted, in order, when parsing a textual value.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

/// Attempts to parse a textual value as a date, trying a fixed format list
/// so that identical input always yields an identical result.
pub(crate) fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&datetime));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            let datetime = date.and_hms_opt(0, 0, 0).expect("midnight");
            return Some(Utc.from_utc_datetime(&datetime));
        }
    }
    None
}
