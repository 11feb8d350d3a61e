//! Column type inference and value normalization.
//!
//! Types are inferred from exactly the first data row: a native cell type
//! wins outright, a textual sample is tried as a date, then against the
//! boolean word lexicon, and defaults to string. Each column then gets one
//! transform that normalizes every raw cell beneath it.

use crate::importer::cell::{parse_datetime, Cell, CellType, Raw};
use crate::importer::sheet::Sheet;
use crate::importer::{Import, ParseError};
use crate::model::{Column, ColumnType, RowData, Value};

/// Words recognized as boolean true values.
const TRUE_WORDS: [&str; 12] = [
    "true", "True", "TRUE", "yes", "Yes", "YES", "Oui", "oui", "OUI", "on", "y", "t",
];

/// Words recognized as boolean false values.
const FALSE_WORDS: [&str; 12] = [
    "false", "False", "FALSE", "no", "No", "NO", "Non", "non", "NON", "off", "n", "f",
];

fn is_true_word(text: &str) -> bool {
    TRUE_WORDS.contains(&text)
}

fn is_boolean_word(text: &str) -> bool {
    TRUE_WORDS.contains(&text) || FALSE_WORDS.contains(&text)
}

/// Per-column normalization applied to every raw cell value.
///
/// Selected once per column from the sampled cell; `Null` is the transform
/// of columns whose sample was a formula error or a stored blank, and
/// swallows every later value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Transform {
    String,
    Number,
    Boolean,
    Date,
    Json,
    Null,
}

impl Transform {
    /// Normalizes one raw cell value.
    ///
    /// The boolean transform is total: it yields `true` for native true or
    /// a true-lexicon word and `false` for everything else, including
    /// unrecognized strings. The number and date transforms fall back to
    /// null instead.
    pub(crate) fn apply(&self, raw: &Raw) -> Value {
        match self {
            Transform::String | Transform::Json => match raw.to_text() {
                Some(text) => Value::String(text),
                None => Value::Null,
            },
            Transform::Number => match raw {
                Raw::Number(number) if number.is_finite() => Value::Number(*number),
                _ => Value::Null,
            },
            Transform::Boolean => match raw {
                Raw::Bool(value) => Value::Bool(*value),
                Raw::Text(text) => Value::Bool(is_true_word(text)),
                _ => Value::Bool(false),
            },
            Transform::Date => match raw {
                Raw::Date(datetime) => Value::Date(*datetime),
                Raw::Text(text) => match parse_datetime(text) {
                    Some(datetime) => Value::Date(datetime),
                    None => Value::Null,
                },
                _ => Value::Null,
            },
            Transform::Null => Value::Null,
        }
    }
}

/// Infers a column's type and transform from its sampled first-data-row
/// cell.
///
/// A missing sample leaves the column textual; a formula error or stored
/// blank keeps the declared type textual but routes every value to null.
fn infer(sample: Option<&Cell>) -> (ColumnType, Transform) {
    let cell = match sample {
        Some(cell) => cell,
        None => return (ColumnType::String, Transform::String),
    };
    match cell.kind {
        CellType::Empty | CellType::Error => (ColumnType::String, Transform::Null),
        CellType::Boolean => (ColumnType::Boolean, Transform::Boolean),
        CellType::Number => (ColumnType::Number, Transform::Number),
        CellType::SerialDate1900 | CellType::SerialDate1904 | CellType::IsoDateTime => {
            (ColumnType::Date, Transform::Date)
        }
        CellType::InlineString | CellType::SharedString => {
            if parse_datetime(&cell.value).is_some() {
                (ColumnType::Date, Transform::Date)
            } else if is_boolean_word(&cell.value) {
                (ColumnType::Boolean, Transform::Boolean)
            } else {
                (ColumnType::String, Transform::String)
            }
        }
    }
}

/// Normalizes a parsed sheet into columns and row data: extracts the
/// header, infers per-column types, assigns fresh column ids, and runs
/// every data cell through its column's transform.
pub(crate) fn normalize(sheet: &Sheet) -> Result<Import, ParseError> {
    let names = sheet.header()?;
    let header_row = sheet.header_row().ok_or(ParseError::EmptySheetError)?;

    let mut columns = Vec::<Column>::with_capacity(names.len());
    let mut transforms = Vec::<Transform>::with_capacity(names.len());
    for (name, col) in names.iter().zip(sheet.columns()) {
        let (kind, transform) = infer(sheet.get(header_row + 1, col));
        columns.push(Column::new(name, kind));
        transforms.push(transform);
    }

    let mut rows = Vec::<RowData>::new();
    for row in sheet.data_rows() {
        let mut data = RowData::new();
        let mut populated = false;
        for ((column, transform), col) in columns.iter().zip(&transforms).zip(sheet.columns()) {
            if let Some(cell) = sheet.get(row, col) {
                let raw = cell.to_raw();
                if raw != Raw::Empty {
                    populated = true;
                    data.insert(column.id, transform.apply(&raw));
                }
            }
        }
        // Rows without any stored cell are not records at all
        if populated {
            rows.push(data);
        }
    }

    Ok(Import {
        title: sheet.title.clone(),
        columns,
        rows,
    })
}
