//! Delimited text parsing.
//!
//! The delimiter is sniffed from the header line; fields are classified the
//! way a spreadsheet application types freshly entered text: numbers and
//! boolean literals become native values, everything else stays a string.
//! Empty fields produce no cell at all, so a missing value stays
//! distinguishable from a stored blank.

use crate::importer::cell::{Cell, CellType};
use crate::importer::sheet::Sheet;
use crate::importer::ParseError;
use encoding_rs::Encoding;
use encoding_rs::UTF_8;

/// Delimiters considered during sniffing, first match wins ties.
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Parses delimited text into a [`Sheet`]. Delimited input never carries a
/// document title.
pub(crate) fn read_sheet(input: &[u8]) -> Result<Sheet, ParseError> {
    let text = decode(input)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&text))
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut sheet = Sheet::new(None);
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        for (col, field) in record.iter().enumerate() {
            if let Some(cell) = classify(row, col, field) {
                sheet.push(cell);
            }
        }
    }

    if sheet.is_empty() {
        Err(ParseError::EmptySheetError)
    } else {
        Ok(sheet)
    }
}

/// Decodes input bytes to text, honoring a BOM when present and assuming
/// UTF-8 otherwise. Undecodable content is rejected rather than imported
/// as mojibake.
fn decode(input: &[u8]) -> Result<String, ParseError> {
    let encoding = Encoding::for_bom(input)
        .map(|(encoding, _)| encoding)
        .unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(input);
    if had_errors {
        Err(ParseError::UnsupportedFormatError)
    } else {
        Ok(text.into_owned())
    }
}

/// Picks the delimiter occurring most often in the header line. Falls back
/// to a comma when nothing matches.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    DELIMITERS
        .into_iter()
        .map(|delimiter| {
            let count = header.bytes().filter(|byte| *byte == delimiter).count();
            (delimiter, count)
        })
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map(|(delimiter, _)| delimiter)
        .unwrap_or(b',')
}

/// Classifies one field. Empty fields yield no cell; `true`/`false`
/// literals become native booleans; anything that parses as a finite
/// number becomes a native number.
fn classify(row: usize, col: usize, field: &str) -> Option<Cell> {
    if field.is_empty() {
        return None;
    }

    if field.eq_ignore_ascii_case("true") || field.eq_ignore_ascii_case("false") {
        let value = if field.eq_ignore_ascii_case("true") { "1" } else { "0" };
        return Some(Cell {
            row,
            col,
            kind: CellType::Boolean,
            value: value.to_owned(),
        });
    }

    match field.parse::<f64>() {
        Ok(number) if number.is_finite() => Some(Cell {
            row,
            col,
            kind: CellType::Number,
            value: field.to_owned(),
        }),
        _ => Some(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: field.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::cell::Raw;

    #[test]
    fn sniffs_most_frequent_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c"), b',');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("a;b;c,d"), b';');
        assert_eq!(sniff_delimiter("a|b|c"), b'|');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn classifies_fields() {
        assert!(classify(0, 0, "").is_none());
        assert_eq!(classify(0, 0, "34").unwrap().kind, CellType::Number);
        assert_eq!(classify(0, 0, "3.5e2").unwrap().kind, CellType::Number);
        assert_eq!(classify(0, 0, "TRUE").unwrap().to_raw(), Raw::Bool(true));
        assert_eq!(classify(0, 0, "false").unwrap().to_raw(), Raw::Bool(false));
        assert_eq!(classify(0, 0, "yes").unwrap().kind, CellType::InlineString);
        assert_eq!(classify(0, 0, "NaN").unwrap().kind, CellType::InlineString);
    }

    #[test]
    fn reads_semicolon_delimited_input() {
        let sheet = read_sheet(b"name;age\nAlice;34\n").expect("sheet");
        assert_eq!(sheet.header().unwrap(), vec!["name", "age"]);
        assert_eq!(sheet.get(1, 1).unwrap().to_raw(), Raw::Number(34.0));
    }

    #[test]
    fn decodes_utf8_bom() {
        let mut input = vec![0xef, 0xbb, 0xbf];
        input.extend_from_slice(b"name\nAlice\n");
        let sheet = read_sheet(&input).expect("sheet");
        assert_eq!(sheet.header().unwrap(), vec!["name"]);
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(read_sheet(b""), Err(ParseError::EmptySheetError)));
    }
}
