//! Spreadsheet container (.xlsx, .xlsm) parsing.
//!
//! Reads the workbook structure, shared strings, and number formats, then
//! extracts the cells of the first worksheet. Number formats matter because
//! serial dates are plain numbers in the file; only the format applied to a
//! cell reveals them as dates.

use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::importer::cell::{Cell, CellType};
use crate::importer::sheet::Sheet;
use crate::importer::ParseError;
use crate::match_xml_events;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use std::io::Cursor;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names used while parsing the container documents
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");
const TAG_ROW: QName = QName(b"row");

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;
type EntryReader<'a, 'b> = XmlReader<BufReader<ZipFile<'a, Cursor<&'b [u8]>>>>;

/// Parses the first worksheet of a container document into a [`Sheet`],
/// along with the document title when one is present.
pub(crate) fn read_sheet(input: &[u8]) -> Result<Sheet, ParseError> {
    let mut zip = ZipArchive::new(Cursor::new(input))?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    let (_, sheet_path) = sheets
        .into_iter()
        .next()
        .ok_or(ParseError::MissingWorksheetError)?;
    let number_formats = load_number_formats(&mut zip, is_1904)?;
    let shared_strings = load_shared_strings(&mut zip)?;
    let title = load_title(&mut zip)?;
    read_worksheet(&mut zip, &sheet_path, &number_formats, &shared_strings, title)
}

/// Loads worksheet relationships, mapping relationship ids to worksheet
/// paths within the archive.
fn load_relationships(zip: &mut Archive, path: &str) -> Result<HashMap<String, String>, ParseError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| ParseError::MissingEntryError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheet relationships matter here
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Loads workbook structure: worksheet (name, path) pairs in workbook
/// order, and whether the 1904 date system is in effect.
fn load_workbook(zip: &mut Archive) -> Result<(Vec<(String, String)>, bool), ParseError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| ParseError::MissingEntryError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id.to_string()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats from styles.xml: for every cell style index, the
/// cell classification its format implies.
fn load_number_formats(zip: &mut Archive, is_1904: bool) -> Result<Vec<CellType>, ParseError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if !custom_formats_context && event.name() == TAG_CUSTOM_FORMATS => {
            custom_formats_context = true;
        }
        Event::End(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMATS => {
            custom_formats_context = false;
        }
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let kind = CellType::parse_custom_number_format(&format, is_1904);
                custom_formats.insert(id.to_string(), kind);
            }
        }

        Event::Start(event) if !format_indexes_context && event.name() == TAG_FORMAT_INDEXES => {
            format_indexes_context = true;
        }
        Event::End(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEXES => {
            format_indexes_context = false;
        }
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            if let Some(id) = event.get_attribute_value("numFmtId")? {
                format_indexes.push(id.to_string());
            }
        }
    });

    let number_formats = format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect();
    Ok(number_formats)
}

/// Loads the shared string table. Worksheet cells reference these strings
/// by index to avoid repeating the same text.
fn load_shared_strings(zip: &mut Archive) -> Result<Vec<String>, ParseError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Reads the document title from the core document properties, when the
/// archive carries them.
fn load_title(zip: &mut Archive) -> Result<Option<String>, ParseError> {
    let mut reader = match zip.xml_reader("docProps/core.xml")? {
        Some(reader) => reader,
        None => return Ok(None),
    };

    let mut in_title = false;
    let mut title = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == b"title" => in_title = true,
        Event::End(event) if event.local_name().as_ref() == b"title" => break,
        Event::Text(event) if in_title => title.push_str(&event.xml_content()?),
        Event::CData(event) if in_title => title.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if in_title => title.push_bytes_ref(&event)?,
    });
    Ok(Some(title).filter(|title| !title.is_empty()))
}

/// Extracts the cells of one worksheet into a [`Sheet`].
///
/// Cell positions come from the `r` attribute when present, otherwise from
/// document order. Cell elements without a value are kept as empty cells:
/// a stored blank drives the null transform during type inference.
fn read_worksheet(
    zip: &mut Archive,
    sheet_path: &str,
    number_formats: &[CellType],
    shared_strings: &[String],
    title: Option<String>,
) -> Result<Sheet, ParseError> {
    let mut reader = zip
        .xml_reader(sheet_path)?
        .ok_or_else(|| ParseError::MissingEntryError(sheet_path.to_string()))?;

    let mut sheet = Sheet::new(title);
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = CellType::default();
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
            col_count = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count += 1;
            kind = event.get_attribute_value("t")?.map(|t| {
                match t.as_ref() {
                    "inlineStr" | "str" => CellType::InlineString,
                    "s" => CellType::SharedString,
                    "d" => CellType::IsoDateTime,
                    "b" => CellType::Boolean,
                    "e" => CellType::Error,
                    _ => CellType::Number,
                }
            }).unwrap_or(CellType::Number);
            if let Some(format_id) = event.get_attribute_value("s")? {
                if kind == CellType::Number && !format_id.is_empty() {
                    let index = format_id.parse::<usize>()?;
                    kind = number_formats.get(index).copied().unwrap_or(CellType::Number);
                }
            }
            value.clear();
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            let cell = if value.is_empty() {
                Cell { row, col, kind: CellType::Empty, value: String::new() }
            } else if kind == CellType::SharedString {
                let index = value.parse::<usize>()?;
                let resolved = shared_strings.get(index).cloned().unwrap_or_default();
                Cell { row, col, kind, value: resolved }
            } else {
                Cell { row, col, kind, value: value.to_owned() }
            };
            sheet.push(cell);
            value.clear();
        }
    });

    if sheet.is_empty() {
        Err(ParseError::EmptySheetError)
    } else {
        Ok(sheet)
    }
}

/// Reads string content from XML, handling text and CDATA sections and
/// skipping phonetic annotations.
fn read_string_value(
    reader: &mut EntryReader,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, ParseError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// Normalizes a relationship target to its location within the archive.
fn to_zip_path(path: Cow<'_, str>) -> String {
    if path.starts_with("/xl/") {
        path[1..].to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Converts a spreadsheet-style cell reference (e.g. "B2") to 0-based
/// (row, column) indexes. Returns `None` for malformed references.
fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let digit = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(digit);
    if letters.is_empty() {
        return None;
    }

    let mut col = 0usize;
    for letter in letters.chars() {
        if !letter.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (letter as usize - 'A' as usize + 1);
    }
    let row = digits.parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row - 1, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_parsing() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("B2"), Some((1, 1)));
        assert_eq!(reference_to_index("AA10"), Some((9, 26)));
        assert_eq!(reference_to_index("10"), None);
        assert_eq!(reference_to_index("a1"), None);
        assert_eq!(reference_to_index("A0"), None);
    }

    #[test]
    fn zip_path_normalization() {
        assert_eq!(to_zip_path(Cow::from("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::from("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::from("xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
    }
}
