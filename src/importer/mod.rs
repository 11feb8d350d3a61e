//! # File Ingestion Pipeline
//!
//! Turns raw file content into a typed column schema and normalized row
//! data. Two input families are accepted: spreadsheet container files
//! (.xlsx, .xlsm) and delimited text; only the first worksheet of a
//! container document is read. Column types are inferred by sampling the
//! first data row, and every cell is normalized through its column's
//! transform into the crate's value model.

mod cell;
mod delimited;
mod inference;
mod sheet;
mod xlsx;

use crate::model::{Column, RowData};
use thiserror::Error;

/// Maximum accepted input size (5 MiB). Larger inputs are rejected before
/// any read.
pub const MAX_INPUT_SIZE: usize = 5 * 1024 * 1024;

/// ZIP local-file-header magic; selects the spreadsheet-container path.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Errors raised while reading or normalizing file content. Imports are
/// never retried and never partially recovered.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Input larger than [`MAX_INPUT_SIZE`]
    #[error("File of {0} bytes exceeds the 5 MiB import limit")]
    FileTooLargeError(usize),

    /// Input is neither a readable container nor decodable text
    #[error("Unsupported or unreadable file content")]
    UnsupportedFormatError,

    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("Parse entity '{0}' failed")]
    XmlEntityError(String),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    /// A required document is absent from the container archive
    #[error("Missing '{0}' in spreadsheet archive")]
    MissingEntryError(String),

    /// The container holds no worksheet at all
    #[error("Spreadsheet contains no worksheet")]
    MissingWorksheetError,

    /// Sheet exists but contains no data
    #[error("Empty sheet or missing data")]
    EmptySheetError,

    /// Column header is missing or blank
    #[error("Missing column name at '{position}'")]
    MissingHeaderColumnError { position: String },
}

/// Result of a successful import: an optional document title, the inferred
/// column schema, and every row normalized into column-id-keyed values.
#[derive(Debug)]
pub struct Import {
    pub title: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<RowData>,
}

/// Reads raw file content into a typed column schema and row set.
///
/// The format is detected from the content itself: a ZIP magic selects the
/// spreadsheet-container path, anything else is decoded as delimited text.
pub fn read(input: &[u8]) -> Result<Import, ParseError> {
    if input.len() > MAX_INPUT_SIZE {
        return Err(ParseError::FileTooLargeError(input.len()));
    }

    let sheet = if input.starts_with(ZIP_MAGIC) {
        xlsx::read_sheet(input)?
    } else {
        delimited::read_sheet(input)?
    };
    inference::normalize(&sheet)
}
