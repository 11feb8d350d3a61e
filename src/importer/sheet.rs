//! In-memory grid of parsed cells with data boundaries and header access.

use crate::importer::cell::{Cell, CellType};
use crate::importer::ParseError;
use std::collections::HashMap;

/// A parsed sheet: all cells of the first table of the document, with the
/// bounds of the populated area and an index for position lookup.
#[derive(Debug, Default)]
pub(crate) struct Sheet {
    /// Document title, when the source format carries one
    pub(crate) title: Option<String>,
    /// All parsed cells
    cells: Vec<Cell>,
    /// Index mapping from (row, column) to cell vector position
    indexes: HashMap<(usize, usize), usize>,
    row_lower_bound: Option<usize>,
    row_upper_bound: Option<usize>,
    col_lower_bound: Option<usize>,
    col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(title: Option<String>) -> Sheet {
        Sheet {
            title,
            ..Sheet::default()
        }
    }

    /// Adds a cell, updating data boundaries. A cell pushed at an occupied
    /// position replaces the earlier one.
    pub(crate) fn push(&mut self, cell: Cell) {
        let position = (cell.row, cell.col);
        self.update_bounds(cell.row, cell.col);
        match self.indexes.get(&position) {
            Some(index) => self.cells[*index] = cell,
            None => {
                self.indexes.insert(position, self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    fn update_bounds(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|bound| row < bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|bound| bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|bound| col < bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|bound| bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Gets a cell at the specified position, if one was parsed there.
    pub(crate) fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes
            .get(&(row, col))
            .and_then(|index| self.cells.get(*index))
    }

    /// First populated row; the header row by contract.
    pub(crate) fn header_row(&self) -> Option<usize> {
        self.row_lower_bound
    }

    /// Row indexes of the data rows (everything after the header).
    pub(crate) fn data_rows(&self) -> impl Iterator<Item = usize> {
        let lower = self.row_lower_bound.map(|row| row + 1).unwrap_or(1);
        let upper = self.row_upper_bound.map(|row| row + 1).unwrap_or(0);
        lower..upper
    }

    /// Column indexes of the populated area.
    pub(crate) fn columns(&self) -> impl Iterator<Item = usize> {
        let lower = self.col_lower_bound.unwrap_or(0);
        let upper = self.col_upper_bound.map(|col| col + 1).unwrap_or(0);
        lower..upper
    }

    /// Extracts the header row: the stringified cells of the first
    /// populated row, in column order.
    ///
    /// Fails when the sheet is empty or a header cell is missing or blank;
    /// every column needs a name.
    pub(crate) fn header(&self) -> Result<Vec<String>, ParseError> {
        let header_row = self.header_row().ok_or(ParseError::EmptySheetError)?;
        self.columns()
            .map(|col| {
                self.get(header_row, col)
                    .filter(|cell| cell.kind != CellType::Empty)
                    .and_then(|cell| cell.to_raw().to_text())
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| ParseError::MissingHeaderColumnError {
                        position: cell_reference(header_row, col),
                    })
            })
            .collect()
    }
}

/// Converts 0-based row & column indexes to a spreadsheet-style cell
/// reference (e.g. `(1, 1)` → `"B2"`), used in error messages.
pub(crate) fn cell_reference(row: usize, col: usize) -> String {
    let row = (row + 1).to_string();
    let mut col = col as u32 + 1;
    let mut reference = String::new();
    while col > 0 {
        col -= 1;
        let digit = char::from_u32(65 + col % 26).expect("letter");
        col /= 26;
        reference.insert(0, digit);
    }
    reference.push_str(row.as_str());
    reference
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(row: usize, col: usize, value: &str) -> Cell {
        Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        }
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new(None);
        assert!(sheet.is_empty());
        assert!(sheet.header_row().is_none());
        assert_eq!(sheet.data_rows().count(), 0);
        assert_eq!(sheet.columns().count(), 0);
    }

    #[test]
    fn sheet_bounds() {
        let mut sheet = Sheet::new(None);
        sheet.push(text(1, 1, "a"));
        sheet.push(text(1, 3, "b"));
        sheet.push(text(3, 1, "c"));
        sheet.push(text(3, 3, "d"));

        assert_eq!(sheet.header_row(), Some(1));
        assert_eq!(sheet.data_rows().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(sheet.columns().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(sheet.get(2, 2).is_none());
        assert_eq!(sheet.get(3, 3).unwrap().value, "d");
    }

    #[test]
    fn pushing_twice_replaces() {
        let mut sheet = Sheet::new(None);
        sheet.push(text(0, 0, "first"));
        sheet.push(text(0, 0, "second"));
        assert_eq!(sheet.get(0, 0).unwrap().value, "second");
    }

    #[test]
    fn header_names() {
        let mut sheet = Sheet::new(None);
        sheet.push(text(0, 0, "name"));
        sheet.push(text(0, 1, "age"));
        sheet.push(text(1, 0, "Alice"));
        assert_eq!(sheet.header().unwrap(), vec!["name", "age"]);
    }

    #[test]
    fn header_with_gap_fails() {
        let mut sheet = Sheet::new(None);
        sheet.push(text(0, 0, "name"));
        sheet.push(text(0, 2, "age"));
        let error = sheet.header().unwrap_err();
        assert!(error.to_string().contains("B1"));
    }

    #[test]
    fn references() {
        assert_eq!(cell_reference(0, 0), "A1");
        assert_eq!(cell_reference(1, 1), "B2");
        assert_eq!(cell_reference(0, 26), "AA1");
    }
}
