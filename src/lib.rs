//! # TurboTable
//!
//! A local-first data layer for spreadsheet-like tables: ingest a file,
//! infer a typed column schema, persist tables and rows in partitioned
//! local storage, and keep interactive grid state synchronized with the
//! persisted view across sessions.
//!
//! ## Features
//!
//! - **Multi-format ingestion**: spreadsheet containers (`.xlsx`, `.xlsm`,
//!   first worksheet only) and delimited text with a sniffed delimiter
//! - **Type inference**: string, number, boolean, and date column types
//!   detected from the first data row, including serial-date number
//!   formats and a multilingual boolean word lexicon
//! - **Partitioned persistence**: one storage partition per logical
//!   collection, so dropping a table's rows is a single partition destroy
//! - **View synchronization**: sort, grouping, pagination, column
//!   visibility, and sizing propagate to storage only when state actually
//!   changed
//!
//! ## Example
//!
//! ```no_run
//! use turbotable::TableRepository;
//!
//! # fn main() -> Result<(), turbotable::TurboTableError> {
//! let repository = TableRepository::open("./data")?;
//! let table_id = repository.import_table("people.csv", b"name,age\nAlice,34\n")?;
//! let table = repository.require_table(&table_id)?;
//! assert_eq!(table.columns.len(), 2);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod grid;
mod helpers;
pub mod importer;
mod model;
mod repository;
pub mod store;

pub use crate::error::TurboTableError;
pub use crate::grid::{GridColumn, GridState, Pagination, ViewSync};
pub use crate::importer::{Import, ParseError};
pub use crate::model::{
    Column, ColumnType, Row, RowData, SortRule, Table, Value, View, DEFAULT_PAGE_SIZE,
};
pub use crate::repository::TableRepository;
pub use crate::store::{Partition, Record, StorageError, StoreRegistry};
