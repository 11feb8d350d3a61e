//! Crate-level error type.
//! Aggregates errors from the importer, the partitioned store, and the
//! repository's read paths into one uniform failure value for callers.

use crate::importer::ParseError;
use crate::store::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the turbotable crate.
#[derive(Error, Debug)]
pub enum TurboTableError {
    /// File content unreadable or in an unsupported format; never retried
    #[error("{0}")]
    ParseError(#[from] ParseError),

    /// Underlying persistence failure
    #[error("{0}")]
    StorageError(#[from] StorageError),

    /// A read path assumed a table that does not exist
    #[error("Table '{0}' not found")]
    TableNotFoundError(Uuid),

    /// A read path assumed a row that does not exist
    #[error("Row '{0}' not found")]
    RowNotFoundError(Uuid),
}
