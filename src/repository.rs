//! Table and row domain operations over the partitioned store.
//!
//! Two partition families are used: a single `tables` partition holding
//! every table record, and one `rows/<table-id>` partition per table. The
//! partitioning bounds every row operation's scan to one table and turns
//! "delete all rows of a table" into a single partition destroy.
//!
//! Every read-modify-write in this module is last-write-wins: there is no
//! optimistic-concurrency check, so two concurrent writers to the same
//! table's view or the same row's data can silently lose one write.

use crate::error::TurboTableError;
use crate::importer;
use crate::model::{Column, Row, RowData, Table, Value, View};
use crate::store::{Record, StoreRegistry};
use chrono::Utc;
use log::warn;
use uuid::Uuid;

/// Namespace of the partition holding every table record.
const TABLES_NAMESPACE: &str = "tables";

/// Namespace of the partition holding one table's rows.
fn rows_namespace(table_id: &Uuid) -> String {
    format!("rows/{table_id}")
}

impl Record for Table {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Record for Row {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Domain operations over tables and their rows. Owns the partition-handle
/// registry; all persistence flows through it.
pub struct TableRepository {
    stores: StoreRegistry,
}

impl TableRepository {
    /// Creates a repository over an existing registry.
    pub fn new(stores: StoreRegistry) -> TableRepository {
        TableRepository { stores }
    }

    /// Opens a repository rooted at `dir`.
    pub fn open(dir: impl AsRef<std::path::Path>) -> Result<TableRepository, TurboTableError> {
        Ok(TableRepository::new(StoreRegistry::open(dir)?))
    }

    /// The underlying partition registry.
    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    /// Creates a table with a default view and persists the given rows
    /// into its row partition. Returns the new table id.
    ///
    /// The table record is written before its rows, and the multi-step
    /// write is not atomic: a failure partway through leaves a table with
    /// a partial row set, which a later listing simply reflects. The
    /// caller can delete the table and retry.
    pub fn create_table(
        &self,
        name: &str,
        columns: Vec<Column>,
        data: Vec<RowData>,
    ) -> Result<Uuid, TurboTableError> {
        let created_at = Utc::now();
        let table = Table {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            created_at,
            updated_at: created_at,
            columns,
            view: View::default(),
        };
        self.stores.partition(TABLES_NAMESPACE)?.set_item(&table)?;

        let rows = self.stores.partition(&rows_namespace(&table.id))?;
        for data in data {
            rows.set_item(&Row {
                id: Uuid::new_v4(),
                created_at,
                updated_at: created_at,
                data,
            })?;
        }
        Ok(table.id)
    }

    /// Imports file content as a new table. The table is named after the
    /// document title when the file carries one, else after `file_name`.
    pub fn import_table(&self, file_name: &str, content: &[u8]) -> Result<Uuid, TurboTableError> {
        let import = importer::read(content)?;
        let name = import.title.as_deref().unwrap_or(file_name);
        self.create_table(name, import.columns, import.rows)
    }

    /// Point lookup of a table record.
    pub fn get_table(&self, table_id: &Uuid) -> Result<Option<Table>, TurboTableError> {
        let table = self
            .stores
            .partition(TABLES_NAMESPACE)?
            .get_item(&table_id.to_string())?;
        Ok(table)
    }

    /// Looks up a table the caller assumes to exist; absence is an error.
    pub fn require_table(&self, table_id: &Uuid) -> Result<Table, TurboTableError> {
        self.get_table(table_id)?
            .ok_or(TurboTableError::TableNotFoundError(*table_id))
    }

    /// Lists all tables, most recently created first.
    pub fn get_tables(&self) -> Result<Vec<Table>, TurboTableError> {
        let mut tables: Vec<Table> = self.stores.partition(TABLES_NAMESPACE)?.get_all()?;
        tables.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tables)
    }

    /// Deletes a table record, then destroys its row partition.
    ///
    /// The two steps are independent: when the partition destroy fails the
    /// table record stays removed and the failure is only logged. Cleanup
    /// is best-effort, not transactional.
    pub fn delete_table(&self, table_id: &Uuid) -> Result<(), TurboTableError> {
        self.stores
            .partition(TABLES_NAMESPACE)?
            .remove_item(&table_id.to_string())?;
        if let Err(error) = self.stores.destroy(&rows_namespace(table_id)) {
            warn!("failed to destroy row partition of table '{table_id}': {error}");
        }
        Ok(())
    }

    /// Replaces the table's persisted view. Updating a table that no
    /// longer exists is a silent no-op.
    pub fn update_view(&self, table_id: &Uuid, view: View) -> Result<(), TurboTableError> {
        if let Some(mut table) = self.get_table(table_id)? {
            table.view = view;
            self.stores.partition(TABLES_NAMESPACE)?.set_item(&table)?;
        }
        Ok(())
    }

    /// Point lookup of one row.
    pub fn get_row(&self, table_id: &Uuid, row_id: &Uuid) -> Result<Option<Row>, TurboTableError> {
        let row = self
            .stores
            .partition(&rows_namespace(table_id))?
            .get_item(&row_id.to_string())?;
        Ok(row)
    }

    /// Looks up a row the caller assumes to exist; absence is an error.
    pub fn require_row(&self, table_id: &Uuid, row_id: &Uuid) -> Result<Row, TurboTableError> {
        self.get_row(table_id, row_id)?
            .ok_or(TurboTableError::RowNotFoundError(*row_id))
    }

    /// Returns all rows of a table.
    pub fn get_rows(&self, table_id: &Uuid) -> Result<Vec<Row>, TurboTableError> {
        let rows = self.stores.partition(&rows_namespace(table_id))?.get_all()?;
        Ok(rows)
    }

    /// Deletes one row. Deleting an absent row is a no-op.
    pub fn delete_row(&self, table_id: &Uuid, row_id: &Uuid) -> Result<(), TurboTableError> {
        self.stores
            .partition(&rows_namespace(table_id))?
            .remove_item(&row_id.to_string())?;
        Ok(())
    }

    /// Sets one cell of one row and bumps the row's `updated_at`. Updating
    /// a row that no longer exists is a silent no-op.
    pub fn update_cell(
        &self,
        table_id: &Uuid,
        row_id: &Uuid,
        column_id: &Uuid,
        value: Value,
    ) -> Result<(), TurboTableError> {
        let partition = self.stores.partition(&rows_namespace(table_id))?;
        if let Some(mut row) = partition.get_item::<Row>(&row_id.to_string())? {
            row.updated_at = Utc::now();
            row.data.insert(*column_id, value);
            partition.set_item(&row)?;
        }
        Ok(())
    }
}
