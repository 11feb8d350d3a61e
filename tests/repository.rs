//! Integration tests for the table repository: create/read/delete flows,
//! cascade deletion, and view/cell read-modify-write behavior.

use anyhow::Result;
use std::collections::HashMap;
use std::thread::sleep;
use std::time::Duration;
use turbotable::{Column, ColumnType, RowData, SortRule, TableRepository, Value, View};
use uuid::Uuid;

fn people_columns() -> Vec<Column> {
    vec![
        Column::new("name", ColumnType::String),
        Column::new("age", ColumnType::Number),
    ]
}

fn people_rows(columns: &[Column]) -> Vec<RowData> {
    let mut alice = RowData::new();
    alice.insert(columns[0].id, Value::String("Alice".to_owned()));
    alice.insert(columns[1].id, Value::Number(34.0));
    let mut bob = RowData::new();
    bob.insert(columns[0].id, Value::String("Bob".to_owned()));
    bob.insert(columns[1].id, Value::Number(28.0));
    vec![alice, bob]
}

#[test]
fn create_and_read_back() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let columns = people_columns();
    let rows = people_rows(&columns);
    let table_id = repository.create_table("people", columns.clone(), rows.clone())?;

    let table = repository.require_table(&table_id)?;
    assert_eq!(table.name, "people");
    assert_eq!(table.columns, columns);
    assert_eq!(table.view, View::default());
    assert!(table.updated_at >= table.created_at);

    let mut stored = repository.get_rows(&table_id)?;
    assert_eq!(stored.len(), 2);
    for row in &stored {
        assert!(row.updated_at >= row.created_at);
    }
    // Same row data comes back, modulo generated row ids and timestamps
    stored.sort_by_key(|row| {
        row.value(&columns[0].id) == &Value::String("Bob".to_owned())
    });
    assert_eq!(stored[0].data, rows[0]);
    assert_eq!(stored[1].data, rows[1]);
    Ok(())
}

#[test]
fn tables_list_most_recent_first() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let first = repository.create_table("first", people_columns(), Vec::new())?;
    sleep(Duration::from_millis(5));
    let second = repository.create_table("second", people_columns(), Vec::new())?;

    let tables: Vec<Uuid> = repository
        .get_tables()?
        .into_iter()
        .map(|table| table.id)
        .collect();
    assert_eq!(tables, vec![second, first]);
    Ok(())
}

#[test]
fn delete_cascades_to_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let columns = people_columns();
    let rows = people_rows(&columns);
    let table_id = repository.create_table("people", columns, rows)?;
    assert_eq!(repository.get_rows(&table_id)?.len(), 2);

    repository.delete_table(&table_id)?;
    assert!(repository.get_table(&table_id)?.is_none());
    assert!(repository.get_rows(&table_id)?.is_empty());
    Ok(())
}

#[test]
fn missing_table_is_surfaced_on_require() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let absent = Uuid::new_v4();
    assert!(repository.get_table(&absent)?.is_none());
    assert!(repository.require_table(&absent).is_err());
    Ok(())
}

#[test]
fn update_view_is_idempotent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let columns = people_columns();
    let sort_column = columns[1].id;
    let table_id = repository.create_table("people", columns, Vec::new())?;

    let mut view = View::default();
    view.sort = Some(SortRule {
        column_id: sort_column,
        descending: true,
    });
    view.page_size = 50;
    view.column_sizing = HashMap::from([(sort_column, 240)]);

    repository.update_view(&table_id, view.clone())?;
    let once = repository.require_table(&table_id)?.view;
    repository.update_view(&table_id, view.clone())?;
    let twice = repository.require_table(&table_id)?.view;

    assert_eq!(once, view);
    assert_eq!(twice, view);
    Ok(())
}

#[test]
fn update_view_on_missing_table_is_a_no_op() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    repository.update_view(&Uuid::new_v4(), View::default())?;
    assert!(repository.get_tables()?.is_empty());
    Ok(())
}

#[test]
fn update_cell_bumps_updated_at() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let columns = people_columns();
    let age_column = columns[1].id;
    let rows = people_rows(&columns);
    let table_id = repository.create_table("people", columns, rows)?;

    let row = repository.get_rows(&table_id)?.into_iter().next().unwrap();
    sleep(Duration::from_millis(5));
    repository.update_cell(&table_id, &row.id, &age_column, Value::Number(35.0))?;

    let updated = repository.require_row(&table_id, &row.id)?;
    assert_eq!(updated.value(&age_column), &Value::Number(35.0));
    assert!(updated.updated_at > row.updated_at);
    assert_eq!(updated.created_at, row.created_at);
    Ok(())
}

#[test]
fn update_cell_on_missing_row_is_a_no_op() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let table_id = repository.create_table("people", people_columns(), Vec::new())?;
    repository.update_cell(&table_id, &Uuid::new_v4(), &Uuid::new_v4(), Value::Null)?;
    assert!(repository.get_rows(&table_id)?.is_empty());
    Ok(())
}

#[test]
fn delete_row_removes_only_that_row() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let repository = TableRepository::open(dir.path())?;

    let columns = people_columns();
    let rows = people_rows(&columns);
    let table_id = repository.create_table("people", columns, rows)?;

    let row = repository.get_rows(&table_id)?.into_iter().next().unwrap();
    repository.delete_row(&table_id, &row.id)?;
    assert!(repository.get_row(&table_id, &row.id)?.is_none());
    assert_eq!(repository.get_rows(&table_id)?.len(), 1);

    // Deleting again is a no-op
    repository.delete_row(&table_id, &row.id)?;
    Ok(())
}

#[test]
fn tables_survive_reopening_the_repository() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let columns = people_columns();
    let rows = people_rows(&columns);

    let table_id = {
        let repository = TableRepository::open(dir.path())?;
        repository.create_table("people", columns, rows)?
    };

    let reopened = TableRepository::open(dir.path())?;
    let table = reopened.require_table(&table_id)?;
    assert_eq!(table.name, "people");
    assert_eq!(reopened.get_rows(&table_id)?.len(), 2);
    Ok(())
}
