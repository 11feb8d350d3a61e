//! Persisted data model: tables, columns, rows, cell values, and views.
//!
//! Every type in this module is stored as-is through the partitioned store,
//! serialized as a JSON document. The shapes are unversioned; changing them
//! requires an externally-defined migration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Page size assigned to the view of a freshly created table.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Supported column data types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Variable-length text
    String,
    /// Double-precision floating point numbers
    Number,
    /// Boolean values (true/false)
    Boolean,
    /// Calendar date and time, UTC
    Date,
    /// Arbitrary JSON documents, kept as text
    Json,
}

impl ColumnType {
    /// Returns the string representation of the column type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Json => "json",
        }
    }
}

/// A typed, uniquely-identified field definition within a table.
///
/// Column ids are unique within their table and immutable after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
}

impl Column {
    /// Creates a column with a freshly generated unique identifier.
    pub fn new(name: &str, kind: ColumnType) -> Column {
        Column {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            kind,
        }
    }
}

/// A single cell value. `Null` uniformly represents "no value" for all
/// column types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Cell values of one row keyed by column id. A missing key is equivalent
/// to `Value::Null`.
pub type RowData = HashMap<Uuid, Value>;

/// One record of column-keyed values within a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: RowData,
}

impl Row {
    /// Returns the value stored under `column_id`, treating a missing key
    /// as null.
    pub fn value(&self, column_id: &Uuid) -> &Value {
        self.data.get(column_id).unwrap_or(&Value::Null)
    }
}

/// Single-column sort descriptor. At most one is active per view.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub column_id: Uuid,
    pub descending: bool,
}

/// Persisted interactive presentation state for a table.
///
/// `sort` and `group`, when present, reference a column id that exists in
/// the owning table. Visibility and sizing keys are a subset of the table's
/// columns; extra entries are tolerated but meaningless. The interactive
/// page index is deliberately absent: it resets to zero whenever a view is
/// applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Uuid>,
    pub page_size: u32,
    pub column_visibility: HashMap<Uuid, bool>,
    pub column_sizing: HashMap<Uuid, u32>,
}

impl Default for View {
    /// The view a freshly created table starts with.
    fn default() -> View {
        View {
            sort: None,
            group: None,
            page_size: DEFAULT_PAGE_SIZE,
            column_visibility: HashMap::new(),
            column_sizing: HashMap::new(),
        }
    }
}

/// A named, versionless collection of typed columns and rows plus one
/// persisted view. The view is the only part mutated in place after
/// creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub columns: Vec<Column>,
    pub view: View,
}

impl Table {
    /// Looks up a column definition by id.
    pub fn column(&self, id: &Uuid) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == *id)
    }
}
