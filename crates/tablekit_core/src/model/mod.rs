//! Table mapping contract and read models.
//!
//! # Responsibility
//! - Define how a Rust type maps onto one SQLite table (`Table`).
//! - Define what a query yields: a decoded model or a column projection.
//!
//! # Invariants
//! - `Table::NAME`, `Table::COLUMNS` and `Table::PRIMARY_KEY` are valid SQL
//!   identifiers; they are validated again whenever SQL is rendered.
//! - `insert_values` only names columns listed in `Table::COLUMNS`.

use crate::query::expr::Column;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Mapping between a Rust record type and one SQLite table.
///
/// Implementations decode rows by column name, so `from_row` works for any
/// `SELECT "table".*` result regardless of physical column order.
pub trait Table: Sized {
    /// Physical table name.
    const NAME: &'static str;
    /// Every mapped column, including the primary key.
    const COLUMNS: &'static [&'static str];
    /// Primary-key column used by id lookups, updates and deletes.
    const PRIMARY_KEY: &'static str = "id";

    /// Decodes one full-width row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Column/value pairs written on insert.
    ///
    /// Omit the primary key to let SQLite assign a rowid.
    fn insert_values(&self) -> Vec<(&'static str, Value)>;

    /// Primary-key value identifying this record in storage.
    fn primary_key_value(&self) -> Value;

    /// Reference to the primary-key column.
    fn id() -> Column {
        Column::new(Self::NAME, Self::PRIMARY_KEY)
    }

    /// Reference to a named column of this table.
    fn column(name: &str) -> Column {
        Column::new(Self::NAME, name)
    }
}

/// One result row of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Record<T> {
    /// Full row decoded through `Table::from_row`.
    Model(T),
    /// Row restricted by a column filter.
    Projection(Projection),
}

impl<T> Record<T> {
    pub fn as_model(&self) -> Option<&T> {
        match self {
            Self::Model(model) => Some(model),
            Self::Projection(_) => None,
        }
    }

    pub fn into_model(self) -> Option<T> {
        match self {
            Self::Model(model) => Some(model),
            Self::Projection(_) => None,
        }
    }

    pub fn as_projection(&self) -> Option<&Projection> {
        match self {
            Self::Model(_) => None,
            Self::Projection(projection) => Some(projection),
        }
    }
}

/// Ordered column-name/value pairs produced by `with_entities`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Projection {
    pub(crate) fn from_row(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        let mut values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            values.push(row.get::<_, Value>(index)?);
        }
        Ok(Self {
            columns: columns.to_vec(),
            values,
        })
    }

    /// Returns the value of the first column named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|column| column == name)
            .map(|index| &self.values[index])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// Serialized as a JSON-like object keyed by column name.
impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            match value {
                Value::Null => map.serialize_entry(column, &())?,
                Value::Integer(number) => map.serialize_entry(column, number)?,
                Value::Real(number) => map.serialize_entry(column, number)?,
                Value::Text(text) => map.serialize_entry(column, text)?,
                Value::Blob(bytes) => map.serialize_entry(column, bytes)?,
            }
        }
        map.end()
    }
}
