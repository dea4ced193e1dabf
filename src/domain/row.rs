//! Row and page models
//!
//! The table schema is not known ahead of time, so a row is an ordered list
//! of `(column name, value)` pairs discovered from the result set. Values are
//! kept as text; `None` is SQL `NULL`.

use super::errors::DataSourceError;
use super::ids::RowId;
use super::result::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A single column value within a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name
    pub name: String,

    /// Textual value, `None` for NULL
    pub value: Option<String>,
}

impl Field {
    /// Creates a new field
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One exported row
///
/// `id` is the parsed value of the identifier column, which is also present
/// among `fields` so it is written to the artifact like any other column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Identifier of this row
    pub id: RowId,

    /// Columns in result-set order
    pub fields: Vec<Field>,
}

impl Row {
    /// Creates a new row
    pub fn new(id: RowId, fields: Vec<Field>) -> Self {
        Self { id, fields }
    }

    /// Assembles a row from result-set fields, parsing the identifier from
    /// `id_column`
    ///
    /// # Errors
    ///
    /// Returns [`DataSourceError::MissingIdColumn`] when the column is absent
    /// and [`DataSourceError::InvalidId`] when its value is NULL or not a
    /// non-negative integer.
    pub fn from_fields(id_column: &str, fields: Vec<Field>) -> Result<Self> {
        let id_field = fields
            .iter()
            .find(|f| f.name == id_column)
            .ok_or_else(|| DataSourceError::MissingIdColumn(id_column.to_string()))?;

        let id = id_field
            .value
            .as_deref()
            .and_then(|v| RowId::from_str(v).ok())
            .ok_or_else(|| DataSourceError::InvalidId {
                column: id_column.to_string(),
                value: id_field.value.clone(),
            })?;

        Ok(Self::new(id, fields))
    }

    /// Column names in the order they appear in this row
    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Looks up a field by column name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One bounded batch of rows, ascending by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Rows in fetch order
    pub rows: Vec<Row>,
}

impl Page {
    /// Creates a page from rows
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// An empty page, the end-of-data signal
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the page carries no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Identifier of the last row, the lower bound for the next page
    pub fn last_id(&self) -> Option<RowId> {
        self.rows.last().map(|r| r.id)
    }

    /// Header for an artifact that starts with this page
    pub fn column_names(&self) -> Option<Vec<String>> {
        self.rows.first().map(Row::column_names)
    }

    /// Checks the keyset pagination contract for a page fetched after
    /// `lower_bound` with `limit`
    ///
    /// Ids must be strictly increasing, all greater than `lower_bound`, and
    /// the page must not exceed `limit` rows.
    pub fn check_contract(
        &self,
        lower_bound: RowId,
        limit: usize,
    ) -> std::result::Result<(), String> {
        if self.rows.len() > limit {
            return Err(format!(
                "page has {} rows but the limit was {}",
                self.rows.len(),
                limit
            ));
        }

        let mut previous = lower_bound;
        for row in &self.rows {
            if row.id <= previous {
                return Err(format!(
                    "row id {} does not follow {} (lower bound {})",
                    row.id, previous, lower_bound
                ));
            }
            previous = row.id;
        }

        Ok(())
    }
}
