//! Ordered column/value payloads for INSERT, UPDATE and upserts.

use serde::Serialize;

use crate::error::{DatabaseError, Result};
use crate::value::{SqlValue, ToSqlValue};

/// An ordered set of `column => value` pairs.
///
/// Column order is preserved and drives the column list of the generated
/// statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, SqlValue)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Sets a column, replacing a previous value for the same column.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a column in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl ToSqlValue) {
        let column = column.into();
        let value = value.to_sql_value();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Builds a record from any serializable struct or map.
    ///
    /// Field order follows the serialized order.
    ///
    /// # Errors
    ///
    /// Fails when `data` does not serialize to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        match serde_json::to_value(data)? {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, SqlValue::from(v)))
                .collect()),
            other => Err(DatabaseError::InvalidArgument(format!(
                "expected a struct or map payload, got {other}"
            ))),
        }
    }

    /// Returns the value stored for a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Returns the column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    /// Returns the values in column order.
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Returns the pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Returns the number of columns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the record has no columns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: ToSqlValue> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl<K: Into<String>, V: ToSqlValue, const N: usize> From<[(K, V); N]> for Record {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: ToSqlValue> From<Vec<(K, V)>> for Record {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}
