//! Row type for store payloads.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;

/// A single row returned by the store, tagged with its table name.
///
/// Contains field values as JSON, with typed extraction via [`Row::get`].
/// Extraction failures are data-shape errors naming the offending field.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    table: String,
    data: Map<String, JsonValue>,
}

impl Row {
    /// Creates a new row from a map of field names to values.
    pub fn new(table: &str, data: Map<String, JsonValue>) -> Self {
        Self {
            table: table.to_string(),
            data,
        }
    }

    /// Builds a row from a JSON payload, which must be an object.
    pub fn from_value(table: &str, value: JsonValue) -> Result<Self, AppError> {
        match value {
            JsonValue::Object(data) => Ok(Self::new(table, data)),
            other => Err(AppError::DataShape {
                table: table.to_string(),
                field: "<row>".to_string(),
                reason: format!("expected an object, got {}", other),
            }),
        }
    }

    /// Splits a payload into rows.
    ///
    /// An array yields one row per element, a bare object yields one row and
    /// `null` yields none.
    pub fn many(table: &str, value: JsonValue) -> Result<Vec<Self>, AppError> {
        match value {
            JsonValue::Null => Ok(Vec::new()),
            JsonValue::Array(items) => items
                .into_iter()
                .map(|item| Self::from_value(table, item))
                .collect(),
            object @ JsonValue::Object(_) => Ok(vec![Self::from_value(table, object)?]),
            other => Err(AppError::DataShape {
                table: table.to_string(),
                field: "<rows>".to_string(),
                reason: format!("expected an array, got {}", other),
            }),
        }
    }

    /// Returns the table this row was read from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Gets a field, deserializing to the requested type.
    ///
    /// # Errors
    ///
    /// Returns a data-shape error if the field is absent, null, or of the wrong type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        match self.data.get(key) {
            None | Some(JsonValue::Null) => Err(AppError::missing_field(&self.table, key)),
            Some(v) => self.decode(key, v),
        }
    }

    /// Gets a field, returning `None` if it is absent or null.
    ///
    /// Still returns an error if the field exists but deserialization fails.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.data.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(v) => self.decode(key, v).map(Some),
        }
    }

    /// Returns true if the field is present and non-null.
    pub fn has(&self, key: &str) -> bool {
        matches!(self.data.get(key), Some(v) if !v.is_null())
    }

    /// Returns the raw JSON value for a field, if it exists.
    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Returns a reference to the underlying data map.
    pub fn data(&self) -> &Map<String, JsonValue> {
        &self.data
    }

    /// Consumes the row and returns the underlying data map.
    pub fn into_inner(self) -> Map<String, JsonValue> {
        self.data
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, value: &JsonValue) -> Result<T, AppError> {
        serde_json::from_value(value.clone()).map_err(|e| AppError::DataShape {
            table: self.table.clone(),
            field: key.to_string(),
            reason: e.to_string(),
        })
    }
}
