//! Identity and scalar-field capability shared by every entity.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};

use crate::error::{AppError, ValidationError};
use crate::store::Row;

/// The scalar fields of a concrete entity.
///
/// Field structs serialize to exactly the persisted form sent to the store
/// (minus `id`), and expose a tagged update enum instead of named setters.
pub trait Fields:
    Serialize + DeserializeOwned + Clone + PartialEq + Debug + Send + Sync + 'static
{
    /// Fields that must be present in every row, besides `id`.
    const REQUIRED: &'static [&'static str];

    /// One supported mutation of a single field.
    type Update: Debug + Clone + Send;

    /// Applies a single mutation in place.
    fn apply(&mut self, update: Self::Update);

    /// Parses a `field=value` pair into a typed mutation.
    fn parse_update(field: &str, value: &str) -> Result<Self::Update, ValidationError>;
}

/// Identity, bookkeeping and scalar fields of one entity instance.
///
/// Every concrete entity embeds a `Persisted<F>` next to its association slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<F> {
    /// Store-assigned id; `None` while the entity is transient.
    pub id: Option<i64>,
    /// Result of the last completeness check.
    pub complete: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fields: F,
}

impl<F: Fields> Persisted<F> {
    /// A transient instance: no id, considered complete until checked.
    pub fn new(fields: F) -> Self {
        Self {
            id: None,
            complete: true,
            created_at: None,
            updated_at: None,
            fields,
        }
    }

    /// Returns the id, or a validation error naming the table.
    pub fn require_id(&self, table: &'static str) -> Result<i64, ValidationError> {
        self.id.ok_or(ValidationError::MissingId { table })
    }

    /// The minimal scalar representation sent on create/update.
    ///
    /// Includes `id` once assigned; never includes associations, `complete`
    /// or timestamps.
    pub fn to_persisted_form(&self) -> Map<String, JsonValue> {
        let mut form = match serde_json::to_value(&self.fields) {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(id) = self.id {
            form.insert("id".to_string(), json!(id));
        }
        form
    }

    /// The persisted form plus completeness and timestamps, as shown to clients.
    pub fn to_base_form(&self) -> Map<String, JsonValue> {
        let mut form = self.to_persisted_form();
        form.insert("complete".to_string(), json!(self.complete));
        if let Some(created_at) = self.created_at {
            form.insert("createdAt".to_string(), json!(created_at));
        }
        if let Some(updated_at) = self.updated_at {
            form.insert("updatedAt".to_string(), json!(updated_at));
        }
        form
    }

    /// Hydrates an instance from a store row.
    ///
    /// `id` and every [`Fields::REQUIRED`] field must be present; the first
    /// missing one is named in the returned data-shape error.
    pub fn from_row(table: &str, row: &Row) -> Result<Self, AppError> {
        let id: i64 = row.get("id")?;
        let fields = Self::fields_from_row(table, row)?;

        Ok(Self {
            id: Some(id),
            complete: row.get_opt("complete")?.unwrap_or(true),
            created_at: row.get_opt("createdAt")?,
            updated_at: row.get_opt("updatedAt")?,
            fields,
        })
    }

    /// Merges the store's answer to a create/update into this instance.
    ///
    /// The id and timestamps are always taken from the row. Scalar fields are
    /// replaced only when the row carries a full field set.
    pub fn merge(&mut self, table: &str, row: &Row) -> Result<(), AppError> {
        let id: i64 = row.get("id")?;
        if let Some(current) = self.id {
            if current != id {
                return Err(AppError::DataShape {
                    table: table.to_string(),
                    field: "id".to_string(),
                    reason: format!("changed from {} to {}", current, id),
                });
            }
        }

        if F::REQUIRED.iter().all(|field| row.has(field)) {
            self.fields = Self::fields_from_row(table, row)?;
        }
        self.id = Some(id);
        if let Some(created_at) = row.get_opt("createdAt")? {
            self.created_at = Some(created_at);
        }
        if let Some(updated_at) = row.get_opt("updatedAt")? {
            self.updated_at = Some(updated_at);
        }
        Ok(())
    }

    fn fields_from_row(table: &str, row: &Row) -> Result<F, AppError> {
        if let Some(missing) = F::REQUIRED.iter().find(|field| !row.has(field)) {
            return Err(AppError::missing_field(table, missing));
        }
        serde_json::from_value(JsonValue::Object(row.data().clone())).map_err(|e| {
            AppError::DataShape {
                table: table.to_string(),
                field: "<fields>".to_string(),
                reason: e.to_string(),
            }
        })
    }
}
