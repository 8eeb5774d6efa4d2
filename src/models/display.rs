//! Recursive display form.
//!
//! Displaying walks associations depth-first and expands each entity at most
//! once per call. Back-edges to the current path and entities already expanded
//! on an earlier branch render as their bare id, so one display costs at most
//! one association load per reachable entity.

use std::collections::HashSet;

use serde_json::{json, Value as JsonValue};

use crate::error::AppError;
use crate::models::entity::Entity;
use crate::models::slot::{ToMany, ToOne};
use crate::store::Store;

/// Display bookkeeping for one call, keyed by table and id.
///
/// `path` holds the entities currently being expanded; `rendered` every entity
/// expanded so far. Use a fresh value per display call.
#[derive(Debug, Default)]
pub struct Visiting {
    path: HashSet<(&'static str, i64)>,
    rendered: HashSet<(&'static str, i64)>,
}

impl Visiting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the entity is on the current path.
    pub fn contains(&self, table: &'static str, id: i64) -> bool {
        self.path.contains(&(table, id))
    }

    /// Whether the entity was already expanded during this call.
    pub fn is_rendered(&self, table: &'static str, id: i64) -> bool {
        self.rendered.contains(&(table, id))
    }

    /// Pushes an entity onto the path and marks it rendered. Returns `false` if
    /// it was already on the path.
    pub fn enter(&mut self, table: &'static str, id: i64) -> bool {
        self.rendered.insert((table, id));
        self.path.insert((table, id))
    }

    /// Pops an entity off the path. It stays rendered.
    pub fn leave(&mut self, table: &'static str, id: i64) {
        self.path.remove(&(table, id));
    }

    /// True when no entity is on the current path.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }
}

/// Renders a loaded to-one slot: `null` when empty.
pub async fn one<T: Entity>(
    slot: &mut ToOne<T>,
    store: &Store,
    visiting: &mut Visiting,
    only_id: bool,
) -> Result<JsonValue, AppError> {
    match slot.get_mut() {
        Some(value) => nested(value, store, visiting, only_id).await,
        None => Ok(JsonValue::Null),
    }
}

/// Renders a loaded to-many slot as an array in slot order.
pub async fn many<T: Entity>(
    slot: &mut ToMany<T>,
    store: &Store,
    visiting: &mut Visiting,
    only_id: bool,
) -> Result<JsonValue, AppError> {
    let mut rendered = Vec::new();
    if let Some(values) = slot.get_mut() {
        for value in values.iter_mut() {
            rendered.push(nested(value, store, visiting, only_id).await?);
        }
    }
    Ok(JsonValue::Array(rendered))
}

async fn nested<T: Entity>(
    entity: &mut T,
    store: &Store,
    visiting: &mut Visiting,
    only_id: bool,
) -> Result<JsonValue, AppError> {
    match entity.id() {
        Some(id) if only_id || visiting.is_rendered(T::TABLE, id) => Ok(json!(id)),
        _ => entity.display_with(store, visiting, only_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_keeps_entity_rendered() {
        let mut visiting = Visiting::new();
        assert!(visiting.enter("zones", 1));
        assert!(!visiting.enter("zones", 1));
        visiting.leave("zones", 1);

        assert!(visiting.is_empty());
        assert!(!visiting.contains("zones", 1));
        assert!(visiting.is_rendered("zones", 1));
        assert_eq!(visiting.rendered_count(), 1);
    }
}
