//! Loading and mutating associations between two entities.
//!
//! Every association is addressed as `/<table>/<id>/<target>`. Loads GET that
//! path; set/add PUT `/<table>/<id>/<target>/<otherId>`; unset/remove DELETE it.
//!
//! Mutations follow one sequence: validate locally, make sure the owner's slot
//! is loaded, check the association state, send exactly one write, then
//! desynchronize the other side and update the owner's cache optimistically.
//!
//! `MissingId` and `NotHydrated` fail before any request. The state checks
//! (`AlreadySet`, `NothingToUnset`, `Duplicate`, `NotAssociated`) need a loaded
//! slot, so on an unloaded slot they fail after the one GET that loads it.

use crate::error::{AppError, ValidationError};
use crate::models::entity::Entity;
use crate::models::slot::{ToMany, ToOne};
use crate::store::{Request, Store};

/// One side of an association: the owner and the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub table: &'static str,
    pub id: i64,
    pub target: &'static str,
}

impl Link {
    pub fn new(table: &'static str, id: i64, target: &'static str) -> Self {
        Self { table, id, target }
    }

    fn request<'a>(&self, store: &'a Store) -> Request<'a> {
        store.table(self.table).id(self.id).segment(self.target)
    }
}

fn hydrated<T: Entity>(other: &T) -> Result<i64, ValidationError> {
    other
        .id()
        .ok_or(ValidationError::NotHydrated { table: T::TABLE })
}

/// Loads a to-one slot unless it is already loaded.
pub async fn load_one<T: Entity>(
    store: &Store,
    link: Link,
    slot: &mut ToOne<T>,
) -> Result<(), AppError> {
    if slot.is_loaded() {
        return Ok(());
    }

    let rows = link.request(store).fetch_all().await?;
    if rows.len() > 1 {
        tracing::warn!(
            table = link.table,
            id = link.id,
            target = link.target,
            count = rows.len(),
            "to-one association returned several rows, keeping the first"
        );
    }
    let value = rows.first().map(T::from_persisted_form).transpose()?;
    slot.fill(value);
    Ok(())
}

/// Loads a to-many slot unless it is already loaded.
pub async fn load_many<T: Entity>(
    store: &Store,
    link: Link,
    slot: &mut ToMany<T>,
) -> Result<(), AppError> {
    if slot.is_loaded() {
        return Ok(());
    }

    let rows = link.request(store).fetch_all().await?;
    let values = rows
        .iter()
        .map(T::from_persisted_form)
        .collect::<Result<Vec<_>, _>>()?;
    slot.fill(values);
    Ok(())
}

/// Associates `other` through an empty to-one slot.
///
/// An unloaded slot is loaded first, so a state-check failure may cost one GET.
pub async fn set_one<T: Entity>(
    store: &Store,
    link: Link,
    slot: &mut ToOne<T>,
    other: &mut T,
) -> Result<(), AppError> {
    let other_id = hydrated(other)?;
    load_one(store, link, slot).await?;
    if matches!(slot.get(), Some(Some(_))) {
        return Err(ValidationError::AlreadySet {
            table: link.table,
            id: link.id,
            target: link.target,
        }
        .into());
    }

    link.request(store).id(other_id).put(None).await?;
    tracing::debug!(
        table = link.table,
        id = link.id,
        target = link.target,
        other_id,
        "association set"
    );

    other.desynchronize();
    slot.fill(Some(other.clone()));
    Ok(())
}

/// Clears a to-one slot, returning the previously associated entity.
///
/// An unloaded slot is loaded first, so a state-check failure may cost one GET.
pub async fn unset_one<T: Entity>(
    store: &Store,
    link: Link,
    slot: &mut ToOne<T>,
) -> Result<Option<T>, AppError> {
    load_one(store, link, slot).await?;
    let other_id = match slot.get() {
        Some(Some(current)) => hydrated(current)?,
        _ => {
            return Err(ValidationError::NothingToUnset {
                table: link.table,
                id: link.id,
                target: link.target,
            }
            .into())
        }
    };

    link.request(store).id(other_id).delete().await?;
    tracing::debug!(
        table = link.table,
        id = link.id,
        target = link.target,
        other_id,
        "association unset"
    );

    let mut previous = slot.take();
    if let Some(other) = previous.as_mut() {
        other.desynchronize();
    }
    Ok(previous)
}

/// Clears a to-one slot only if it currently holds `other_id`.
///
/// An unloaded slot is loaded first, so a state-check failure may cost one GET.
pub async fn unset_one_matching<T: Entity>(
    store: &Store,
    link: Link,
    slot: &mut ToOne<T>,
    other_id: i64,
) -> Result<Option<T>, AppError> {
    load_one(store, link, slot).await?;
    let mismatched =
        matches!(slot.get(), Some(Some(current)) if current.id() != Some(other_id));
    if mismatched {
        return Err(ValidationError::NotAssociated {
            table: link.table,
            id: link.id,
            target: link.target,
            other_id,
        }
        .into());
    }
    unset_one(store, link, slot).await
}

/// Adds `other` to a to-many slot.
///
/// An unloaded slot is loaded first, so a state-check failure may cost one GET.
pub async fn add_many<T: Entity>(
    store: &Store,
    link: Link,
    slot: &mut ToMany<T>,
    other: &mut T,
) -> Result<(), AppError> {
    let other_id = hydrated(other)?;
    load_many(store, link, slot).await?;
    if contains(slot, other_id) {
        return Err(ValidationError::Duplicate {
            table: link.table,
            id: link.id,
            target: link.target,
            other_id,
        }
        .into());
    }

    link.request(store).id(other_id).put(None).await?;
    tracing::debug!(
        table = link.table,
        id = link.id,
        target = link.target,
        other_id,
        "association added"
    );

    other.desynchronize();
    slot.push(other.clone());
    Ok(())
}

/// Removes `other` from a to-many slot.
///
/// An unloaded slot is loaded first, so a state-check failure may cost one GET.
pub async fn remove_many<T: Entity>(
    store: &Store,
    link: Link,
    slot: &mut ToMany<T>,
    other: &mut T,
) -> Result<(), AppError> {
    let other_id = hydrated(other)?;
    load_many(store, link, slot).await?;
    if !contains(slot, other_id) {
        return Err(ValidationError::NotAssociated {
            table: link.table,
            id: link.id,
            target: link.target,
            other_id,
        }
        .into());
    }

    link.request(store).id(other_id).delete().await?;
    tracing::debug!(
        table = link.table,
        id = link.id,
        target = link.target,
        other_id,
        "association removed"
    );

    other.desynchronize();
    slot.remove_where(|value| value.id() == Some(other_id));
    Ok(())
}

fn contains<T: Entity>(slot: &ToMany<T>, other_id: i64) -> bool {
    slot.get()
        .map(|values| values.iter().any(|value| value.id() == Some(other_id)))
        .unwrap_or(false)
}
