//! The entity contract and the CRUD operations every entity gets for free.

use std::fmt::Debug;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value as JsonValue};

use crate::error::{AppError, ValidationError};
use crate::models::association::Link;
use crate::models::display::Visiting;
use crate::models::persisted::{Fields, Persisted};
use crate::store::{Row, Store};

/// A persisted record type with identity, scalar fields and association slots.
///
/// Implementors embed a [`Persisted`] and one slot per association. Everything
/// else (CRUD, forms, display entry point) is provided.
pub trait Entity: Clone + Debug + Send + Sync + Sized + 'static {
    /// Store table, also the first path segment of every request.
    const TABLE: &'static str;

    type Fields: Fields;

    fn persisted(&self) -> &Persisted<Self::Fields>;

    fn persisted_mut(&mut self) -> &mut Persisted<Self::Fields>;

    /// Builds an instance around `persisted` with every slot unloaded.
    fn from_persisted(persisted: Persisted<Self::Fields>) -> Self;

    /// Marks every association slot unloaded.
    fn desynchronize(&mut self);

    /// Recomputes and records whether this instance is complete.
    ///
    /// The base rule only requires an id. Entities with stronger rules
    /// override this and may load associations to decide.
    fn check_completeness<'a>(&'a mut self, _store: &'a Store) -> BoxFuture<'a, Result<bool, AppError>> {
        Box::pin(async move {
            let complete = self.id().is_some();
            self.persisted_mut().complete = complete;
            Ok(complete)
        })
    }

    /// Renders this instance and its associations, tracking the entities
    /// already on the current path in `visiting`.
    fn display_with<'a>(
        &'a mut self,
        store: &'a Store,
        visiting: &'a mut Visiting,
        only_id: bool,
    ) -> BoxFuture<'a, Result<JsonValue, AppError>>;

    /// A transient instance holding `fields`.
    fn new(fields: Self::Fields) -> Self {
        Self::from_persisted(Persisted::new(fields))
    }

    fn id(&self) -> Option<i64> {
        self.persisted().id
    }

    fn fields(&self) -> &Self::Fields {
        &self.persisted().fields
    }

    /// Result of the last completeness check.
    fn is_complete(&self) -> bool {
        self.persisted().complete
    }

    fn apply(&mut self, update: <Self::Fields as Fields>::Update) {
        self.persisted_mut().fields.apply(update);
    }

    fn to_persisted_form(&self) -> Map<String, JsonValue> {
        self.persisted().to_persisted_form()
    }

    fn from_persisted_form(row: &Row) -> Result<Self, AppError> {
        Persisted::from_row(Self::TABLE, row).map(Self::from_persisted)
    }

    /// Describes the association from this instance to `target`.
    fn link(&self, target: &'static str) -> Result<Link, ValidationError> {
        let id = self.persisted().require_id(Self::TABLE)?;
        Ok(Link::new(Self::TABLE, id, target))
    }

    /// Renders this instance with nested associations.
    ///
    /// With `only_id`, associated entities are rendered as their ids.
    fn to_display_form<'a>(
        &'a mut self,
        store: &'a Store,
        only_id: bool,
    ) -> BoxFuture<'a, Result<JsonValue, AppError>> {
        Box::pin(async move {
            let mut visiting = Visiting::new();
            self.display_with(store, &mut visiting, only_id).await
        })
    }
}

/// CRUD against the store, implemented for every [`Entity`].
///
/// # Example
///
/// ```ignore
/// use sixthscreen::models::{Entity, Persist, Renderer, RendererFields};
///
/// let mut renderer = Renderer::new(RendererFields::new("clock", ""));
/// renderer.create(&store).await?;
/// let again = Renderer::read(&store, renderer.id().unwrap()).await?;
/// ```
#[async_trait]
pub trait Persist: Entity {
    /// Creates the record and hydrates this instance from the store's answer.
    ///
    /// Returns the assigned id.
    async fn create(&mut self, store: &Store) -> Result<i64, AppError> {
        if let Some(id) = self.id() {
            return Err(ValidationError::AlreadyPersisted {
                table: Self::TABLE,
                id,
            }
            .into());
        }

        let row = store.table(Self::TABLE).post(self.to_persisted_form()).await?;
        self.persisted_mut().merge(Self::TABLE, &row)?;
        let id = self.persisted().require_id(Self::TABLE)?;
        tracing::debug!(table = Self::TABLE, id, "created");
        Ok(id)
    }

    /// Reads one record by id.
    async fn read(store: &Store, id: i64) -> Result<Self, AppError> {
        let row = store.table(Self::TABLE).id(id).fetch_one().await?;
        Self::from_persisted_form(&row)
    }

    /// Pushes the full scalar field set of this instance.
    async fn update(&mut self, store: &Store) -> Result<(), AppError> {
        let id = self.persisted().require_id(Self::TABLE)?;
        let answer = store
            .table(Self::TABLE)
            .id(id)
            .put(Some(self.to_persisted_form()))
            .await?;

        if answer.is_object() {
            let row = Row::from_value(Self::TABLE, answer)?;
            self.persisted_mut().merge(Self::TABLE, &row)?;
        }
        tracing::debug!(table = Self::TABLE, id, "updated");
        Ok(())
    }

    /// Deletes the record. The instance keeps its id and fields.
    async fn delete(&self, store: &Store) -> Result<(), AppError> {
        let id = self.persisted().require_id(Self::TABLE)?;
        store.table(Self::TABLE).id(id).delete().await?;
        tracing::debug!(table = Self::TABLE, id, "deleted");
        Ok(())
    }

    /// Reads every record of the table.
    async fn all(store: &Store) -> Result<Vec<Self>, AppError> {
        let rows = store.table(Self::TABLE).fetch_all().await?;
        rows.iter().map(Self::from_persisted_form).collect()
    }

    /// Reads the first record whose `field` equals `value`.
    async fn find_one_by(store: &Store, field: &str, value: &str) -> Result<Self, AppError> {
        let rows = store
            .table(Self::TABLE)
            .filter(field, value)
            .fetch_all()
            .await?;

        match rows.first() {
            Some(row) => Self::from_persisted_form(row),
            None => Err(AppError::NotFound {
                table: Self::TABLE.to_string(),
                id: format!("{}={}", field, value),
            }),
        }
    }
}

impl<E: Entity> Persist for E {}

/// Association changes addressed by name and id, for callers outside the
/// crate that cannot hold typed handles.
pub trait Linkable: Entity {
    /// Association names accepted by [`link_by_id`](Linkable::link_by_id).
    const SLOTS: &'static [&'static str];

    /// Reads `other_id` and associates it through `slot`.
    fn link_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>>;

    /// Dissociates `other_id` from `slot`.
    fn unlink_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>>;

    fn unknown_slot(slot: &str) -> AppError {
        ValidationError::UnknownSlot {
            table: Self::TABLE,
            slot: slot.to_string(),
        }
        .into()
    }
}
