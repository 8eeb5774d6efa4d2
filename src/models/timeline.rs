//! Timeline: the schedule attached to an SDI.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::persisted::{Fields, Persisted};
use crate::models::sdi::Sdi;
use crate::models::slot::ToOne;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TimelineFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineUpdate {
    Name(String),
    Description(String),
}

impl Fields for TimelineFields {
    const REQUIRED: &'static [&'static str] = &["name"];
    type Update = TimelineUpdate;

    fn apply(&mut self, update: TimelineUpdate) {
        match update {
            TimelineUpdate::Name(name) => self.name = name,
            TimelineUpdate::Description(description) => self.description = description,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<TimelineUpdate, ValidationError> {
        match field {
            "name" => Ok(TimelineUpdate::Name(value.to_string())),
            "description" => Ok(TimelineUpdate::Description(value.to_string())),
            _ => Err(ValidationError::UnknownField {
                table: Timeline::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    base: Persisted<TimelineFields>,
    sdi: ToOne<Sdi>,
}

impl Timeline {
    pub fn name(&self) -> &str {
        &self.base.fields.name
    }

    pub fn cached_sdi(&self) -> Option<Option<&Sdi>> {
        self.sdi.get()
    }

    pub async fn load_sdi(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_one(store, self.link(Sdi::TABLE)?, &mut self.sdi).await
    }

    pub async fn sdi(&mut self, store: &Store) -> Result<Option<&Sdi>, AppError> {
        self.load_sdi(store).await?;
        Ok(self.sdi.get().flatten())
    }

    /// Fails with `AlreadySet` unless the slot is empty. Loads the slot first when unloaded.
    pub async fn set_sdi(&mut self, store: &Store, sdi: &mut Sdi) -> Result<(), AppError> {
        let link = self.link(Sdi::TABLE)?;
        association::set_one(store, link, &mut self.sdi, sdi).await
    }

    /// Fails with `NothingToUnset` when the slot is empty. Loads the slot first when unloaded.
    pub async fn unset_sdi(&mut self, store: &Store) -> Result<Option<Sdi>, AppError> {
        let link = self.link(Sdi::TABLE)?;
        association::unset_one(store, link, &mut self.sdi).await
    }
}

impl Entity for Timeline {
    const TABLE: &'static str = "timelines";
    type Fields = TimelineFields;

    fn persisted(&self) -> &Persisted<TimelineFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<TimelineFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<TimelineFields>) -> Self {
        Self {
            base,
            sdi: ToOne::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.sdi.unload();
    }

    fn check_completeness<'a>(&'a mut self, _store: &'a Store) -> BoxFuture<'a, Result<bool, AppError>> {
        Box::pin(async move {
            let complete = self.base.id.is_some() && !self.base.fields.name.trim().is_empty();
            self.base.complete = complete;
            Ok(complete)
        })
    }

    fn display_with<'a>(
        &'a mut self,
        store: &'a Store,
        visiting: &'a mut Visiting,
        only_id: bool,
    ) -> BoxFuture<'a, Result<JsonValue, AppError>> {
        Box::pin(async move {
            let link = self.link(Sdi::TABLE)?;
            association::load_one(store, link, &mut self.sdi).await?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, link.id);
            let sdi = display::one(&mut self.sdi, store, visiting, only_id).await;
            visiting.leave(Self::TABLE, link.id);

            form.insert("sdi".to_string(), sdi?);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for Timeline {
    const SLOTS: &'static [&'static str] = &["sdi"];

    fn link_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match slot {
                "sdi" => {
                    let mut sdi = Sdi::read(store, other_id).await?;
                    self.set_sdi(store, &mut sdi).await
                }
                _ => Err(Self::unknown_slot(slot)),
            }
        })
    }

    fn unlink_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match slot {
                "sdi" => {
                    let link = self.link(Sdi::TABLE)?;
                    association::unset_one_matching(store, link, &mut self.sdi, other_id)
                        .await
                        .map(|_| ())
                }
                _ => Err(Self::unknown_slot(slot)),
            }
        })
    }
}
