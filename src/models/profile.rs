//! Profile: a named configuration of calls for one SDI.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::call::Call;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::persisted::{Fields, Persisted};
use crate::models::sdi::Sdi;
use crate::models::slot::{ToMany, ToOne};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ProfileFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
    Name(String),
    Description(String),
}

impl Fields for ProfileFields {
    const REQUIRED: &'static [&'static str] = &["name"];
    type Update = ProfileUpdate;

    fn apply(&mut self, update: ProfileUpdate) {
        match update {
            ProfileUpdate::Name(name) => self.name = name,
            ProfileUpdate::Description(description) => self.description = description,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<ProfileUpdate, ValidationError> {
        match field {
            "name" => Ok(ProfileUpdate::Name(value.to_string())),
            "description" => Ok(ProfileUpdate::Description(value.to_string())),
            _ => Err(ValidationError::UnknownField {
                table: Profile::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    base: Persisted<ProfileFields>,
    sdi: ToOne<Sdi>,
    calls: ToMany<Call>,
}

impl Profile {
    pub fn name(&self) -> &str {
        &self.base.fields.name
    }

    pub fn cached_sdi(&self) -> Option<Option<&Sdi>> {
        self.sdi.get()
    }

    pub fn cached_calls(&self) -> Option<&[Call]> {
        self.calls.get()
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

    pub async fn load_calls(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_many(store, self.link(Call::TABLE)?, &mut self.calls).await
    }

    pub async fn calls(&mut self, store: &Store) -> Result<&[Call], AppError> {
        self.load_calls(store).await?;
        Ok(self.calls.get().unwrap_or_default())
    }

    /// Fails with `Duplicate` when already present. Loads the slot first when unloaded.
    pub async fn add_call(&mut self, store: &Store, call: &mut Call) -> Result<(), AppError> {
        let link = self.link(Call::TABLE)?;
        association::add_many(store, link, &mut self.calls, call).await
    }

    /// Fails with `NotAssociated` when absent. Loads the slot first when unloaded.
    pub async fn remove_call(&mut self, store: &Store, call: &mut Call) -> Result<(), AppError> {
        let link = self.link(Call::TABLE)?;
        association::remove_many(store, link, &mut self.calls, call).await
    }
}

impl Entity for Profile {
    const TABLE: &'static str = "profiles";
    type Fields = ProfileFields;

    fn persisted(&self) -> &Persisted<ProfileFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<ProfileFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<ProfileFields>) -> Self {
        Self {
            base,
            sdi: ToOne::new(),
            calls: ToMany::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.sdi.unload();
        self.calls.unload();
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
            let id = self.base.require_id(Self::TABLE)?;
            let sdi = self.link(Sdi::TABLE)?;
            let calls = self.link(Call::TABLE)?;
            futures::try_join!(
                association::load_one(store, sdi, &mut self.sdi),
                association::load_many(store, calls, &mut self.calls),
            )?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, id);
            let nested = async {
                let sdi = display::one(&mut self.sdi, store, visiting, only_id).await?;
                let calls = display::many(&mut self.calls, store, visiting, only_id).await?;
                Ok::<_, AppError>((sdi, calls))
            }
            .await;
            visiting.leave(Self::TABLE, id);
            let (sdi_form, calls_form) = nested?;

            form.insert("sdi".to_string(), sdi_form);
            form.insert("calls".to_string(), calls_form);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for Profile {
    const SLOTS: &'static [&'static str] = &["sdi", "calls"];

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
                "calls" => {
                    let mut call = Call::read(store, other_id).await?;
                    self.add_call(store, &mut call).await
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
                "calls" => {
                    let mut call = Call::read(store, other_id).await?;
                    self.remove_call(store, &mut call).await
                }
                _ => Err(Self::unknown_slot(slot)),
            }
        })
    }
}
