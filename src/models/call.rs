//! Call: a request for content, placed in a zone under a profile.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::persisted::{Fields, Persisted};
use crate::models::profile::Profile;
use crate::models::slot::ToOne;
use crate::models::zone::Zone;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CallFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallUpdate {
    Name(String),
    Description(String),
}

impl Fields for CallFields {
    const REQUIRED: &'static [&'static str] = &["name"];
    type Update = CallUpdate;

    fn apply(&mut self, update: CallUpdate) {
        match update {
            CallUpdate::Name(name) => self.name = name,
            CallUpdate::Description(description) => self.description = description,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<CallUpdate, ValidationError> {
        match field {
            "name" => Ok(CallUpdate::Name(value.to_string())),
            "description" => Ok(CallUpdate::Description(value.to_string())),
            _ => Err(ValidationError::UnknownField {
                table: Call::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    base: Persisted<CallFields>,
    zone: ToOne<Zone>,
    profile: ToOne<Profile>,
}

impl Call {
    pub fn name(&self) -> &str {
        &self.base.fields.name
    }

    pub fn cached_zone(&self) -> Option<Option<&Zone>> {
        self.zone.get()
    }

    pub fn cached_profile(&self) -> Option<Option<&Profile>> {
        self.profile.get()
    }

    pub async fn load_zone(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_one(store, self.link(Zone::TABLE)?, &mut self.zone).await
    }

    pub async fn zone(&mut self, store: &Store) -> Result<Option<&Zone>, AppError> {
        self.load_zone(store).await?;
        Ok(self.zone.get().flatten())
    }

    /// Fails with `AlreadySet` unless the slot is empty. Loads the slot first when unloaded.
    pub async fn set_zone(&mut self, store: &Store, zone: &mut Zone) -> Result<(), AppError> {
        let link = self.link(Zone::TABLE)?;
        association::set_one(store, link, &mut self.zone, zone).await
    }

    /// Fails with `NothingToUnset` when the slot is empty. Loads the slot first when unloaded.
    pub async fn unset_zone(&mut self, store: &Store) -> Result<Option<Zone>, AppError> {
        let link = self.link(Zone::TABLE)?;
        association::unset_one(store, link, &mut self.zone).await
    }

    pub async fn load_profile(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_one(store, self.link(Profile::TABLE)?, &mut self.profile).await
    }

    pub async fn profile(&mut self, store: &Store) -> Result<Option<&Profile>, AppError> {
        self.load_profile(store).await?;
        Ok(self.profile.get().flatten())
    }

    /// Fails with `AlreadySet` unless the slot is empty. Loads the slot first when unloaded.
    pub async fn set_profile(&mut self, store: &Store, profile: &mut Profile) -> Result<(), AppError> {
        let link = self.link(Profile::TABLE)?;
        association::set_one(store, link, &mut self.profile, profile).await
    }

    /// Fails with `NothingToUnset` when the slot is empty. Loads the slot first when unloaded.
    pub async fn unset_profile(&mut self, store: &Store) -> Result<Option<Profile>, AppError> {
        let link = self.link(Profile::TABLE)?;
        association::unset_one(store, link, &mut self.profile).await
    }
}

impl Entity for Call {
    const TABLE: &'static str = "calls";
    type Fields = CallFields;

    fn persisted(&self) -> &Persisted<CallFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<CallFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<CallFields>) -> Self {
        Self {
            base,
            zone: ToOne::new(),
            profile: ToOne::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.zone.unload();
        self.profile.unload();
    }

    /// A call needs a name and a zone to be placed in.
    fn check_completeness<'a>(&'a mut self, store: &'a Store) -> BoxFuture<'a, Result<bool, AppError>> {
        Box::pin(async move {
            let mut complete = self.base.id.is_some() && !self.base.fields.name.trim().is_empty();
            if complete {
                complete = self.zone(store).await?.is_some();
            }
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
            let zone = self.link(Zone::TABLE)?;
            let profile = self.link(Profile::TABLE)?;
            futures::try_join!(
                association::load_one(store, zone, &mut self.zone),
                association::load_one(store, profile, &mut self.profile),
            )?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, id);
            let nested = async {
                let zone = display::one(&mut self.zone, store, visiting, only_id).await?;
                let profile = display::one(&mut self.profile, store, visiting, only_id).await?;
                Ok::<_, AppError>((zone, profile))
            }
            .await;
            visiting.leave(Self::TABLE, id);
            let (zone_form, profile_form) = nested?;

            form.insert("zone".to_string(), zone_form);
            form.insert("profile".to_string(), profile_form);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for Call {
    const SLOTS: &'static [&'static str] = &["zone", "profile"];

    fn link_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match slot {
                "zone" => {
                    let mut zone = Zone::read(store, other_id).await?;
                    self.set_zone(store, &mut zone).await
                }
                "profile" => {
                    let mut profile = Profile::read(store, other_id).await?;
                    self.set_profile(store, &mut profile).await
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
                "zone" => {
                    let link = self.link(Zone::TABLE)?;
                    association::unset_one_matching(store, link, &mut self.zone, other_id)
                        .await
                        .map(|_| ())
                }
                "profile" => {
                    let link = self.link(Profile::TABLE)?;
                    association::unset_one_matching(store, link, &mut self.profile, other_id)
                        .await
                        .map(|_| ())
                }
                _ => Err(Self::unknown_slot(slot)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backends::memory::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_completeness_needs_a_zone() {
        let backend = Arc::new(MemoryStore::new());
        let store = Store::from_arc(backend.clone());
        let call_id = backend.insert("calls", json!({"name": "weather"}));
        let mut call = Call::read(&store, call_id).await.unwrap();

        assert!(!call.check_completeness(&store).await.unwrap());

        // The zone itself is incomplete (no renderer); presence is enough.
        let zone_id = backend.insert("zones", json!({"name": "main"}));
        backend.link("calls", call_id, "zones", zone_id);
        call.desynchronize();
        assert!(call.check_completeness(&store).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlink_rejects_other_zone() {
        let backend = Arc::new(MemoryStore::new());
        let store = Store::from_arc(backend.clone());
        let call_id = backend.insert("calls", json!({"name": "weather"}));
        let zone_id = backend.insert("zones", json!({"name": "main"}));
        backend.link("calls", call_id, "zones", zone_id);

        let mut call = Call::read(&store, call_id).await.unwrap();
        let err = call.unlink_by_id(&store, "zone", zone_id + 100).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::NotAssociated { .. })
        ));
        assert!(backend.is_linked("calls", call_id, "zones", zone_id));

        call.unlink_by_id(&store, "zone", zone_id).await.unwrap();
        assert!(!backend.is_linked("calls", call_id, "zones", zone_id));
        assert_eq!(call.cached_zone(), Some(None));
    }

    #[tokio::test]
    async fn test_unknown_slot() {
        let backend = Arc::new(MemoryStore::new());
        let store = Store::from_arc(backend.clone());
        let call_id = backend.insert("calls", json!({"name": "weather"}));
        let mut call = Call::read(&store, call_id).await.unwrap();
        backend.clear_requests();

        let err = call.link_by_id(&store, "renderer", 1).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UnknownSlot { table: "calls", .. })
        ));
        assert_eq!(backend.request_count(), 0);
    }
}
