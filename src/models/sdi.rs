//! SDI: one screen deployment, with its zones, profiles, timeline and owners.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::persisted::{Fields, Persisted};
use crate::models::profile::Profile;
use crate::models::slot::{ToMany, ToOne};
use crate::models::timeline::Timeline;
use crate::models::user::User;
use crate::models::zone::Zone;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdiFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Host clients of this SDI are allowed to connect from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_host: Option<String>,
}

impl SdiFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            allowed_host: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SdiUpdate {
    Name(String),
    Description(String),
    AllowedHost(Option<String>),
}

impl Fields for SdiFields {
    const REQUIRED: &'static [&'static str] = &["name"];
    type Update = SdiUpdate;

    fn apply(&mut self, update: SdiUpdate) {
        match update {
            SdiUpdate::Name(name) => self.name = name,
            SdiUpdate::Description(description) => self.description = description,
            SdiUpdate::AllowedHost(host) => self.allowed_host = host,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<SdiUpdate, ValidationError> {
        match field {
            "name" => Ok(SdiUpdate::Name(value.to_string())),
            "description" => Ok(SdiUpdate::Description(value.to_string())),
            // An empty host clears the restriction.
            "allowedHost" => Ok(SdiUpdate::AllowedHost(
                Some(value.trim().to_string()).filter(|host| !host.is_empty()),
            )),
            _ => Err(ValidationError::UnknownField {
                table: Sdi::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sdi {
    base: Persisted<SdiFields>,
    users: ToMany<User>,
    zones: ToMany<Zone>,
    profiles: ToMany<Profile>,
    timeline: ToOne<Timeline>,
}

impl Sdi {
    pub fn name(&self) -> &str {
        &self.base.fields.name
    }

    pub fn cached_zones(&self) -> Option<&[Zone]> {
        self.zones.get()
    }

    pub fn cached_profiles(&self) -> Option<&[Profile]> {
        self.profiles.get()
    }

    pub fn cached_users(&self) -> Option<&[User]> {
        self.users.get()
    }

    pub fn cached_timeline(&self) -> Option<Option<&Timeline>> {
        self.timeline.get()
    }

    pub async fn load_users(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_many(store, self.link(User::TABLE)?, &mut self.users).await
    }

    pub async fn users(&mut self, store: &Store) -> Result<&[User], AppError> {
        self.load_users(store).await?;
        Ok(self.users.get().unwrap_or_default())
    }

    /// Fails with `Duplicate` when already present. Loads the slot first when unloaded.
    pub async fn add_user(&mut self, store: &Store, user: &mut User) -> Result<(), AppError> {
        let link = self.link(User::TABLE)?;
        association::add_many(store, link, &mut self.users, user).await
    }

    /// Fails with `NotAssociated` when absent. Loads the slot first when unloaded.
    pub async fn remove_user(&mut self, store: &Store, user: &mut User) -> Result<(), AppError> {
        let link = self.link(User::TABLE)?;
        association::remove_many(store, link, &mut self.users, user).await
    }

    pub async fn load_zones(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_many(store, self.link(Zone::TABLE)?, &mut self.zones).await
    }

    pub async fn zones(&mut self, store: &Store) -> Result<&[Zone], AppError> {
        self.load_zones(store).await?;
        Ok(self.zones.get().unwrap_or_default())
    }

    /// Fails with `Duplicate` when already present. Loads the slot first when unloaded.
    pub async fn add_zone(&mut self, store: &Store, zone: &mut Zone) -> Result<(), AppError> {
        let link = self.link(Zone::TABLE)?;
        association::add_many(store, link, &mut self.zones, zone).await
    }

    /// Fails with `NotAssociated` when absent. Loads the slot first when unloaded.
    pub async fn remove_zone(&mut self, store: &Store, zone: &mut Zone) -> Result<(), AppError> {
        let link = self.link(Zone::TABLE)?;
        association::remove_many(store, link, &mut self.zones, zone).await
    }

    pub async fn load_profiles(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_many(store, self.link(Profile::TABLE)?, &mut self.profiles).await
    }

    pub async fn profiles(&mut self, store: &Store) -> Result<&[Profile], AppError> {
        self.load_profiles(store).await?;
        Ok(self.profiles.get().unwrap_or_default())
    }

    /// Fails with `Duplicate` when already present. Loads the slot first when unloaded.
    pub async fn add_profile(&mut self, store: &Store, profile: &mut Profile) -> Result<(), AppError> {
        let link = self.link(Profile::TABLE)?;
        association::add_many(store, link, &mut self.profiles, profile).await
    }

    /// Fails with `NotAssociated` when absent. Loads the slot first when unloaded.
    pub async fn remove_profile(
        &mut self,
        store: &Store,
        profile: &mut Profile,
    ) -> Result<(), AppError> {
        let link = self.link(Profile::TABLE)?;
        association::remove_many(store, link, &mut self.profiles, profile).await
    }

    pub async fn load_timeline(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_one(store, self.link(Timeline::TABLE)?, &mut self.timeline).await
    }

    pub async fn timeline(&mut self, store: &Store) -> Result<Option<&Timeline>, AppError> {
        self.load_timeline(store).await?;
        Ok(self.timeline.get().flatten())
    }

    /// Fails with `AlreadySet` unless the slot is empty. Loads the slot first when unloaded.
    pub async fn set_timeline(&mut self, store: &Store, timeline: &mut Timeline) -> Result<(), AppError> {
        let link = self.link(Timeline::TABLE)?;
        association::set_one(store, link, &mut self.timeline, timeline).await
    }

    /// Fails with `NothingToUnset` when the slot is empty. Loads the slot first when unloaded.
    pub async fn unset_timeline(&mut self, store: &Store) -> Result<Option<Timeline>, AppError> {
        let link = self.link(Timeline::TABLE)?;
        association::unset_one(store, link, &mut self.timeline).await
    }
}

impl Entity for Sdi {
    const TABLE: &'static str = "sdis";
    type Fields = SdiFields;

    fn persisted(&self) -> &Persisted<SdiFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<SdiFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<SdiFields>) -> Self {
        Self {
            base,
            users: ToMany::new(),
            zones: ToMany::new(),
            profiles: ToMany::new(),
            timeline: ToOne::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.users.unload();
        self.zones.unload();
        self.profiles.unload();
        self.timeline.unload();
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
            let users = self.link(User::TABLE)?;
            let zones = self.link(Zone::TABLE)?;
            let profiles = self.link(Profile::TABLE)?;
            let timeline = self.link(Timeline::TABLE)?;
            futures::try_join!(
                association::load_many(store, users, &mut self.users),
                association::load_many(store, zones, &mut self.zones),
                association::load_many(store, profiles, &mut self.profiles),
                association::load_one(store, timeline, &mut self.timeline),
            )?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, id);
            let nested = async {
                let users = display::many(&mut self.users, store, visiting, only_id).await?;
                let zones = display::many(&mut self.zones, store, visiting, only_id).await?;
                let profiles = display::many(&mut self.profiles, store, visiting, only_id).await?;
                let timeline = display::one(&mut self.timeline, store, visiting, only_id).await?;
                Ok::<_, AppError>((users, zones, profiles, timeline))
            }
            .await;
            visiting.leave(Self::TABLE, id);
            let (users, zones, profiles, timeline) = nested?;

            form.insert("users".to_string(), users);
            form.insert("zones".to_string(), zones);
            form.insert("profiles".to_string(), profiles);
            form.insert("timeline".to_string(), timeline);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for Sdi {
    const SLOTS: &'static [&'static str] = &["users", "zones", "profiles", "timeline"];

    fn link_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match slot {
                "users" => {
                    let mut user = User::read(store, other_id).await?;
                    self.add_user(store, &mut user).await
                }
                "zones" => {
                    let mut zone = Zone::read(store, other_id).await?;
                    self.add_zone(store, &mut zone).await
                }
                "profiles" => {
                    let mut profile = Profile::read(store, other_id).await?;
                    self.add_profile(store, &mut profile).await
                }
                "timeline" => {
                    let mut timeline = Timeline::read(store, other_id).await?;
                    self.set_timeline(store, &mut timeline).await
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
                "users" => {
                    let mut user = User::read(store, other_id).await?;
                    self.remove_user(store, &mut user).await
                }
                "zones" => {
                    let mut zone = Zone::read(store, other_id).await?;
                    self.remove_zone(store, &mut zone).await
                }
                "profiles" => {
                    let mut profile = Profile::read(store, other_id).await?;
                    self.remove_profile(store, &mut profile).await
                }
                "timeline" => {
                    let link = self.link(Timeline::TABLE)?;
                    association::unset_one_matching(store, link, &mut self.timeline, other_id)
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
    use crate::models::zone::ZoneFields;
    use crate::store::backends::memory::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_empty_allowed_host_clears_it() {
        let mut fields = SdiFields::new("lobby", "");
        fields.apply(SdiFields::parse_update("allowedHost", "screen.local").unwrap());
        assert_eq!(fields.allowed_host.as_deref(), Some("screen.local"));

        fields.apply(SdiFields::parse_update("allowedHost", "  ").unwrap());
        assert_eq!(fields.allowed_host, None);
    }

    #[tokio::test]
    async fn test_display_embeds_every_association() {
        let backend = Arc::new(MemoryStore::new());
        let store = Store::from_arc(backend.clone());
        let sdi_id = backend.insert("sdis", json!({"name": "lobby"}));
        let zone_id = backend.insert("zones", json!({"name": "main"}));
        backend.link("sdis", sdi_id, "zones", zone_id);

        let mut sdi = Sdi::read(&store, sdi_id).await.unwrap();
        let form = sdi.to_display_form(&store, true).await.unwrap();

        assert_eq!(form["name"], json!("lobby"));
        assert_eq!(form["zones"], json!([zone_id]));
        assert_eq!(form["users"], json!([]));
        assert_eq!(form["profiles"], json!([]));
        assert_eq!(form["timeline"], JsonValue::Null);
    }

    #[tokio::test]
    async fn test_zone_back_edge_renders_as_id() {
        let backend = Arc::new(MemoryStore::new());
        let store = Store::from_arc(backend.clone());
        let mut sdi = Sdi::new(SdiFields::new("lobby", ""));
        sdi.create(&store).await.unwrap();
        let mut zone = Zone::new(ZoneFields::new("main"));
        zone.create(&store).await.unwrap();
        sdi.add_zone(&store, &mut zone).await.unwrap();

        let mut fresh = Sdi::read(&store, sdi.id().unwrap()).await.unwrap();
        let form = fresh.to_display_form(&store, false).await.unwrap();

        assert_eq!(form["zones"][0]["name"], json!("main"));
        assert_eq!(form["zones"][0]["sdi"], json!(sdi.id().unwrap()));
    }
}
