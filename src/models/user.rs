//! User: an account owning one or more SDIs.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::persisted::{Fields, Persisted};
use crate::models::sdi::Sdi;
use crate::models::slot::ToMany;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFields {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserFields {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserUpdate {
    Username(String),
    Email(String),
    FirstName(Option<String>),
    LastName(Option<String>),
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim().to_string()).filter(|v| !v.is_empty())
}

impl Fields for UserFields {
    const REQUIRED: &'static [&'static str] = &["username", "email"];
    type Update = UserUpdate;

    fn apply(&mut self, update: UserUpdate) {
        match update {
            UserUpdate::Username(username) => self.username = username,
            UserUpdate::Email(email) => self.email = email,
            UserUpdate::FirstName(first_name) => self.first_name = first_name,
            UserUpdate::LastName(last_name) => self.last_name = last_name,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<UserUpdate, ValidationError> {
        match field {
            "username" => Ok(UserUpdate::Username(value.to_string())),
            "email" if value.contains('@') => Ok(UserUpdate::Email(value.to_string())),
            "email" => Err(ValidationError::InvalidValue {
                field: field.to_string(),
                reason: format!("'{}' is not an email address", value),
            }),
            "firstName" => Ok(UserUpdate::FirstName(optional(value))),
            "lastName" => Ok(UserUpdate::LastName(optional(value))),
            _ => Err(ValidationError::UnknownField {
                table: User::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    base: Persisted<UserFields>,
    sdis: ToMany<Sdi>,
}

impl User {
    pub fn username(&self) -> &str {
        &self.base.fields.username
    }

    pub fn email(&self) -> &str {
        &self.base.fields.email
    }

    pub fn cached_sdis(&self) -> Option<&[Sdi]> {
        self.sdis.get()
    }

    pub async fn load_sdis(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_many(store, self.link(Sdi::TABLE)?, &mut self.sdis).await
    }

    pub async fn sdis(&mut self, store: &Store) -> Result<&[Sdi], AppError> {
        self.load_sdis(store).await?;
        Ok(self.sdis.get().unwrap_or_default())
    }

    /// Fails with `Duplicate` when already present. Loads the slot first when unloaded.
    pub async fn add_sdi(&mut self, store: &Store, sdi: &mut Sdi) -> Result<(), AppError> {
        let link = self.link(Sdi::TABLE)?;
        association::add_many(store, link, &mut self.sdis, sdi).await
    }

    /// Fails with `NotAssociated` when absent. Loads the slot first when unloaded.
    pub async fn remove_sdi(&mut self, store: &Store, sdi: &mut Sdi) -> Result<(), AppError> {
        let link = self.link(Sdi::TABLE)?;
        association::remove_many(store, link, &mut self.sdis, sdi).await
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    type Fields = UserFields;

    fn persisted(&self) -> &Persisted<UserFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<UserFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<UserFields>) -> Self {
        Self {
            base,
            sdis: ToMany::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.sdis.unload();
    }

    fn check_completeness<'a>(&'a mut self, _store: &'a Store) -> BoxFuture<'a, Result<bool, AppError>> {
        Box::pin(async move {
            let fields = &self.base.fields;
            let complete = self.base.id.is_some()
                && !fields.username.trim().is_empty()
                && !fields.email.trim().is_empty();
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
            association::load_many(store, link, &mut self.sdis).await?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, link.id);
            let sdis = display::many(&mut self.sdis, store, visiting, only_id).await;
            visiting.leave(Self::TABLE, link.id);

            form.insert("sdis".to_string(), sdis?);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for User {
    const SLOTS: &'static [&'static str] = &["sdis"];

    fn link_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match slot {
                "sdis" => {
                    let mut sdi = Sdi::read(store, other_id).await?;
                    self.add_sdi(store, &mut sdi).await
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
                "sdis" => {
                    let mut sdi = Sdi::read(store, other_id).await?;
                    self.remove_sdi(store, &mut sdi).await
                }
                _ => Err(Self::unknown_slot(slot)),
            }
        })
    }
}
