//! InfoType: a category of displayable information (weather, news, clock...).

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::persisted::{Fields, Persisted};
use crate::models::renderer::Renderer;
use crate::models::slot::ToMany;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoTypeFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl InfoTypeFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InfoTypeUpdate {
    Name(String),
    Description(String),
}

impl Fields for InfoTypeFields {
    const REQUIRED: &'static [&'static str] = &["name"];
    type Update = InfoTypeUpdate;

    fn apply(&mut self, update: InfoTypeUpdate) {
        match update {
            InfoTypeUpdate::Name(name) => self.name = name,
            InfoTypeUpdate::Description(description) => self.description = description,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<InfoTypeUpdate, ValidationError> {
        match field {
            "name" => Ok(InfoTypeUpdate::Name(value.to_string())),
            "description" => Ok(InfoTypeUpdate::Description(value.to_string())),
            _ => Err(ValidationError::UnknownField {
                table: InfoType::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoType {
    base: Persisted<InfoTypeFields>,
    renderers: ToMany<Renderer>,
}

impl InfoType {
    pub fn name(&self) -> &str {
        &self.base.fields.name
    }

    pub fn cached_renderers(&self) -> Option<&[Renderer]> {
        self.renderers.get()
    }

    pub async fn load_renderers(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_many(store, self.link(Renderer::TABLE)?, &mut self.renderers).await
    }

    pub async fn renderers(&mut self, store: &Store) -> Result<&[Renderer], AppError> {
        self.load_renderers(store).await?;
        Ok(self.renderers.get().unwrap_or_default())
    }

    /// Fails with `Duplicate` when already present. Loads the slot first when unloaded.
    pub async fn add_renderer(&mut self, store: &Store, renderer: &mut Renderer) -> Result<(), AppError> {
        let link = self.link(Renderer::TABLE)?;
        association::add_many(store, link, &mut self.renderers, renderer).await
    }

    /// Fails with `NotAssociated` when absent. Loads the slot first when unloaded.
    pub async fn remove_renderer(
        &mut self,
        store: &Store,
        renderer: &mut Renderer,
    ) -> Result<(), AppError> {
        let link = self.link(Renderer::TABLE)?;
        association::remove_many(store, link, &mut self.renderers, renderer).await
    }
}

impl Entity for InfoType {
    const TABLE: &'static str = "infotypes";
    type Fields = InfoTypeFields;

    fn persisted(&self) -> &Persisted<InfoTypeFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<InfoTypeFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<InfoTypeFields>) -> Self {
        Self {
            base,
            renderers: ToMany::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.renderers.unload();
    }

    // Renderers are not consulted: the two sides reference each other.
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
            let link = self.link(Renderer::TABLE)?;
            association::load_many(store, link, &mut self.renderers).await?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, link.id);
            let renderers = display::many(&mut self.renderers, store, visiting, only_id).await;
            visiting.leave(Self::TABLE, link.id);

            form.insert("renderers".to_string(), renderers?);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for InfoType {
    const SLOTS: &'static [&'static str] = &["renderers"];

    fn link_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match slot {
                "renderers" => {
                    let mut renderer = Renderer::read(store, other_id).await?;
                    self.add_renderer(store, &mut renderer).await
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
                "renderers" => {
                    let mut renderer = Renderer::read(store, other_id).await?;
                    self.remove_renderer(store, &mut renderer).await
                }
                _ => Err(Self::unknown_slot(slot)),
            }
        })
    }
}
