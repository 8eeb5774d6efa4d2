//! Renderer: a way of presenting content, compatible with some info types.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::info_type::InfoType;
use crate::models::persisted::{Fields, Persisted};
use crate::models::slot::ToMany;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl RendererFields {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RendererUpdate {
    Name(String),
    Description(String),
}

impl Fields for RendererFields {
    const REQUIRED: &'static [&'static str] = &["name"];
    type Update = RendererUpdate;

    fn apply(&mut self, update: RendererUpdate) {
        match update {
            RendererUpdate::Name(name) => self.name = name,
            RendererUpdate::Description(description) => self.description = description,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<RendererUpdate, ValidationError> {
        match field {
            "name" => Ok(RendererUpdate::Name(value.to_string())),
            "description" => Ok(RendererUpdate::Description(value.to_string())),
            _ => Err(ValidationError::UnknownField {
                table: Renderer::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renderer {
    base: Persisted<RendererFields>,
    info_types: ToMany<InfoType>,
}

impl Renderer {
    pub fn name(&self) -> &str {
        &self.base.fields.name
    }

    pub fn description(&self) -> &str {
        &self.base.fields.description
    }

    /// Cached info types; `None` until loaded.
    pub fn cached_info_types(&self) -> Option<&[InfoType]> {
        self.info_types.get()
    }

    pub async fn load_info_types(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_many(store, self.link(InfoType::TABLE)?, &mut self.info_types).await
    }

    pub async fn info_types(&mut self, store: &Store) -> Result<&[InfoType], AppError> {
        self.load_info_types(store).await?;
        Ok(self.info_types.get().unwrap_or_default())
    }

    /// Fails with `Duplicate` when already present. Loads the slot first when unloaded.
    pub async fn add_info_type(
        &mut self,
        store: &Store,
        info_type: &mut InfoType,
    ) -> Result<(), AppError> {
        let link = self.link(InfoType::TABLE)?;
        association::add_many(store, link, &mut self.info_types, info_type).await
    }

    /// Fails with `NotAssociated` when absent. Loads the slot first when unloaded.
    pub async fn remove_info_type(
        &mut self,
        store: &Store,
        info_type: &mut InfoType,
    ) -> Result<(), AppError> {
        let link = self.link(InfoType::TABLE)?;
        association::remove_many(store, link, &mut self.info_types, info_type).await
    }
}

impl Entity for Renderer {
    const TABLE: &'static str = "renderers";
    type Fields = RendererFields;

    fn persisted(&self) -> &Persisted<RendererFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<RendererFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<RendererFields>) -> Self {
        Self {
            base,
            info_types: ToMany::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.info_types.unload();
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
            let link = self.link(InfoType::TABLE)?;
            association::load_many(store, link, &mut self.info_types).await?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, link.id);
            let info_types = display::many(&mut self.info_types, store, visiting, only_id).await;
            visiting.leave(Self::TABLE, link.id);

            form.insert("infoTypes".to_string(), info_types?);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for Renderer {
    const SLOTS: &'static [&'static str] = &["infoTypes"];

    fn link_by_id<'a>(
        &'a mut self,
        store: &'a Store,
        slot: &'a str,
        other_id: i64,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            match slot {
                "infoTypes" => {
                    let mut info_type = InfoType::read(store, other_id).await?;
                    self.add_info_type(store, &mut info_type).await
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
                "infoTypes" => {
                    let mut info_type = InfoType::read(store, other_id).await?;
                    self.remove_info_type(store, &mut info_type).await
                }
                _ => Err(Self::unknown_slot(slot)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Row;
    use serde_json::json;

    #[test]
    fn test_persisted_form_round_trips() {
        let row = Row::from_value(
            Renderer::TABLE,
            json!({"id": 52, "name": "clock", "description": "Shows the time"}),
        )
        .unwrap();
        let renderer = Renderer::from_persisted_form(&row).unwrap();

        assert_eq!(renderer.id(), Some(52));
        assert_eq!(renderer.name(), "clock");
        assert_eq!(
            JsonValue::Object(renderer.to_persisted_form()),
            json!({"id": 52, "name": "clock", "description": "Shows the time"})
        );
        assert!(renderer.cached_info_types().is_none());
    }

    #[test]
    fn test_parse_update() {
        assert_eq!(
            RendererFields::parse_update("name", "x").unwrap(),
            RendererUpdate::Name("x".into())
        );
        let err = RendererFields::parse_update("setName", "x").unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { table: "renderers", .. }));
    }

    #[test]
    fn test_apply_changes_only_named_field() {
        let mut renderer = Renderer::new(RendererFields::new("clock", "old"));
        renderer.apply(RendererUpdate::Description("new".into()));
        assert_eq!(renderer.name(), "clock");
        assert_eq!(renderer.description(), "new");
    }
}
