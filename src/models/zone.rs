//! Zone: a rectangular area of an SDI screen, driven by one renderer.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, ValidationError};
use crate::models::association;
use crate::models::call::Call;
use crate::models::display::{self, Visiting};
use crate::models::entity::{Entity, Linkable, Persist};
use crate::models::persisted::{Fields, Persisted};
use crate::models::renderer::Renderer;
use crate::models::sdi::Sdi;
use crate::models::slot::{ToMany, ToOne};
use crate::store::Store;

/// Zone fields. Positions and sizes are percentages of the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position_from_top: f64,
    #[serde(default)]
    pub position_from_left: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl ZoneFields {
    /// A zone covering the whole screen.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            position_from_top: 0.0,
            position_from_left: 0.0,
            width: 100.0,
            height: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneUpdate {
    Name(String),
    Description(String),
    PositionFromTop(f64),
    PositionFromLeft(f64),
    Width(f64),
    Height(f64),
}

fn percentage(field: &str, value: &str) -> Result<f64, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}' is not a number", value),
    })
}

impl Fields for ZoneFields {
    const REQUIRED: &'static [&'static str] = &["name"];
    type Update = ZoneUpdate;

    fn apply(&mut self, update: ZoneUpdate) {
        match update {
            ZoneUpdate::Name(name) => self.name = name,
            ZoneUpdate::Description(description) => self.description = description,
            ZoneUpdate::PositionFromTop(value) => self.position_from_top = value,
            ZoneUpdate::PositionFromLeft(value) => self.position_from_left = value,
            ZoneUpdate::Width(value) => self.width = value,
            ZoneUpdate::Height(value) => self.height = value,
        }
    }

    fn parse_update(field: &str, value: &str) -> Result<ZoneUpdate, ValidationError> {
        match field {
            "name" => Ok(ZoneUpdate::Name(value.to_string())),
            "description" => Ok(ZoneUpdate::Description(value.to_string())),
            "positionFromTop" => percentage(field, value).map(ZoneUpdate::PositionFromTop),
            "positionFromLeft" => percentage(field, value).map(ZoneUpdate::PositionFromLeft),
            "width" => percentage(field, value).map(ZoneUpdate::Width),
            "height" => percentage(field, value).map(ZoneUpdate::Height),
            _ => Err(ValidationError::UnknownField {
                table: Zone::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    base: Persisted<ZoneFields>,
    sdi: ToOne<Sdi>,
    renderer: ToOne<Renderer>,
    calls: ToMany<Call>,
}

impl Zone {
    pub fn name(&self) -> &str {
        &self.base.fields.name
    }

    /// Cached renderer; `None` until loaded, `Some(None)` when there is none.
    pub fn cached_renderer(&self) -> Option<Option<&Renderer>> {
        self.renderer.get()
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

    pub async fn load_renderer(&mut self, store: &Store) -> Result<(), AppError> {
        association::load_one(store, self.link(Renderer::TABLE)?, &mut self.renderer).await
    }

    pub async fn renderer(&mut self, store: &Store) -> Result<Option<&Renderer>, AppError> {
        self.load_renderer(store).await?;
        Ok(self.renderer.get().flatten())
    }

    /// Fails with `AlreadySet` unless the slot is empty. Loads the slot first when unloaded.
    pub async fn set_renderer(&mut self, store: &Store, renderer: &mut Renderer) -> Result<(), AppError> {
        let link = self.link(Renderer::TABLE)?;
        association::set_one(store, link, &mut self.renderer, renderer).await
    }

    /// Fails with `NothingToUnset` when the slot is empty. Loads the slot first when unloaded.
    pub async fn unset_renderer(&mut self, store: &Store) -> Result<Option<Renderer>, AppError> {
        let link = self.link(Renderer::TABLE)?;
        association::unset_one(store, link, &mut self.renderer).await
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

impl Entity for Zone {
    const TABLE: &'static str = "zones";
    type Fields = ZoneFields;

    fn persisted(&self) -> &Persisted<ZoneFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<ZoneFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<ZoneFields>) -> Self {
        Self {
            base,
            sdi: ToOne::new(),
            renderer: ToOne::new(),
            calls: ToMany::new(),
        }
    }

    fn desynchronize(&mut self) {
        self.sdi.unload();
        self.renderer.unload();
        self.calls.unload();
    }

    /// A zone is complete once named and driven by a complete renderer.
    fn check_completeness<'a>(&'a mut self, store: &'a Store) -> BoxFuture<'a, Result<bool, AppError>> {
        Box::pin(async move {
            let mut complete = self.base.id.is_some() && !self.base.fields.name.trim().is_empty();
            if complete {
                self.load_renderer(store).await?;
                complete = match self.renderer.get_mut() {
                    Some(renderer) => renderer.check_completeness(store).await?,
                    None => false,
                };
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
            let sdi = self.link(Sdi::TABLE)?;
            let renderer = self.link(Renderer::TABLE)?;
            let calls = self.link(Call::TABLE)?;
            futures::try_join!(
                association::load_one(store, sdi, &mut self.sdi),
                association::load_one(store, renderer, &mut self.renderer),
                association::load_many(store, calls, &mut self.calls),
            )?;

            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, id);
            let nested = async {
                let sdi = display::one(&mut self.sdi, store, visiting, only_id).await?;
                let renderer = display::one(&mut self.renderer, store, visiting, only_id).await?;
                let calls = display::many(&mut self.calls, store, visiting, only_id).await?;
                Ok::<_, AppError>((sdi, renderer, calls))
            }
            .await;
            visiting.leave(Self::TABLE, id);
            let (sdi_form, renderer_form, calls_form) = nested?;

            form.insert("sdi".to_string(), sdi_form);
            form.insert("renderer".to_string(), renderer_form);
            form.insert("calls".to_string(), calls_form);
            Ok(JsonValue::Object(form))
        })
    }
}

impl Linkable for Zone {
    const SLOTS: &'static [&'static str] = &["sdi", "renderer", "calls"];

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
                "renderer" => {
                    let mut renderer = Renderer::read(store, other_id).await?;
                    self.set_renderer(store, &mut renderer).await
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
                "renderer" => {
                    let link = self.link(Renderer::TABLE)?;
                    association::unset_one_matching(store, link, &mut self.renderer, other_id)
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
