//! Entity service: runs command envelopes against the persistence core.
//!
//! A [`Command`] names an action, an entity kind (by table) and its arguments.
//! The service answers every command with an [`Envelope`]; failures become
//! `{"status": "error", "data": {"code", "message"}}`.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use crate::context::Context;
use crate::error::{AppError, ValidationError};
use crate::models::{
    Call, Entity, Fields, InfoType, Linkable, Persist, Profile, Renderer, Sdi, Timeline, User, Zone,
};
use crate::store::{Envelope, RetryPolicy, Store};

/// A request to the persistence core, tagged by `action`.
///
/// # Example
///
/// ```json
/// {"action": "link", "table": "zones", "id": 3, "slot": "renderer", "other_id": 52}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Read {
        table: String,
        id: i64,
    },
    All {
        table: String,
    },
    Find {
        table: String,
        field: String,
        value: String,
    },
    Create {
        table: String,
        fields: Map<String, JsonValue>,
    },
    Update {
        table: String,
        id: i64,
        set: BTreeMap<String, String>,
    },
    Delete {
        table: String,
        id: i64,
    },
    Display {
        table: String,
        id: i64,
        #[serde(default)]
        only_id: bool,
    },
    Check {
        table: String,
        id: i64,
    },
    Link {
        table: String,
        id: i64,
        slot: String,
        other_id: i64,
    },
    Unlink {
        table: String,
        id: i64,
        slot: String,
        other_id: i64,
    },
}

impl Command {
    pub fn table(&self) -> &str {
        match self {
            Command::Read { table, .. }
            | Command::All { table }
            | Command::Find { table, .. }
            | Command::Create { table, .. }
            | Command::Update { table, .. }
            | Command::Delete { table, .. }
            | Command::Display { table, .. }
            | Command::Check { table, .. }
            | Command::Link { table, .. }
            | Command::Unlink { table, .. } => table,
        }
    }

    /// Whether running the command twice leaves the store as running it once.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Command::Read { .. }
                | Command::All { .. }
                | Command::Find { .. }
                | Command::Update { .. }
                | Command::Display { .. }
                | Command::Check { .. }
        )
    }

    fn action(&self) -> &'static str {
        match self {
            Command::Read { .. } => "read",
            Command::All { .. } => "all",
            Command::Find { .. } => "find",
            Command::Create { .. } => "create",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::Display { .. } => "display",
            Command::Check { .. } => "check",
            Command::Link { .. } => "link",
            Command::Unlink { .. } => "unlink",
        }
    }
}

/// Entity kinds addressable by table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Sdi,
    Zone,
    Profile,
    Call,
    Renderer,
    InfoType,
    Timeline,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Sdi,
        EntityKind::Zone,
        EntityKind::Profile,
        EntityKind::Call,
        EntityKind::Renderer,
        EntityKind::InfoType,
        EntityKind::Timeline,
        EntityKind::User,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Sdi => Sdi::TABLE,
            EntityKind::Zone => Zone::TABLE,
            EntityKind::Profile => Profile::TABLE,
            EntityKind::Call => Call::TABLE,
            EntityKind::Renderer => Renderer::TABLE,
            EntityKind::InfoType => InfoType::TABLE,
            EntityKind::Timeline => Timeline::TABLE,
            EntityKind::User => User::TABLE,
        }
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.table() == s)
            .ok_or_else(|| ValidationError::UnknownEntity(s.to_string()))
    }
}

/// Service executing [`Command`]s.
#[derive(Debug, Clone)]
pub struct EntityService {
    store: Store,
    retry: RetryPolicy,
}

impl EntityService {
    pub fn new(store: Store, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn from_context(ctx: &Context) -> Self {
        Self::new(ctx.store.clone(), ctx.retry)
    }

    /// Executes a command and wraps the outcome in a response envelope.
    pub async fn handle(&self, command: Command) -> Envelope {
        let action = command.action();
        match self.execute(command).await {
            Ok(data) => Envelope::success(data),
            Err(e) => {
                tracing::warn!(action, code = e.code(), error = %e, "command failed");
                Envelope::error(json!({
                    "code": e.code(),
                    "message": e.to_string(),
                }))
            }
        }
    }

    /// Executes a command, retrying transient failures of idempotent ones.
    pub async fn execute(&self, command: Command) -> Result<JsonValue, AppError> {
        let kind: EntityKind = command.table().parse()?;
        let retry = if command.is_idempotent() {
            self.retry
        } else {
            RetryPolicy::none()
        };
        tracing::debug!(action = command.action(), table = kind.table(), "executing command");

        match kind {
            EntityKind::Sdi => self.run::<Sdi>(retry, command).await,
            EntityKind::Zone => self.run::<Zone>(retry, command).await,
            EntityKind::Profile => self.run::<Profile>(retry, command).await,
            EntityKind::Call => self.run::<Call>(retry, command).await,
            EntityKind::Renderer => self.run::<Renderer>(retry, command).await,
            EntityKind::InfoType => self.run::<InfoType>(retry, command).await,
            EntityKind::Timeline => self.run::<Timeline>(retry, command).await,
            EntityKind::User => self.run::<User>(retry, command).await,
        }
    }

    async fn run<E: Linkable>(&self, retry: RetryPolicy, command: Command) -> Result<JsonValue, AppError> {
        retry
            .run(&self.store, |store| {
                let command = command.clone();
                async move { execute_on::<E>(&store, command).await }
            })
            .await
    }
}

fn base_form<E: Entity>(entity: &E) -> JsonValue {
    JsonValue::Object(entity.persisted().to_base_form())
}

fn check_slot<E: Linkable>(slot: &str) -> Result<(), AppError> {
    if E::SLOTS.contains(&slot) {
        Ok(())
    } else {
        Err(E::unknown_slot(slot))
    }
}

async fn execute_on<E: Linkable>(store: &Store, command: Command) -> Result<JsonValue, AppError> {
    match command {
        Command::Read { id, .. } => {
            let entity = E::read(store, id).await?;
            Ok(base_form(&entity))
        }
        Command::All { .. } => {
            let entities = E::all(store).await?;
            Ok(JsonValue::Array(entities.iter().map(base_form).collect()))
        }
        Command::Find { field, value, .. } => {
            let entity = E::find_one_by(store, &field, &value).await?;
            Ok(base_form(&entity))
        }
        Command::Create { fields, .. } => {
            let fields: E::Fields = serde_json::from_value(JsonValue::Object(fields)).map_err(|e| {
                ValidationError::InvalidValue {
                    field: "fields".to_string(),
                    reason: e.to_string(),
                }
            })?;
            let mut entity = E::new(fields);
            entity.create(store).await?;
            Ok(base_form(&entity))
        }
        Command::Update { id, set, .. } => {
            let updates = set
                .iter()
                .map(|(field, value)| <E::Fields as Fields>::parse_update(field, value))
                .collect::<Result<Vec<_>, _>>()?;

            let mut entity = E::read(store, id).await?;
            for update in updates {
                entity.apply(update);
            }
            entity.update(store).await?;
            Ok(base_form(&entity))
        }
        Command::Delete { id, .. } => {
            let entity = E::read(store, id).await?;
            entity.delete(store).await?;
            Ok(JsonValue::Null)
        }
        Command::Display { id, only_id, .. } => {
            let mut entity = E::read(store, id).await?;
            entity.to_display_form(store, only_id).await
        }
        Command::Check { id, .. } => {
            let mut entity = E::read(store, id).await?;
            let complete = entity.check_completeness(store).await?;
            Ok(json!({"id": id, "complete": complete}))
        }
        Command::Link { id, slot, other_id, .. } => {
            check_slot::<E>(&slot)?;
            let mut entity = E::read(store, id).await?;
            entity.link_by_id(store, &slot, other_id).await?;
            Ok(JsonValue::Null)
        }
        Command::Unlink { id, slot, other_id, .. } => {
            check_slot::<E>(&slot)?;
            let mut entity = E::read(store, id).await?;
            entity.unlink_by_id(store, &slot, other_id).await?;
            Ok(JsonValue::Null)
        }
    }
}
