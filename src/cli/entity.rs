//! Entity command handlers.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;
use serde_json::{Map, Value as JsonValue};

use crate::config::Config;
use crate::context::Context;
use crate::error::ValidationError;
use crate::services::{self, EntityService};
use crate::store::Envelope;

use super::{App, Command};

/// Collects `--set` pairs, rejecting a field assigned twice.
fn assignments(pairs: &[(String, String)]) -> Result<BTreeMap<String, String>> {
    let mut set = BTreeMap::new();
    for (field, value) in pairs {
        if set.insert(field.clone(), value.clone()).is_some() {
            return Err(ValidationError::InvalidValue {
                field: field.clone(),
                reason: "assigned more than once".to_string(),
            }
            .into());
        }
    }
    Ok(set)
}

impl Command {
    /// Builds the command envelope for an entity subcommand.
    fn to_request(&self) -> Result<services::Command> {
        let request = match self {
            Command::Read { table, id } => services::Command::Read {
                table: table.clone(),
                id: *id,
            },
            Command::All { table } => services::Command::All {
                table: table.clone(),
            },
            Command::Find {
                table,
                field,
                value,
            } => services::Command::Find {
                table: table.clone(),
                field: field.clone(),
                value: value.clone(),
            },
            Command::Create { table, fields } => {
                let fields: Map<String, JsonValue> = serde_json::from_str(fields)
                    .wrap_err("fields must be a JSON object")?;
                services::Command::Create {
                    table: table.clone(),
                    fields,
                }
            }
            Command::Update { table, id, set } => services::Command::Update {
                table: table.clone(),
                id: *id,
                set: assignments(set)?,
            },
            Command::Delete { table, id } => services::Command::Delete {
                table: table.clone(),
                id: *id,
            },
            Command::Display { table, id, only_id } => services::Command::Display {
                table: table.clone(),
                id: *id,
                only_id: *only_id,
            },
            Command::Check { table, id } => services::Command::Check {
                table: table.clone(),
                id: *id,
            },
            Command::Link {
                table,
                id,
                slot,
                other_id,
            } => services::Command::Link {
                table: table.clone(),
                id: *id,
                slot: slot.clone(),
                other_id: *other_id,
            },
            Command::Unlink {
                table,
                id,
                slot,
                other_id,
            } => services::Command::Unlink {
                table: table.clone(),
                id: *id,
                slot: slot.clone(),
                other_id: *other_id,
            },
            Command::Exec { .. } => return Err(eyre!("exec does not map to a single entity command")),
        };
        Ok(request)
    }
}

impl App {
    /// Run an entity subcommand.
    pub async fn run_entity(&self) -> Result<()> {
        let request = self.command.to_request()?;
        execute(request).await
    }

    /// Run a command envelope read from a file or stdin.
    pub async fn run_exec(&self, input: &Path) -> Result<()> {
        let content = if input == Path::new("-") {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        } else {
            std::fs::read_to_string(input)
                .wrap_err_with(|| format!("Failed to read {}", input.display()))?
        };

        let request: services::Command =
            serde_json::from_str(&content).wrap_err("Invalid command envelope")?;
        execute(request).await
    }
}

async fn execute(request: services::Command) -> Result<()> {
    let config = Config::load()?;
    let ctx = Context::from_config(config)?;
    tracing::info!(table = request.table(), "running command");

    let response = EntityService::from_context(&ctx).handle(request).await;
    print_envelope(&response)?;

    if !response.is_success() {
        bail!(
            "command failed: {}",
            response.data["message"].as_str().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_envelope(envelope: &Envelope) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}
