//! CLI module for sixthscreen.
//!
//! Every subcommand maps to one command envelope run through the entity
//! service; the response envelope is printed as JSON on stdout.

mod entity;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// sixthscreen - persistence core of The 6th Screen
#[derive(Parser)]
#[command(name = "sixthscreen")]
#[command(about = "Read, write and associate 6th Screen entities in the remote store")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read one entity by id
    Read {
        /// Entity table (sdis, zones, profiles, calls, renderers, infotypes, timelines, users)
        table: String,
        id: i64,
    },

    /// List every entity of a table
    All { table: String },

    /// Find the first entity whose field equals a value
    Find {
        table: String,
        field: String,
        value: String,
    },

    /// Create an entity from a JSON object of fields
    Create {
        table: String,
        /// Fields as a JSON object, e.g. '{"name": "clock"}'
        fields: String,
    },

    /// Update fields of an entity
    Update {
        table: String,
        id: i64,
        /// Field assignment, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// Delete an entity
    Delete { table: String, id: i64 },

    /// Print the display form of an entity with its associations
    Display {
        table: String,
        id: i64,
        /// Render associated entities as ids only
        #[arg(long)]
        only_id: bool,
    },

    /// Recompute whether an entity is complete
    Check { table: String, id: i64 },

    /// Associate another entity through a named slot
    Link {
        table: String,
        id: i64,
        slot: String,
        other_id: i64,
    },

    /// Dissociate another entity from a named slot
    Unlink {
        table: String,
        id: i64,
        slot: String,
        other_id: i64,
    },

    /// Run a JSON command envelope from a file ('-' for stdin)
    Exec { input: PathBuf },
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))?;
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }
    Ok((field.to_string(), value.to_string()))
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Exec { ref input } => self.run_exec(input).await,
            _ => self.run_entity().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("name=a=b").unwrap(),
            ("name".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("description=").unwrap(),
            ("description".to_string(), String::new())
        );
        assert!(parse_assignment("name").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_cli_parses_update() {
        let app = App::try_parse_from([
            "sixthscreen",
            "-v",
            "update",
            "zones",
            "3",
            "--set",
            "width=50",
            "--set",
            "name=main",
        ])
        .unwrap();
        assert!(app.verbose);
        match app.command {
            Command::Update { table, id, set } => {
                assert_eq!(table, "zones");
                assert_eq!(id, 3);
                assert_eq!(set.len(), 2);
            }
            _ => panic!("expected update"),
        }
    }
}
