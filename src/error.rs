//! Application error types.

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Application-level errors for the persistence core.
#[derive(Error, Debug)]
pub enum AppError {
    // Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote store error (HTTP {status}): {payload}")]
    Remote { status: u16, payload: JsonValue },

    // Domain errors
    #[error("Not found: {table}/{id}")]
    NotFound { table: String, id: String },

    #[error("Invalid {table} row: field '{field}' {reason}")]
    DataShape {
        table: String,
        field: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a data-shape error for a field that is absent from a row.
    pub fn missing_field(table: &str, field: &str) -> Self {
        AppError::DataShape {
            table: table.to_string(),
            field: field.to_string(),
            reason: "is missing".to_string(),
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Connection failures, client-level timeouts and 5xx answers are transient.
    /// Everything else is deterministic for a given request.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short machine-readable code, used in response envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Transport(_) => "TRANSPORT_ERROR",
            AppError::Remote { .. } => "REMOTE_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::DataShape { .. } => "DATA_SHAPE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Precondition violations detected before any request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{table} has no id; it must be created first")]
    MissingId { table: &'static str },

    #[error("{table}/{id} already exists and cannot be created again")]
    AlreadyPersisted { table: &'static str, id: i64 },

    #[error("{table} is not hydrated (no id) and cannot be associated")]
    NotHydrated { table: &'static str },

    #[error("{table}/{id} already has a {target} set; unset it first")]
    AlreadySet {
        table: &'static str,
        id: i64,
        target: &'static str,
    },

    #[error("{table}/{id} has no {target} to unset")]
    NothingToUnset {
        table: &'static str,
        id: i64,
        target: &'static str,
    },

    #[error("{target}/{other_id} is already associated with {table}/{id}")]
    Duplicate {
        table: &'static str,
        id: i64,
        target: &'static str,
        other_id: i64,
    },

    #[error("{target}/{other_id} is not associated with {table}/{id}")]
    NotAssociated {
        table: &'static str,
        id: i64,
        target: &'static str,
        other_id: i64,
    },

    #[error("{table} has no field '{field}'")]
    UnknownField { table: &'static str, field: String },

    #[error("{table} has no association '{slot}'")]
    UnknownSlot { table: &'static str, slot: String },

    #[error("Unknown entity kind '{0}'")]
    UnknownEntity(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
