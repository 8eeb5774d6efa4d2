//! Core trait for remote store abstraction.
//!
//! A backend only moves bytes: it turns a [`StoreRequest`] into a
//! [`RawResponse`]. Decoding the response envelope happens once, in
//! [`Store`](crate::store::Store), so every backend is held to the same contract.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::store::request::StoreRequest;

/// A raw answer from the remote store, before envelope decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body (`Null` for an empty body).
    pub body: JsonValue,
}

impl RawResponse {
    /// Creates a response from a status code and body.
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to a REST-over-HTTP data store.
///
/// Implementations must be cheap to share: a single backend is wrapped in an
/// `Arc` and used by every entity through [`Store`](crate::store::Store).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Sends a single request and returns the raw response.
    ///
    /// Only transport-level failures (connection refused, client timeout)
    /// are errors here; non-2xx answers are returned as responses.
    async fn send(&self, request: StoreRequest) -> Result<RawResponse, AppError>;
}
