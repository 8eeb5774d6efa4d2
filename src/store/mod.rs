//! Remote store abstraction for backend-agnostic entity persistence.
//!
//! Entities never talk HTTP directly. They build requests through a [`Store`]
//! handle, which forwards them to any [`RemoteStore`] backend and decodes the
//! `{status, data}` envelope of every answer.
//!
//! # Architecture
//!
//! - [`RemoteStore`] - Sends one request, returns the raw response (required for all backends)
//! - [`Envelope`] - Decodes raw responses into payloads or typed errors
//! - [`Request`] - Fluent request builder (`store.table("zones").id(3).fetch_one()`)
//! - [`RetryPolicy`] - Caller-side bounded retry driven by the attempt number
//!
//! # Usage
//!
//! ```ignore
//! use sixthscreen::store::{backends::memory::MemoryStore, Store};
//!
//! let store = Store::new(MemoryStore::new());
//!
//! let rows = store.table("renderers").fetch_all().await?;
//!
//! store.table("renderers")
//!     .id(52)
//!     .segment("infotypes")
//!     .id(7)
//!     .put(None)
//!     .await?;
//! ```

mod envelope;
mod request;
mod retry;
mod row;
mod traits;

pub mod backends;

pub use envelope::{Envelope, Status};
pub use request::{Method, Request, StoreRequest};
pub use retry::RetryPolicy;
pub use row::Row;
pub use traits::{RawResponse, RemoteStore};

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Shared handle to a remote store backend.
///
/// `Store` is cheap to clone: the backend is `Arc`-based. Each handle carries
/// the attempt number stamped on every request it sends, so a retrying caller
/// hands out `store.with_attempt(n)` for its n-th try.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn RemoteStore>,
    attempt: u32,
}

impl Store {
    /// Creates a handle around the given backend.
    pub fn new(backend: impl RemoteStore + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Creates a handle around an already shared backend.
    pub fn from_arc(backend: Arc<dyn RemoteStore>) -> Self {
        Self {
            backend,
            attempt: 1,
        }
    }

    /// Returns the attempt number stamped on outgoing requests.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns a handle that stamps the given attempt number.
    pub fn with_attempt(&self, attempt: u32) -> Self {
        Self {
            backend: self.backend.clone(),
            attempt: attempt.max(1),
        }
    }

    /// Starts a request rooted at `/<table>`.
    pub fn table(&self, table: &str) -> Request<'_> {
        Request::new(self, table)
    }

    /// Sends a prepared request and decodes its envelope.
    pub async fn dispatch(&self, mut request: StoreRequest) -> Result<JsonValue, AppError> {
        request.attempt = self.attempt;
        tracing::debug!(
            method = %request.method,
            path = %request.path(),
            attempt = request.attempt,
            "store request"
        );

        let method = request.method;
        let path = request.path();
        let response = self.backend.send(request.clone()).await.map_err(|e| {
            tracing::debug!(%method, %path, error = %e, "store transport failure");
            e
        })?;

        Envelope::decode(&request, response).map_err(|e| {
            tracing::debug!(%method, %path, error = %e, "store request failed");
            e
        })
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}
