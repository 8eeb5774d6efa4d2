//! Application context shared by services and CLI handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::store::backends::http::HttpStore;
use crate::store::{RetryPolicy, Store};

/// Root application context.
///
/// Built once from [`Config`] and passed down explicitly; nothing reads the
/// store location from global state.
#[derive(Clone, Debug)]
pub struct Context {
    /// Handle to the remote store.
    pub store: Store,
    /// Application configuration.
    pub config: Arc<Config>,
    /// Retry policy applied by services around idempotent operations.
    pub retry: RetryPolicy,
}

impl Context {
    /// Creates a context around an existing store handle.
    pub fn new(store: Store, config: Config) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        Self {
            store,
            config: Arc::new(config),
            retry,
        }
    }

    /// Creates a context backed by the configured HTTP store.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let backend = HttpStore::new(&config.store)?;
        tracing::debug!(base_url = backend.base_url(), "using HTTP store");
        Ok(Self::new(Store::new(backend), config))
    }
}
