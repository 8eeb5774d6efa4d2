//! REST-over-HTTP backend.
//!
//! # Example
//!
//! ```ignore
//! use sixthscreen::config::Config;
//! use sixthscreen::store::{backends::http::HttpStore, Store};
//!
//! let config = Config::load()?;
//! let store = Store::new(HttpStore::new(&config.store)?);
//!
//! let rows = store.table("renderers").fetch_all().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::config::StoreConfig;
use crate::error::AppError;
use crate::store::request::{Method, StoreRequest};
use crate::store::traits::{RawResponse, RemoteStore};

/// Header carrying the caller-controlled attempt number.
pub const ATTEMPT_HEADER: &str = "X-Attempt";

/// HTTP client for the remote REST store.
///
/// This type is cheap to clone - `reqwest::Client` pools connections internally.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Arc<str>,
}

impl HttpStore {
    /// Creates a client for the configured base URL and timeout.
    pub fn new(config: &StoreConfig) -> Result<Self, AppError> {
        let base_url = config.base_url.trim_end_matches('/');
        reqwest::Url::parse(base_url).map_err(|e| {
            AppError::Internal(format!("Invalid store base URL '{}': {}", base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url),
        })
    }

    /// Returns the base URL every path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the absolute URL of a request.
    pub fn url_for(&self, request: &StoreRequest) -> String {
        format!("{}{}", self.base_url, request.path())
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn send(&self, request: StoreRequest) -> Result<RawResponse, AppError> {
        let mut builder = self
            .client
            .request(to_reqwest(request.method), self.url_for(&request))
            .header(ATTEMPT_HEADER, request.attempt);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        // Non-JSON bodies (proxies, HTML error pages) are kept as strings so the
        // envelope decoder can report them.
        let body = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
        };

        Ok(RawResponse::new(status, body))
    }
}
