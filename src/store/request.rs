//! Request builder for fluent store calls.

use std::fmt::Display;

use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;
use crate::store::row::Row;
use crate::store::Store;

/// HTTP verbs understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-described request, as handed to a [`RemoteStore`](crate::store::RemoteStore).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRequest {
    pub method: Method,
    segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    /// Caller-controlled attempt number, starting at 1.
    pub attempt: u32,
}

impl StoreRequest {
    /// Creates a request for the given path segments.
    pub fn new(method: Method, segments: Vec<String>) -> Self {
        Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
            attempt: 1,
        }
    }

    /// Path segments, e.g. `["renderers", "52", "infotypes"]`.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Absolute path, e.g. `/renderers/52/infotypes`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// A builder for constructing and sending store requests.
///
/// # Example
///
/// ```ignore
/// let rows = store
///     .table("renderers")
///     .id(52)
///     .segment("infotypes")
///     .fetch_all()
///     .await?;
/// ```
pub struct Request<'a> {
    store: &'a Store,
    table: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl<'a> Request<'a> {
    /// Creates a new request builder rooted at a table.
    pub fn new(store: &'a Store, table: &str) -> Self {
        Self {
            store,
            table: table.to_string(),
            segments: vec![table.to_string()],
            query: Vec::new(),
        }
    }

    /// Appends a numeric id segment.
    pub fn id(mut self, id: i64) -> Self {
        self.segments.push(id.to_string());
        self
    }

    /// Appends a named segment (an associated table).
    pub fn segment(mut self, name: &str) -> Self {
        self.segments.push(name.to_string());
        self
    }

    /// Adds a `field=value` query filter.
    pub fn filter<V: Display>(mut self, field: &str, value: V) -> Self {
        self.query.push((field.to_string(), value.to_string()));
        self
    }

    /// GETs the resource and splits the payload into rows.
    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        let table = self.row_table();
        let data = self.send(Method::Get, None).await?;
        Row::many(&table, data)
    }

    /// GETs a single object, failing with `NotFound` on an empty payload.
    pub async fn fetch_one(self) -> Result<Row, AppError> {
        let table = self.row_table();
        let id = self.segments[1..].join("/");
        let data = self.send(Method::Get, None).await?;
        if data.is_null() {
            return Err(AppError::NotFound { table, id });
        }
        Row::from_value(&table, data)
    }

    /// POSTs a body and returns the created row.
    pub async fn post(self, body: Map<String, JsonValue>) -> Result<Row, AppError> {
        let table = self.row_table();
        let data = self
            .send(Method::Post, Some(JsonValue::Object(body)))
            .await?;
        Row::from_value(&table, data)
    }

    /// PUTs an optional body and returns the raw payload.
    pub async fn put(self, body: Option<Map<String, JsonValue>>) -> Result<JsonValue, AppError> {
        self.send(Method::Put, body.map(JsonValue::Object)).await
    }

    /// PATCHes a partial body and returns the raw payload.
    pub async fn patch(self, body: Map<String, JsonValue>) -> Result<JsonValue, AppError> {
        self.send(Method::Patch, Some(JsonValue::Object(body)))
            .await
    }

    /// DELETEs the resource.
    pub async fn delete(self) -> Result<(), AppError> {
        self.send(Method::Delete, None).await.map(|_| ())
    }

    /// Table whose rows the payload holds: the last non-numeric segment.
    fn row_table(&self) -> String {
        self.segments
            .iter()
            .rev()
            .find(|s| s.parse::<i64>().is_err())
            .cloned()
            .unwrap_or_else(|| self.table.clone())
    }

    async fn send(self, method: Method, body: Option<JsonValue>) -> Result<JsonValue, AppError> {
        let mut request = StoreRequest::new(method, self.segments);
        request.query = self.query;
        request.body = body;
        self.store.dispatch(request).await
    }
}
