//! In-process backend implementing the REST store contract.
//!
//! `MemoryStore` answers exactly like the remote store would: every response is
//! a `{status, data}` envelope, missing rows are 404s, and association links are
//! stored symmetrically so both endpoints expose them.
//!
//! It also records every request it receives, which lets tests assert how many
//! round trips an operation cost.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sixthscreen::store::{backends::memory::MemoryStore, Store};
//!
//! let backend = Arc::new(MemoryStore::new());
//! let zone_id = backend.insert("zones", json!({"name": "main"}));
//! let store = Store::from_arc(backend.clone());
//!
//! let row = store.table("zones").id(zone_id).fetch_one().await?;
//! assert_eq!(backend.request_count(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};

use crate::error::AppError;
use crate::store::envelope::Envelope;
use crate::store::request::{Method, StoreRequest};
use crate::store::traits::{RawResponse, RemoteStore};

/// One side of an association link: `(table, id)`.
type Endpoint = (String, i64);

#[derive(Default)]
struct State {
    tables: HashMap<String, BTreeMap<i64, Map<String, JsonValue>>>,
    links: BTreeSet<(Endpoint, Endpoint)>,
    next_id: i64,
    failures: VecDeque<RawResponse>,
    log: Vec<StoreRequest>,
}

/// In-memory REST store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row without logging a request, returning its assigned id.
    pub fn insert(&self, table: &str, row: JsonValue) -> i64 {
        let mut state = self.lock();
        let fields = match row {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        state.create_row(table, fields)
    }

    /// Links two rows without logging a request.
    pub fn link(&self, table: &str, id: i64, target: &str, target_id: i64) {
        let mut state = self.lock();
        state.add_link((table.to_string(), id), (target.to_string(), target_id));
    }

    /// Returns whether two rows are linked.
    pub fn is_linked(&self, table: &str, id: i64, target: &str, target_id: i64) -> bool {
        self.lock()
            .links
            .contains(&((table.to_string(), id), (target.to_string(), target_id)))
    }

    /// Returns a stored row, if present.
    pub fn row(&self, table: &str, id: i64) -> Option<JsonValue> {
        self.lock()
            .tables
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned()
            .map(JsonValue::Object)
    }

    /// Queues an error answer for the next request, whatever it is.
    pub fn fail_next(&self, status: u16, payload: JsonValue) {
        self.lock()
            .failures
            .push_back(RawResponse::new(status, json!(Envelope::error(payload))));
    }

    /// Returns every request received so far, oldest first.
    pub fn requests(&self) -> Vec<StoreRequest> {
        self.lock().log.clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().log.len()
    }

    /// Forgets the request log.
    pub fn clear_requests(&self) {
        self.lock().log.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn send(&self, request: StoreRequest) -> Result<RawResponse, AppError> {
        let mut state = self.lock();
        state.log.push(request.clone());

        if let Some(failure) = state.failures.pop_front() {
            return Ok(failure);
        }

        Ok(state.route(&request))
    }
}

fn ok(data: JsonValue) -> RawResponse {
    RawResponse::new(200, json!(Envelope::success(data)))
}

fn fail(status: u16, message: String) -> RawResponse {
    RawResponse::new(status, json!(Envelope::error(JsonValue::String(message))))
}

impl State {
    fn route(&mut self, request: &StoreRequest) -> RawResponse {
        let segments = request.segments();
        let path = request.path();

        match (request.method, segments) {
            (Method::Get, [table]) => ok(self.list(table, &request.query)),
            (Method::Post, [table]) => match &request.body {
                Some(JsonValue::Object(body)) => {
                    let id = self.create_row(table, body.clone());
                    ok(self.row_value(table, id))
                }
                _ => fail(400, format!("{} requires an object body", path)),
            },
            (method, [table, id]) => {
                let Some(id) = parse_id(id) else {
                    return fail(400, format!("invalid id in {}", path));
                };
                if !self.exists(table, id) {
                    return fail(404, format!("{} not found", path));
                }
                match (method, &request.body) {
                    (Method::Get, _) => ok(self.row_value(table, id)),
                    (Method::Put, Some(JsonValue::Object(body))) => {
                        self.write_row(table, id, body.clone(), true);
                        ok(self.row_value(table, id))
                    }
                    (Method::Patch, Some(JsonValue::Object(body))) => {
                        self.write_row(table, id, body.clone(), false);
                        ok(self.row_value(table, id))
                    }
                    (Method::Delete, _) => {
                        self.delete_row(table, id);
                        ok(JsonValue::Null)
                    }
                    _ => fail(400, format!("unsupported {} on {}", method, path)),
                }
            }
            (Method::Get, [table, id, target]) => {
                let Some(id) = parse_id(id) else {
                    return fail(400, format!("invalid id in {}", path));
                };
                if !self.exists(table, id) {
                    return fail(404, format!("{} not found", path));
                }
                ok(self.linked_rows(table, id, target))
            }
            (method @ (Method::Put | Method::Delete), [table, id, target, target_id]) => {
                let (Some(id), Some(target_id)) = (parse_id(id), parse_id(target_id)) else {
                    return fail(400, format!("invalid id in {}", path));
                };
                if !self.exists(table, id) || !self.exists(target, target_id) {
                    return fail(404, format!("{} not found", path));
                }
                let from = (table.clone(), id);
                let to = (target.clone(), target_id);
                if method == Method::Put {
                    self.add_link(from, to);
                } else if !self.remove_link(from, to) {
                    return fail(404, format!("{} is not linked", path));
                }
                ok(JsonValue::Null)
            }
            (method, _) => fail(400, format!("unsupported {} on {}", method, path)),
        }
    }

    fn create_row(&mut self, table: &str, mut fields: Map<String, JsonValue>) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        let now = chrono::Utc::now().to_rfc3339();
        fields.insert("id".to_string(), json!(id));
        fields.insert("createdAt".to_string(), json!(now));
        fields.insert("updatedAt".to_string(), json!(now));
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(id, fields);
        id
    }

    fn write_row(&mut self, table: &str, id: i64, body: Map<String, JsonValue>, replace: bool) {
        let Some(row) = self.tables.get_mut(table).and_then(|rows| rows.get_mut(&id)) else {
            return;
        };
        let created_at = row.get("createdAt").cloned();
        if replace {
            row.clear();
            if let Some(created_at) = created_at {
                row.insert("createdAt".to_string(), created_at);
            }
        }
        for (key, value) in body {
            if key != "id" && key != "createdAt" {
                row.insert(key, value);
            }
        }
        row.insert("id".to_string(), json!(id));
        row.insert(
            "updatedAt".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
    }

    fn delete_row(&mut self, table: &str, id: i64) {
        if let Some(rows) = self.tables.get_mut(table) {
            rows.remove(&id);
        }
        let endpoint = (table.to_string(), id);
        self.links
            .retain(|(from, to)| *from != endpoint && *to != endpoint);
    }

    fn exists(&self, table: &str, id: i64) -> bool {
        self.tables
            .get(table)
            .is_some_and(|rows| rows.contains_key(&id))
    }

    fn row_value(&self, table: &str, id: i64) -> JsonValue {
        self.tables
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned()
            .map(JsonValue::Object)
            .unwrap_or(JsonValue::Null)
    }

    fn list(&self, table: &str, query: &[(String, String)]) -> JsonValue {
        let rows = self
            .tables
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.values())
            .filter(|row| query.iter().all(|(field, value)| matches(row, field, value)))
            .cloned()
            .map(JsonValue::Object)
            .collect();
        JsonValue::Array(rows)
    }

    fn linked_rows(&self, table: &str, id: i64, target: &str) -> JsonValue {
        let rows = self
            .links
            .iter()
            .filter(|(from, to)| from.0 == table && from.1 == id && to.0 == target)
            .map(|(_, to)| self.row_value(&to.0, to.1))
            .filter(|row| !row.is_null())
            .collect();
        JsonValue::Array(rows)
    }

    fn add_link(&mut self, from: Endpoint, to: Endpoint) {
        self.links.insert((to.clone(), from.clone()));
        self.links.insert((from, to));
    }

    fn remove_link(&mut self, from: Endpoint, to: Endpoint) -> bool {
        let reverse = (to.clone(), from.clone());
        self.links.remove(&reverse);
        self.links.remove(&(from, to))
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

/// Query-string filters compare against the field's textual form.
fn matches(row: &Map<String, JsonValue>, field: &str, value: &str) -> bool {
    match row.get(field) {
        Some(JsonValue::String(s)) => s == value,
        Some(JsonValue::Null) | None => false,
        Some(other) => other.to_string() == value,
    }
}
