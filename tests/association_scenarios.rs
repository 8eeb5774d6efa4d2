//! End-to-end scenarios for entities, associations and display forms.
//!
//! Everything runs against the in-process store, whose request log lets the
//! tests count round trips.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use sixthscreen::error::{AppError, ValidationError};
use sixthscreen::models::{
    association, display, Call, CallFields, Entity, Fields, InfoType, InfoTypeFields, Persist,
    Persisted, Profile, ProfileFields, Renderer, RendererFields, Sdi, SdiFields, Timeline,
    TimelineFields, ToOne, User, UserFields, Visiting, Zone, ZoneFields,
};
use sixthscreen::store::backends::memory::MemoryStore;
use sixthscreen::store::{Method, RawResponse, RemoteStore, Row, Store, StoreRequest};

fn setup() -> (Arc<MemoryStore>, Store) {
    let backend = Arc::new(MemoryStore::new());
    let store = Store::from_arc(backend.clone());
    (backend, store)
}

async fn created<E: Entity>(store: &Store, fields: E::Fields) -> E {
    let mut entity = E::new(fields);
    entity.create(store).await.unwrap();
    entity
}

fn validation(err: AppError) -> ValidationError {
    match err {
        AppError::Validation(inner) => inner,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

// ============================================================================
// Persisted form
// ============================================================================

fn assert_round_trip<E: Entity + PartialEq>(fields: E::Fields) {
    let mut persisted = Persisted::new(fields);
    persisted.id = Some(7);
    let entity = E::from_persisted(persisted);

    let row = Row::new(E::TABLE, entity.to_persisted_form());
    let back = E::from_persisted_form(&row).unwrap();
    assert_eq!(back, entity, "round trip of {}", E::TABLE);
}

#[test]
fn test_round_trip_every_entity_type() {
    assert_round_trip::<Renderer>(RendererFields::new("clock", "Shows the time"));
    assert_round_trip::<InfoType>(InfoTypeFields::new("weather", ""));
    assert_round_trip::<Sdi>(SdiFields {
        allowed_host: Some("screen.local".into()),
        ..SdiFields::new("lobby", "Ground floor")
    });
    assert_round_trip::<Zone>(ZoneFields {
        position_from_top: 12.5,
        width: 50.0,
        ..ZoneFields::new("main")
    });
    assert_round_trip::<Profile>(ProfileFields::new("day", "Office hours"));
    assert_round_trip::<Call>(CallFields::new("forecast", ""));
    assert_round_trip::<Timeline>(TimelineFields::new("week", ""));
    assert_round_trip::<User>(UserFields {
        first_name: Some("Ada".into()),
        ..UserFields::new("ada", "ada@example.org")
    });
}

#[test]
fn test_renderer_persisted_form_is_exact() {
    let row = Row::from_value(
        Renderer::TABLE,
        json!({"id": 52, "name": "toto", "description": "blabla"}),
    )
    .unwrap();
    let renderer = Renderer::from_persisted_form(&row).unwrap();

    assert_eq!(
        JsonValue::Object(renderer.to_persisted_form()),
        json!({"id": 52, "name": "toto", "description": "blabla"})
    );
}

#[test]
fn test_info_type_without_id_names_id() {
    let row = Row::from_value(InfoType::TABLE, json!({"name": "toto", "complete": true})).unwrap();
    match InfoType::from_persisted_form(&row) {
        Err(AppError::DataShape { field, .. }) => assert_eq!(field, "id"),
        other => panic!("expected a data-shape error, got {:?}", other),
    }
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_create_read_update_delete() {
    let (backend, store) = setup();
    let mut renderer: Renderer = created(&store, RendererFields::new("clock", "old")).await;
    let id = renderer.id().unwrap();

    renderer.apply(RendererFields::parse_update("description", "new").unwrap());
    renderer.update(&store).await.unwrap();

    let read = Renderer::read(&store, id).await.unwrap();
    assert_eq!(read.description(), "new");
    assert!(read.persisted().created_at.is_some());

    read.delete(&store).await.unwrap();
    assert!(backend.row("renderers", id).is_none());
    assert!(matches!(
        Renderer::read(&store, id).await,
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_create_twice_is_rejected_without_request() {
    let (backend, store) = setup();
    let mut renderer: Renderer = created(&store, RendererFields::new("clock", "")).await;
    backend.clear_requests();

    let err = renderer.create(&store).await.unwrap_err();
    assert!(matches!(validation(err), ValidationError::AlreadyPersisted { .. }));
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_update_and_delete_need_an_id() {
    let (backend, store) = setup();
    let mut zone = Zone::new(ZoneFields::new("main"));

    let err = zone.update(&store).await.unwrap_err();
    assert_eq!(validation(err), ValidationError::MissingId { table: "zones" });
    let err = zone.delete(&store).await.unwrap_err();
    assert_eq!(validation(err), ValidationError::MissingId { table: "zones" });
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_all_and_find_one_by() {
    let (backend, store) = setup();
    backend.insert("users", json!({"username": "ada", "email": "ada@example.org"}));
    backend.insert("users", json!({"username": "alan", "email": "alan@example.org"}));

    let users = User::all(&store).await.unwrap();
    assert_eq!(users.len(), 2);

    let alan = User::find_one_by(&store, "username", "alan").await.unwrap();
    assert_eq!(alan.email(), "alan@example.org");

    assert!(matches!(
        User::find_one_by(&store, "username", "grace").await,
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_all_fails_on_one_malformed_row() {
    let (backend, store) = setup();
    backend.insert("users", json!({"username": "ada", "email": "ada@example.org"}));
    backend.insert("users", json!({"username": "nomail"}));

    match User::all(&store).await {
        Err(AppError::DataShape { field, .. }) => assert_eq!(field, "email"),
        other => panic!("expected a data-shape error, got {:?}", other),
    }
}

// ============================================================================
// Lazy loading
// ============================================================================

#[tokio::test]
async fn test_load_once() {
    let (backend, store) = setup();
    let zone_id = backend.insert("zones", json!({"name": "main"}));
    let renderer_id = backend.insert("renderers", json!({"name": "clock"}));
    backend.link("zones", zone_id, "renderers", renderer_id);

    let mut zone = Zone::read(&store, zone_id).await.unwrap();
    backend.clear_requests();

    zone.load_renderer(&store).await.unwrap();
    let first = zone.cached_renderer().unwrap().cloned();
    zone.load_renderer(&store).await.unwrap();
    let second = zone.renderer(&store).await.unwrap().cloned();

    assert_eq!(backend.request_count(), 1);
    assert_eq!(first, second);
    assert_eq!(second.and_then(|r| r.id()), Some(renderer_id));
}

#[tokio::test]
async fn test_empty_to_one_loads_as_null() {
    let (backend, store) = setup();
    let zone_id = backend.insert("zones", json!({"name": "main"}));
    let mut zone = Zone::read(&store, zone_id).await.unwrap();
    assert_eq!(zone.cached_renderer(), None);

    zone.load_renderer(&store).await.unwrap();
    assert_eq!(zone.cached_renderer(), Some(None));
}

/// Answers every request with the same canned body.
struct CannedStore {
    body: JsonValue,
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl RemoteStore for CannedStore {
    async fn send(&self, request: StoreRequest) -> Result<RawResponse, AppError> {
        self.seen.lock().unwrap().push(request.path());
        Ok(RawResponse::new(200, self.body.clone()))
    }
}

fn canned(data: JsonValue) -> (Arc<CannedStore>, Store) {
    let backend = Arc::new(CannedStore {
        body: json!({"status": "success", "data": data}),
        seen: Mutex::new(Vec::new()),
    });
    (backend.clone(), Store::from_arc(backend))
}

fn hydrated_zone() -> Zone {
    let row = Row::from_value(Zone::TABLE, json!({"id": 3, "name": "main"})).unwrap();
    Zone::from_persisted_form(&row).unwrap()
}

#[tokio::test]
async fn test_to_one_accepts_null_and_bare_object() {
    let (backend, store) = canned(JsonValue::Null);
    let mut zone = hydrated_zone();
    zone.load_renderer(&store).await.unwrap();
    assert_eq!(zone.cached_renderer(), Some(None));
    assert_eq!(*backend.seen.lock().unwrap(), vec!["/zones/3/renderers".to_string()]);

    let (_backend, store) = canned(json!({"id": 52, "name": "clock"}));
    let mut zone = hydrated_zone();
    let renderer = zone.renderer(&store).await.unwrap();
    assert_eq!(renderer.map(|r| r.name()), Some("clock"));
}

// ============================================================================
// Association mutations
// ============================================================================

#[tokio::test]
async fn test_set_then_read_back_without_requests() {
    let (backend, store) = setup();
    let mut zone: Zone = created(&store, ZoneFields::new("main")).await;
    let mut renderer: Renderer = created(&store, RendererFields::new("clock", "")).await;

    zone.set_renderer(&store, &mut renderer).await.unwrap();
    backend.clear_requests();

    let cached = zone.renderer(&store).await.unwrap().and_then(|r| r.id());
    assert_eq!(cached, renderer.id());
    assert_eq!(backend.request_count(), 0);
    assert!(backend.is_linked("zones", zone.id().unwrap(), "renderers", renderer.id().unwrap()));

    let previous = zone.unset_renderer(&store).await.unwrap();
    assert_eq!(previous.and_then(|r| r.id()), renderer.id());
    backend.clear_requests();

    assert!(zone.renderer(&store).await.unwrap().is_none());
    assert_eq!(backend.request_count(), 0);
    assert!(!backend.is_linked("zones", zone.id().unwrap(), "renderers", renderer.id().unwrap()));
}

#[tokio::test]
async fn test_association_is_visible_from_both_sides() {
    let (_backend, store) = setup();
    let mut renderer: Renderer = created(&store, RendererFields::new("clock", "")).await;
    let mut info_type: InfoType = created(&store, InfoTypeFields::new("time", "")).await;

    renderer.add_info_type(&store, &mut info_type).await.unwrap();

    let renderers = info_type.renderers(&store).await.unwrap();
    assert_eq!(renderers.len(), 1);
    assert_eq!(renderers[0].id(), renderer.id());
}

#[tokio::test]
async fn test_set_desynchronizes_other_side() {
    let (_backend, store) = setup();
    let mut zone: Zone = created(&store, ZoneFields::new("main")).await;
    let mut renderer: Renderer = created(&store, RendererFields::new("clock", "")).await;
    renderer.load_info_types(&store).await.unwrap();
    assert!(renderer.cached_info_types().is_some());

    zone.set_renderer(&store, &mut renderer).await.unwrap();

    assert!(renderer.cached_info_types().is_none());
    assert_eq!(renderer.name(), "clock");
}

#[tokio::test]
async fn test_remove_from_to_many() {
    let (backend, store) = setup();
    let mut sdi: Sdi = created(&store, SdiFields::new("lobby", "")).await;
    let mut first: Zone = created(&store, ZoneFields::new("left")).await;
    let mut second: Zone = created(&store, ZoneFields::new("right")).await;
    sdi.add_zone(&store, &mut first).await.unwrap();
    sdi.add_zone(&store, &mut second).await.unwrap();

    sdi.remove_zone(&store, &mut first).await.unwrap();

    let names: Vec<&str> = sdi.cached_zones().unwrap().iter().map(|z| z.name()).collect();
    assert_eq!(names, vec!["right"]);
    assert!(!backend.is_linked("sdis", sdi.id().unwrap(), "zones", first.id().unwrap()));

    let err = sdi.remove_zone(&store, &mut first).await.unwrap_err();
    assert!(matches!(validation(err), ValidationError::NotAssociated { .. }));
}

#[tokio::test]
async fn test_set_when_already_set_sends_nothing() {
    let (backend, store) = setup();
    let mut call: Call = created(&store, CallFields::new("forecast", "")).await;
    let mut zone: Zone = created(&store, ZoneFields::new("main")).await;
    let mut other: Zone = created(&store, ZoneFields::new("side")).await;
    call.set_zone(&store, &mut zone).await.unwrap();
    backend.clear_requests();

    let err = call.set_zone(&store, &mut other).await.unwrap_err();
    assert!(matches!(validation(err), ValidationError::AlreadySet { target: "zones", .. }));
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_unset_with_nothing_set_sends_nothing() {
    let (backend, store) = setup();
    let mut sdi: Sdi = created(&store, SdiFields::new("lobby", "")).await;
    sdi.load_timeline(&store).await.unwrap();
    backend.clear_requests();

    let err = sdi.unset_timeline(&store).await.unwrap_err();
    assert!(matches!(validation(err), ValidationError::NothingToUnset { .. }));
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_unset_on_unloaded_slot_costs_only_the_load() {
    let (backend, store) = setup();
    let mut sdi: Sdi = created(&store, SdiFields::new("lobby", "")).await;
    backend.clear_requests();

    let err = sdi.unset_timeline(&store).await.unwrap_err();
    assert!(matches!(validation(err), ValidationError::NothingToUnset { .. }));
    let methods: Vec<Method> = backend.requests().iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::Get]);
}

#[tokio::test]
async fn test_add_duplicate_sends_nothing() {
    let (backend, store) = setup();
    let mut user: User = created(&store, UserFields::new("ada", "ada@example.org")).await;
    let mut sdi: Sdi = created(&store, SdiFields::new("lobby", "")).await;
    user.add_sdi(&store, &mut sdi).await.unwrap();
    backend.clear_requests();

    let err = user.add_sdi(&store, &mut sdi).await.unwrap_err();
    assert!(matches!(validation(err), ValidationError::Duplicate { .. }));
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_add_non_hydrated_sends_nothing() {
    let (backend, store) = setup();
    let mut profile: Profile = created(&store, ProfileFields::new("day", "")).await;
    backend.clear_requests();

    let mut call = Call::new(CallFields::new("forecast", ""));
    let err = profile.add_call(&store, &mut call).await.unwrap_err();
    assert_eq!(validation(err), ValidationError::NotHydrated { table: "calls" });
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_transient_owner_cannot_load() {
    let (backend, store) = setup();
    let mut timeline = Timeline::new(TimelineFields::new("week", ""));

    let err = timeline.load_sdi(&store).await.unwrap_err();
    assert_eq!(validation(err), ValidationError::MissingId { table: "timelines" });
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_failed_write_leaves_cache_untouched() {
    let (backend, store) = setup();
    let mut zone: Zone = created(&store, ZoneFields::new("main")).await;
    let mut renderer: Renderer = created(&store, RendererFields::new("clock", "")).await;
    zone.load_renderer(&store).await.unwrap();
    renderer.load_info_types(&store).await.unwrap();
    backend.fail_next(500, json!("boom"));

    let err = zone.set_renderer(&store, &mut renderer).await.unwrap_err();
    assert!(matches!(err, AppError::Remote { status: 500, .. }));
    assert_eq!(zone.cached_renderer(), Some(None));
    assert!(renderer.cached_info_types().is_some());
}

// ============================================================================
// Desynchronize counting
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TrackedFields {
    label: String,
}

impl Fields for TrackedFields {
    const REQUIRED: &'static [&'static str] = &["label"];
    type Update = String;

    fn apply(&mut self, update: String) {
        self.label = update;
    }

    fn parse_update(field: &str, value: &str) -> Result<String, ValidationError> {
        match field {
            "label" => Ok(value.to_string()),
            _ => Err(ValidationError::UnknownField {
                table: Tracked::TABLE,
                field: field.to_string(),
            }),
        }
    }
}

/// Entity counting how often it is desynchronized.
#[derive(Debug, Clone)]
struct Tracked {
    base: Persisted<TrackedFields>,
    partner: ToOne<Tracked>,
    desyncs: Arc<AtomicUsize>,
}

impl Entity for Tracked {
    const TABLE: &'static str = "tracked";
    type Fields = TrackedFields;

    fn persisted(&self) -> &Persisted<TrackedFields> {
        &self.base
    }

    fn persisted_mut(&mut self) -> &mut Persisted<TrackedFields> {
        &mut self.base
    }

    fn from_persisted(base: Persisted<TrackedFields>) -> Self {
        Self {
            base,
            partner: ToOne::new(),
            desyncs: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn desynchronize(&mut self) {
        self.desyncs.fetch_add(1, Ordering::SeqCst);
        self.partner.unload();
    }

    fn display_with<'a>(
        &'a mut self,
        store: &'a Store,
        visiting: &'a mut Visiting,
        only_id: bool,
    ) -> BoxFuture<'a, Result<JsonValue, AppError>> {
        Box::pin(async move {
            let link = self.link(Self::TABLE)?;
            association::load_one(store, link, &mut self.partner).await?;
            let mut form = self.base.to_base_form();
            visiting.enter(Self::TABLE, link.id);
            let partner = display::one(&mut self.partner, store, visiting, only_id).await;
            visiting.leave(Self::TABLE, link.id);
            form.insert("partner".to_string(), partner?);
            Ok(JsonValue::Object(form))
        })
    }
}

#[tokio::test]
async fn test_set_desynchronizes_other_exactly_once() {
    let (_backend, store) = setup();
    let mut owner: Tracked = created(&store, TrackedFields { label: "a".into() }).await;
    let mut other: Tracked = created(&store, TrackedFields { label: "b".into() }).await;

    let link = owner.link(Tracked::TABLE).unwrap();
    association::set_one(&store, link, &mut owner.partner, &mut other)
        .await
        .unwrap();

    assert_eq!(other.desyncs.load(Ordering::SeqCst), 1);
    assert_eq!(owner.desyncs.load(Ordering::SeqCst), 0);

    association::unset_one(&store, link, &mut owner.partner)
        .await
        .unwrap();
    assert_eq!(other.desyncs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_guard_failure_does_not_desynchronize() {
    let (_backend, store) = setup();
    let mut owner: Tracked = created(&store, TrackedFields { label: "a".into() }).await;
    let mut first: Tracked = created(&store, TrackedFields { label: "b".into() }).await;
    let mut second: Tracked = created(&store, TrackedFields { label: "c".into() }).await;

    let link = owner.link(Tracked::TABLE).unwrap();
    association::set_one(&store, link, &mut owner.partner, &mut first)
        .await
        .unwrap();
    assert!(association::set_one(&store, link, &mut owner.partner, &mut second)
        .await
        .is_err());

    assert_eq!(second.desyncs.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Completeness
// ============================================================================

#[tokio::test]
async fn test_completeness_is_idempotent() {
    let (backend, store) = setup();
    let zone_id = backend.insert("zones", json!({"name": "main"}));
    let renderer_id = backend.insert("renderers", json!({"name": "clock"}));
    backend.link("zones", zone_id, "renderers", renderer_id);
    let call_id = backend.insert("calls", json!({"name": "forecast"}));

    let mut zone = Zone::read(&store, zone_id).await.unwrap();
    let first = zone.check_completeness(&store).await.unwrap();
    let second = zone.check_completeness(&store).await.unwrap();
    assert!(first);
    assert_eq!(first, second);

    let mut call = Call::read(&store, call_id).await.unwrap();
    let first = call.check_completeness(&store).await.unwrap();
    let second = call.check_completeness(&store).await.unwrap();
    assert!(!first);
    assert_eq!(first, second);
    assert_eq!(call.is_complete(), second);
}

#[tokio::test]
async fn test_completeness_terminates_on_cycles() {
    let (backend, store) = setup();
    let renderer_id = backend.insert("renderers", json!({"name": "clock"}));
    let info_type_id = backend.insert("infotypes", json!({"name": "time"}));
    backend.link("renderers", renderer_id, "infotypes", info_type_id);

    let mut renderer = Renderer::read(&store, renderer_id).await.unwrap();
    let mut info_type = InfoType::read(&store, info_type_id).await.unwrap();
    assert!(renderer.check_completeness(&store).await.unwrap());
    assert!(info_type.check_completeness(&store).await.unwrap());
}

// ============================================================================
// Display form
// ============================================================================

#[tokio::test]
async fn test_display_cycle_renders_back_edges_as_ids() {
    let (backend, store) = setup();
    let renderer_id = backend.insert("renderers", json!({"name": "clock"}));
    let info_type_id = backend.insert("infotypes", json!({"name": "time"}));
    backend.link("renderers", renderer_id, "infotypes", info_type_id);

    let mut renderer = Renderer::read(&store, renderer_id).await.unwrap();
    let form = renderer.to_display_form(&store, false).await.unwrap();

    assert_eq!(form["id"], json!(renderer_id));
    assert_eq!(form["complete"], json!(true));
    assert_eq!(form["infoTypes"][0]["name"], json!("time"));
    assert_eq!(form["infoTypes"][0]["renderers"], json!([renderer_id]));
}

#[tokio::test]
async fn test_display_expands_shared_entity_once() {
    let (backend, store) = setup();
    let sdi_id = backend.insert("sdis", json!({"name": "lobby"}));
    let left = backend.insert("zones", json!({"name": "left"}));
    let right = backend.insert("zones", json!({"name": "right"}));
    let renderer_id = backend.insert("renderers", json!({"name": "clock"}));
    for zone in [left, right] {
        backend.link("sdis", sdi_id, "zones", zone);
        backend.link("zones", zone, "renderers", renderer_id);
    }

    let mut sdi = Sdi::read(&store, sdi_id).await.unwrap();
    let form = sdi.to_display_form(&store, false).await.unwrap();

    let zones = form["zones"].as_array().unwrap();
    assert_eq!(zones.len(), 2);
    let expanded = zones
        .iter()
        .filter(|zone| zone["renderer"]["name"] == json!("clock"))
        .count();
    let as_id = zones
        .iter()
        .filter(|zone| zone["renderer"] == json!(renderer_id))
        .count();
    assert_eq!((expanded, as_id), (1, 1));
    for zone in zones {
        assert_eq!(zone["sdi"], json!(sdi_id));
    }
}

#[tokio::test]
async fn test_display_of_dense_graph_loads_each_entity_once() {
    const N: usize = 4;
    let (backend, store) = setup();
    let renderers: Vec<i64> = (0..N)
        .map(|i| backend.insert("renderers", json!({"name": format!("renderer-{}", i)})))
        .collect();
    let info_types: Vec<i64> = (0..N)
        .map(|i| backend.insert("infotypes", json!({"name": format!("info-{}", i)})))
        .collect();
    for renderer in &renderers {
        for info_type in &info_types {
            backend.link("renderers", *renderer, "infotypes", *info_type);
        }
    }

    let mut root = Renderer::read(&store, renderers[0]).await.unwrap();
    backend.clear_requests();
    let mut visiting = Visiting::new();
    let form = root.display_with(&store, &mut visiting, false).await.unwrap();

    // One association load per entity in the component.
    assert_eq!(backend.request_count(), 2 * N);
    assert_eq!(visiting.rendered_count(), 2 * N);
    assert!(visiting.is_empty());
    assert_eq!(form["infoTypes"].as_array().unwrap().len(), N);
}

#[tokio::test]
async fn test_display_only_id() {
    let (backend, store) = setup();
    let call_id = backend.insert("calls", json!({"name": "forecast"}));
    let zone_id = backend.insert("zones", json!({"name": "main"}));
    backend.link("calls", call_id, "zones", zone_id);

    let mut call = Call::read(&store, call_id).await.unwrap();
    let form = call.to_display_form(&store, true).await.unwrap();

    assert_eq!(form["zone"], json!(zone_id));
    assert_eq!(form["profile"], JsonValue::Null);
    assert_eq!(form["name"], json!("forecast"));
}

#[tokio::test]
async fn test_display_fails_fast_on_load_error() {
    let (backend, store) = setup();
    let zone_id = backend.insert("zones", json!({"name": "main"}));
    let mut zone = Zone::read(&store, zone_id).await.unwrap();
    backend.fail_next(502, json!("bad gateway"));

    let err = zone.to_display_form(&store, false).await.unwrap_err();
    assert!(matches!(err, AppError::Remote { status: 502, .. }));
}

#[tokio::test]
async fn test_visiting_set_is_empty_after_failed_display() {
    let (backend, store) = setup();
    let zone_id = backend.insert("zones", json!({"name": "main"}));
    let renderer_id = backend.insert("renderers", json!({"name": "clock"}));
    backend.link("zones", zone_id, "renderers", renderer_id);

    let mut zone = Zone::read(&store, zone_id).await.unwrap();
    zone.load_sdi(&store).await.unwrap();
    zone.load_renderer(&store).await.unwrap();
    zone.load_calls(&store).await.unwrap();
    backend.fail_next(503, json!("down"));

    let mut visiting = Visiting::new();
    let err = zone
        .display_with(&store, &mut visiting, false)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Remote { status: 503, .. }));
    assert!(visiting.is_empty());
    assert!(!visiting.contains("zones", zone_id));
}

#[tokio::test]
async fn test_visiting_set_is_empty_after_display() {
    let (backend, store) = setup();
    let timeline_id = backend.insert("timelines", json!({"name": "week"}));
    let sdi_id = backend.insert("sdis", json!({"name": "lobby"}));
    backend.link("timelines", timeline_id, "sdis", sdi_id);

    let mut timeline = Timeline::read(&store, timeline_id).await.unwrap();
    let mut visiting = Visiting::new();
    let form = timeline
        .display_with(&store, &mut visiting, false)
        .await
        .unwrap();

    assert!(visiting.is_empty());
    assert_eq!(form["sdi"]["timeline"], json!(timeline_id));
}
