//! The HTTP query surface: wires every search/get/select-field route
//! variant (plain, paged, sorted, sorted-with-total) onto
//! [`crate::query_surface::QuerySurface`].
//!
//! Grounded in `original_source/lib/api.go`'s route registration, using a
//! `State<AppState<S>>` extractor and handlers returning
//! `Result<Json<T>, StatusCode>`.

use crate::auth::{AuthConfig, CallerIdentity};
use crate::error::ViewError;
use crate::query_surface::{QueryOptions, QueryOutcome, QuerySurface};
use crate::store::DocumentStore;
use axum::extract::{FromRef, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState<S: DocumentStore> {
    pub query_surface: Arc<QuerySurface<S>>,
    pub auth: Arc<AuthConfig>,
}

impl<S: DocumentStore> FromRef<AppState<S>> for Arc<AuthConfig> {
    fn from_ref(state: &AppState<S>) -> Self {
        state.auth.clone()
    }
}

fn status_for(error: &ViewError) -> StatusCode {
    match error {
        ViewError::UnknownTarget(_)
        | ViewError::UnknownEndpoint { .. }
        | ViewError::UnknownActionType(_)
        | ViewError::UnknownScale(_)
        | ViewError::UnknownWhereOperation(_)
        | ViewError::UnknownSelectionOperation(_)
        | ViewError::Store(_)
        | ViewError::Transport(_)
        | ViewError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ViewError::InvalidPath(_) | ViewError::InvalidEvent { .. } | ViewError::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        ViewError::VersionConflict { .. } => StatusCode::CONFLICT,
        ViewError::Unauthorized => StatusCode::UNAUTHORIZED,
    }
}

fn respond(outcome: QueryOutcome) -> Json<JsonValue> {
    match outcome.total {
        Some(total) => Json(serde_json::json!({ "total": total, "result": outcome.result })),
        None => Json(serde_json::json!(outcome.result)),
    }
}

fn asc_from(direction: &str) -> bool {
    direction != "desc"
}

pub fn create_router<S: DocumentStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        // search
        .route("/search/:target/:searchtext/:endpoint", get(search_plain::<S>))
        .route("/search/:target/:searchtext/:endpoint/:limit/:offset", get(search_paged::<S>))
        .route("/search/:target/:searchtext/:endpoint/:limit/:offset/:order_by/:direction", get(search_sorted::<S>))
        .route(
            "/search/:target/:searchtext/:endpoint/:limit/:offset/:order_by/:direction/withtotal",
            get(search_sorted_total::<S>),
        )
        // get
        .route("/get/:target/:endpoint", get(get_plain::<S>))
        .route("/get/:target/:endpoint/:limit/:offset", get(get_paged::<S>))
        .route("/get/:target/:endpoint/:limit/:offset/:order_by/:direction", get(get_sorted::<S>))
        .route(
            "/get/:target/:endpoint/:limit/:offset/:order_by/:direction/withtotal",
            get(get_sorted_total::<S>),
        )
        // select/field (GET, literal value in the path)
        .route("/select/field/:target/:endpoint/:field/:value", get(select_single_plain::<S>))
        .route(
            "/select/field/:target/:endpoint/:field/:value/:limit/:offset",
            get(select_single_paged::<S>),
        )
        .route(
            "/select/field/:target/:endpoint/:field/:value/:limit/:offset/:order_by/:direction",
            get(select_single_sorted::<S>),
        )
        // select/field (POST, JSON array body)
        .route("/select/field/:target/:endpoint/:field", post(select_multi_plain::<S>))
        .route(
            "/select/field/:target/:endpoint/:field/:limit/:offset",
            post(select_multi_paged::<S>),
        )
        .route(
            "/select/field/:target/:endpoint/:field/:limit/:offset/:order_by/:direction",
            post(select_multi_sorted::<S>),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn search_plain<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, searchtext, endpoint)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    state
        .query_surface
        .search(&target, &endpoint, &searchtext, &caller, &params, &QueryOptions::default())
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn search_paged<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, searchtext, endpoint, limit, offset)): Path<(String, String, String, usize, usize)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), ..Default::default() };
    state
        .query_surface
        .search(&target, &endpoint, &searchtext, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn search_sorted<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, searchtext, endpoint, limit, offset, order_by, direction)): Path<(String, String, String, usize, usize, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), sort: Some((order_by, asc_from(&direction))), with_total: false };
    state
        .query_surface
        .search(&target, &endpoint, &searchtext, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn search_sorted_total<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, searchtext, endpoint, limit, offset, order_by, direction)): Path<(String, String, String, usize, usize, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), sort: Some((order_by, asc_from(&direction))), with_total: true };
    state
        .query_surface
        .search(&target, &endpoint, &searchtext, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn get_plain<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    state
        .query_surface
        .get(&target, &endpoint, &caller, &params, &QueryOptions::default())
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn get_paged<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, limit, offset)): Path<(String, String, usize, usize)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), ..Default::default() };
    state
        .query_surface
        .get(&target, &endpoint, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn get_sorted<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, limit, offset, order_by, direction)): Path<(String, String, usize, usize, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), sort: Some((order_by, asc_from(&direction))), with_total: false };
    state
        .query_surface
        .get(&target, &endpoint, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn get_sorted_total<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, limit, offset, order_by, direction)): Path<(String, String, usize, usize, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), sort: Some((order_by, asc_from(&direction))), with_total: true };
    state
        .query_surface
        .get(&target, &endpoint, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

fn parse_field_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

async fn select_single_plain<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, field, value)): Path<(String, String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    state
        .query_surface
        .select_field_single(&target, &endpoint, &field, parse_field_value(&value), &caller, &params, &QueryOptions::default())
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn select_single_paged<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, field, value, limit, offset)): Path<(String, String, String, String, usize, usize)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), ..Default::default() };
    state
        .query_surface
        .select_field_single(&target, &endpoint, &field, parse_field_value(&value), &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn select_single_sorted<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, field, value, limit, offset, order_by, direction)): Path<(String, String, String, String, usize, usize, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), sort: Some((order_by, asc_from(&direction))), with_total: false };
    state
        .query_surface
        .select_field_single(&target, &endpoint, &field, parse_field_value(&value), &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn select_multi_plain<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, field)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
    Json(values): Json<Vec<JsonValue>>,
) -> Result<Json<JsonValue>, StatusCode> {
    state
        .query_surface
        .select_field_multi(&target, &endpoint, &field, values, &caller, &params, &QueryOptions::default())
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn select_multi_paged<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, field, limit, offset)): Path<(String, String, String, usize, usize)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
    Json(values): Json<Vec<JsonValue>>,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), ..Default::default() };
    state
        .query_surface
        .select_field_multi(&target, &endpoint, &field, values, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}

async fn select_multi_sorted<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path((target, endpoint, field, limit, offset, order_by, direction)): Path<(String, String, String, usize, usize, String, String)>,
    Query(params): Query<HashMap<String, String>>,
    caller: CallerIdentity,
    Json(values): Json<Vec<JsonValue>>,
) -> Result<Json<JsonValue>, StatusCode> {
    let opts = QueryOptions { limit: Some(limit), offset: Some(offset), sort: Some((order_by, asc_from(&direction))), with_total: false };
    state
        .query_surface
        .select_field_multi(&target, &endpoint, &field, values, &caller, &params, &opts)
        .await
        .map(respond)
        .map_err(|e| status_for(&e))
}
