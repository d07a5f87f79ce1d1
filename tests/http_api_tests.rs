//! Integration tests for the HTTP query surface, exercising the axum
//! router built by `reflux::http::create_router` without binding a real
//! socket (via `tower::ServiceExt::oneshot`).

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reflux::auth::AuthConfig;
use reflux::http::{create_router, AppState};
use reflux::projection::Projection;
use reflux::query_surface::{QueryConfig, QueryEndpoint, QuerySurface};
use reflux::selection::{ConditionConfig, Selection, SelectionOperation};
use reflux::store::InMemoryStore;
use reflux::target::Target;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

async fn seeded_state() -> AppState<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for (id, name, owner) in [("w1", "Widget One", "alice"), ("w2", "Widget Two", "bob")] {
        let mut t = Target::new_root("widgets", id);
        t.features.insert("name".to_string(), json!(name));
        t.features.insert("owner".to_string(), json!(owner));
        store.save(&t).await.unwrap();
    }

    let mut config = QueryConfig::new();
    config.insert(
        "widgets".to_string(),
        HashMap::from([
            ("all".to_string(), QueryEndpoint { selection: Selection::All { all: true }, projection: Projection(vec!["*".to_string()]) }),
            (
                "mine".to_string(),
                QueryEndpoint {
                    selection: Selection::Condition {
                        condition: ConditionConfig { feature: "owner".into(), operation: SelectionOperation::Eq, value: None, r#ref: Some("requested_owner".into()) },
                    },
                    projection: Projection(vec!["*".to_string()]),
                },
            ),
        ]),
    );

    AppState {
        query_surface: Arc::new(QuerySurface::new(store, config)),
        auth: Arc::new(AuthConfig { decoding_key: None, force_auth: false, force_user: None }),
    }
}

async fn body_json(response: axum::response::Response) -> JsonValue {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn get_all_returns_every_document() {
    let router = create_router(seeded_state().await);
    let response = router.oneshot(Request::builder().uri("/get/widgets/all").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn get_with_paging_limits_results() {
    let router = create_router(seeded_state().await);
    let response = router.oneshot(Request::builder().uri("/get/widgets/all/1/0").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn get_sorted_with_total_includes_total_count() {
    let router = create_router(seeded_state().await);
    let response = router
        .oneshot(Request::builder().uri("/get/widgets/all/10/0/name/asc/withtotal").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], json!(2));
}

#[tokio::test]
async fn select_field_single_matches_one_document() {
    let router = create_router(seeded_state().await);
    let response = router
        .oneshot(Request::builder().uri("/select/field/widgets/all/owner/alice").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["owner"], json!("alice"));
}

#[tokio::test]
async fn select_field_multi_accepts_json_array_body() {
    let router = create_router(seeded_state().await);
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/select/field/widgets/all/owner")
                .header("content-type", "application/json")
                .body(Body::from(json!(["alice", "bob"]).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn selection_with_ref_is_scoped_by_query_params() {
    let router = create_router(seeded_state().await);
    let response = router
        .oneshot(Request::builder().uri("/get/widgets/mine?requested_owner=alice").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["owner"], json!("alice"));
}

#[tokio::test]
async fn unknown_target_surfaces_server_error() {
    let router = create_router(seeded_state().await);
    let response = router.oneshot(Request::builder().uri("/get/nonexistent/all").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
