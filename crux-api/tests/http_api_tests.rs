//! End-to-end HTTP tests against an in-memory store.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use crux_api::{create_api_router, ApiConfig, AppState};
use crux_core::{ClimberId, EngineConfig, RetryPolicy, RouteId};
use crux_storage::{MemoryStore, RecordStore, RouteUpsert};
use crux_test_utils::{assertions, fixtures};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn engine_config() -> EngineConfig {
    EngineConfig {
        max_concurrency: 2,
        retry: RetryPolicy::immediate(3),
        run_on_startup: false,
        ..EngineConfig::default()
    }
}

fn app(store: Arc<MemoryStore>) -> (Router, AppState) {
    let state = AppState::new(store, engine_config());
    (create_api_router(state.clone(), &ApiConfig::development()), state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn health_probes_respond() {
    let (app, _) = app(Arc::new(MemoryStore::new()));

    let (status, body) = send(&app, Method::GET, "/health/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("pong".to_string()));

    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["store"]["status"], "healthy");
    assert!(body.get("message").is_none());

    let (status, _) = send(&app, Method::GET, "/health/live", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_cycle_from_logs_to_leaderboard() {
    let (app, _) = app(Arc::new(MemoryStore::new()));

    let (status, _) = send(&app, Method::PUT, "/routes/a", Some(json!({ "name": "Arete", "points": 60.0 }))).await;
    assert_eq!(status, StatusCode::OK);
    send(&app, Method::PUT, "/routes/b", Some(json!({ "name": "Bulge", "points": 40.0 }))).await;

    for climber in ["c1", "c2", "c3"] {
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/climbers/{}", climber),
            Some(json!({ "name": climber.to_uppercase() })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    for (route, climber) in [("a", "c1"), ("a", "c2"), ("a", "c3"), ("b", "c1")] {
        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/routes/{}/logs/{}", route, climber),
            Some(json!({ "style": "redpoint" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["change"], "created");
    }

    let (_, recount) = send(&app, Method::POST, "/routes/a/recount", None).await;
    assert_eq!(recount["count"], 3);
    send(&app, Method::POST, "/routes/b/recount", None).await;

    let (status, report) = send(&app, Method::POST, "/ranking/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["ranked"], 3);
    assert_eq!(report["gaps"], json!([]));

    let (status, board) = send(&app, Method::GET, "/ranking", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["id"], "c1");
    assert_eq!(board[0]["position"], 0);
    assert_eq!(board[0]["routes_climbed"], 2);
    assertions::assert_points_close(board[0]["points"].as_f64().unwrap(), 60.0);
    assert_eq!(board[0]["name"], "C1");
    assertions::assert_points_close(board[1]["points"].as_f64().unwrap(), 20.0);
}

#[tokio::test]
async fn overwriting_a_log_reports_update() {
    let (app, _) = app(fixtures::store(fixtures::two_route_board()));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/routes/b/logs/c4",
        Some(json!({ "style": "flash", "lock_status": "locked" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["change"], "updated");
}

#[tokio::test]
async fn log_on_missing_route_is_404() {
    let (app, _) = app(Arc::new(MemoryStore::new()));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/routes/ghost/logs/c1",
        Some(json!({ "style": "flash" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ROUTE_NOT_FOUND");
}

#[tokio::test]
async fn deleting_a_missing_log_is_404() {
    let (app, _) = app(fixtures::store(fixtures::two_route_board()));

    let (status, _) = send(&app, Method::DELETE, "/routes/a/logs/c1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::DELETE, "/routes/a/logs/c1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "LOG_NOT_FOUND");
}

#[tokio::test]
async fn recount_of_missing_route_is_404() {
    let (app, _) = app(Arc::new(MemoryStore::new()));
    let (status, _) = send(&app, Method::POST, "/routes/nowhere/recount", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn live_ranking_matches_run_and_writes_nothing() {
    let store = fixtures::store(fixtures::tie_break_board());
    let (app, state) = app(store.clone());
    state.counter.recount_all().await.unwrap();

    let (status, live) = send(&app, Method::GET, "/ranking/live", None).await;
    assert_eq!(status, StatusCode::OK);
    let order: Vec<_> = live
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["climber_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(order, vec!["y", "x", "z", "w"]);
    assert!(store.user_list().await.unwrap().iter().all(|u| u.ranked_at.is_none()));

    let (_, report) = send(&app, Method::POST, "/ranking/run", None).await;
    assert_eq!(report["standings"], live);
}

#[tokio::test]
async fn live_ranking_with_malformed_route_is_422() {
    let store = fixtures::store(fixtures::two_route_board());
    store
        .route_upsert(RouteUpsert {
            route_id: Some(RouteId::new("a")),
            name: "A".to_string(),
            points: f64::INFINITY,
        })
        .await
        .unwrap();
    let (app, _) = app(store);

    let (status, body) = send(&app, Method::GET, "/ranking/live", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "MALFORMED_RECORD");
}

#[tokio::test]
async fn live_ranking_with_failed_fetch_is_503() {
    let store = fixtures::store(fixtures::two_route_board());
    store.fail_log_queries_for(ClimberId::new("c3"));
    let (app, _) = app(store);

    let (status, body) = send(&app, Method::GET, "/ranking/live", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn failed_commit_returns_500_and_keeps_ranking() {
    let store = fixtures::store(fixtures::two_route_board());
    store.inject_commit_failures(1);
    let (app, _) = app(store.clone());

    let (status, body) = send(&app, Method::POST, "/ranking/run", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "STORAGE_ERROR");
    assert!(store.user_list().await.unwrap().iter().all(|u| u.ranked_at.is_none()));
}

#[tokio::test]
async fn route_overlay_fills_defaults() {
    let (app, _) = app(fixtures::store(fixtures::two_route_board()));

    let (status, overlay) = send(&app, Method::GET, "/climbers/c4/routes", None).await;
    assert_eq!(status, StatusCode::OK);
    let overlay = overlay.as_array().unwrap();
    assert_eq!(overlay.len(), 2);

    let a = overlay.iter().find(|r| r["route_id"] == "a").unwrap();
    assert_eq!(a["style"], "none");
    assert_eq!(a["lock_status"], "editable");
    assert_eq!(a["points"], 60.0);
}

#[tokio::test]
async fn renaming_a_climber_keeps_their_standing() {
    let store = fixtures::store(fixtures::two_route_board());
    let (app, state) = app(store);
    state.counter.recount_all().await.unwrap();
    send(&app, Method::POST, "/ranking/run", None).await;

    let (status, user) = send(&app, Method::PUT, "/climbers/c1", Some(json!({ "name": "Ada" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["name"], "Ada");
    assert_eq!(user["climbed"], 2);
    assert_eq!(user["position"], 0);

    let (status, body) = send(&app, Method::PUT, "/climbers/c1", Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_FIELD");
}

#[tokio::test]
async fn registered_climber_waits_in_the_last_slot() {
    let store = fixtures::store(fixtures::two_route_board());
    let (app, state) = app(store);
    state.counter.recount_all().await.unwrap();
    send(&app, Method::POST, "/ranking/run", None).await;

    let (status, user) = send(&app, Method::PUT, "/climbers/c5", Some(json!({ "name": "Newcomer" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["position"], 4);

    let (_, board) = send(&app, Method::GET, "/ranking", None).await;
    let positions: Vec<u64> = board
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["position"].as_u64().unwrap())
        .collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    assert_eq!(board[4]["id"], "c5");
}

#[tokio::test]
async fn unknown_climber_is_404() {
    let (app, _) = app(Arc::new(MemoryStore::new()));
    let (status, body) = send(&app, Method::GET, "/climbers/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CLIMBER_NOT_FOUND");
}

#[tokio::test]
async fn created_route_gets_an_id_and_zero_count() {
    let (app, _) = app(Arc::new(MemoryStore::new()));

    let (status, route) = send(&app, Method::POST, "/routes", Some(json!({ "name": "Roof", "points": 80 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(route["completion_count"], 0);
    let id = route["route_id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let (status, fetched) = send(&app, Method::GET, &format!("/routes/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, route);
}

#[tokio::test]
async fn stats_and_metrics_reflect_activity() {
    let (app, state) = app(fixtures::store(fixtures::two_route_board()));
    state.counter.recount_all().await.unwrap();
    send(&app, Method::POST, "/ranking/run", None).await;

    let (status, stats) = send(&app, Method::GET, "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["store"]["route_count"], 2);
    assert_eq!(stats["store"]["log_count"], 5);
    assert_eq!(stats["engine"]["ranking_runs_committed"], 1);

    let (status, metrics) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = metrics.as_str().unwrap();
    assert!(text.contains("crux_ranking_runs"));
    assert!(text.contains("crux_http_requests_total"));
}

#[tokio::test]
async fn unknown_path_is_json_404() {
    let (app, _) = app(Arc::new(MemoryStore::new()));
    let (status, body) = send(&app, Method::GET, "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");
}
