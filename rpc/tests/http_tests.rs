//! Router-level tests driving the axum app with `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use visarun_crypto::{sign_init_data, InitDataVerifier};
use visarun_engine::RewardEngine;
use visarun_node::{BotPoller, GameService};
use visarun_nullables::{NullCheck, NullRandom};
use visarun_rpc::{build_router, RpcServer, INIT_DATA_HEADER};
use visarun_store::MemoryUserStore;
use visarun_telegram::BotClient;
use visarun_types::{Catalog, Timestamp};

const TOKEN: &str = "987654:http-token";

fn service_with(check: NullCheck) -> Arc<GameService> {
    let catalog = Arc::new(Catalog::default());
    let store = Arc::new(MemoryUserStore::new(Arc::clone(&catalog)));
    let engine = RewardEngine::new(catalog, Arc::new(NullRandom::constant(0)));
    Arc::new(GameService::new(
        store,
        InitDataVerifier::new(TOKEN).with_max_age(86_400),
        engine,
        Arc::new(check),
    ))
}

fn app() -> Router {
    build_router(service_with(NullCheck::passing()))
}

fn init_data(user_id: i64) -> String {
    let user = format!(r#"{{"id":{user_id},"first_name":"Http"}}"#);
    let auth_date = Timestamp::now().as_secs().to_string();
    sign_init_data(TOKEN, &[("user", &user), ("auth_date", &auth_date)])
}

fn post(uri: &str, init: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(init) = init {
        builder = builder.header(INIT_DATA_HEADER, init);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_needs_no_auth() {
    let request = Request::get("/api/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body["timestamp"].as_u64().unwrap() > 1_600_000_000_000);
}

#[tokio::test]
async fn verify_without_header_is_unauthorized() {
    let (status, body) = send(&app(), post("/api/auth/verify", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "missing_init_data");
}

#[tokio::test]
async fn verify_with_bad_signature_is_unauthorized() {
    let forged = init_data(1).replace("hash=", "hash=0");
    let (status, body) = send(&app(), post("/api/auth/verify", Some(&forged), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_signature");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn verify_returns_fresh_state() {
    let raw = init_data(4242);
    let (status, body) = send(&app(), post("/api/auth/verify", Some(&raw), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let state = &body["state"];
    assert_eq!(state["userId"], 4242);
    assert_eq!(state["keys"], 0);
    assert_eq!(state["cities"].as_array().unwrap().len(), 9);
    assert_eq!(state["cities"][0], json!({"name": "Джохор", "opened": false}));
    assert_eq!(state["tasks"][0]["id"], "subscribe");
    assert_eq!(state["tasks"][0]["done"], false);
}

#[tokio::test]
async fn game_flow_over_http() {
    let app = app();
    let raw = init_data(7);

    let (status, body) = send(&app, post("/api/city/open", Some(&raw), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_keys");

    let request = post(
        "/api/task/complete",
        Some(&raw),
        Some(json!({"taskId": "subscribe", "payload": {"source": "channel"}})),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["keys"], 1);
    assert_eq!(body["state"]["tickets"], 1);
    assert_eq!(body["state"]["coins"], 5);
    assert_eq!(body["state"]["tasks"][0]["meta"]["source"], "channel");

    let (status, body) = send(&app, post("/api/city/open", Some(&raw), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["keys"], 0);
    assert_eq!(body["state"]["tickets"], 2);
    assert_eq!(body["state"]["cities"][0]["opened"], true);
}

#[tokio::test]
async fn unknown_task_is_bad_request() {
    let raw = init_data(8);
    let request = post(
        "/api/task/complete",
        Some(&raw),
        Some(json!({"taskId": "fly_to_mars"})),
    );
    let (status, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_task");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let raw = init_data(8);
    let request = post("/api/task/complete", Some(&raw), Some(json!({"task": 1})));
    let (status, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn body_is_not_read_before_auth() {
    let request = post("/api/task/complete", None, Some(json!({"task": 1})));
    let (status, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_init_data");
}

#[tokio::test]
async fn forged_init_data_is_rejected_before_body() {
    let forged = "user=%7B%22id%22%3A1%7D&hash=00";
    for body in [json!({"task": 1}), json!({"taskId": " "})] {
        let request = post("/api/task/complete", Some(forged), Some(body));
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_signature");
    }
}

#[tokio::test]
async fn valid_init_data_with_bad_body_is_bad_request() {
    let raw = init_data(12);
    let request = post("/api/task/complete", Some(&raw), Some(json!({"taskId": " "})));
    let (status, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn unconfigured_check_is_server_error() {
    let app = build_router(service_with(NullCheck::unconfigured()));
    let raw = init_data(9);
    let request = post(
        "/api/task/complete",
        Some(&raw),
        Some(json!({"taskId": "subscribe"})),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "check_unavailable");
}

#[tokio::test]
async fn failed_check_is_bad_request() {
    let app = build_router(service_with(NullCheck::failing()));
    let raw = init_data(10);
    let request = post(
        "/api/task/complete",
        Some(&raw),
        Some(json!({"taskId": "subscribe"})),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "check_failed");
}

#[tokio::test]
async fn cors_preflight_allows_init_data_header() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/auth/verify")
        .header("origin", "https://web.telegram.org")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", INIT_DATA_HEADER)
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let allowed = headers["access-control-allow-headers"].to_str().unwrap();
    assert!(allowed.contains(INIT_DATA_HEADER));
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = app();
    let raw = init_data(11);
    let request = post(
        "/api/task/complete",
        Some(&raw),
        Some(json!({"taskId": "pin_bot"})),
    );
    send(&app, request).await;

    let response = app
        .clone()
        .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("visarun_tasks_completed_total 1"));
    assert!(text.contains("visarun_users 1"));
}

#[tokio::test]
async fn server_stops_on_shutdown() {
    let server = RpcServer::new("127.0.0.1:0", service_with(NullCheck::passing()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (tx, rx) = tokio::sync::broadcast::channel(1);
    let handle = tokio::spawn(async move { server.serve(listener, rx).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server must stop")
        .unwrap();
    assert!(result.is_ok());
}

fn webhook_server(service: Arc<GameService>) -> Router {
    // Nothing listens on port 9, so replies to Telegram fail fast.
    let client = Arc::new(BotClient::with_api_base(TOKEN, "http://127.0.0.1:9").unwrap());
    let bot = BotPoller::new(client, Arc::clone(&service), "https://app.example", Some("visarun_bot".into()));
    RpcServer::new("127.0.0.1:0", service)
        .with_webhook(Arc::new(bot))
        .router()
}

fn update(text: &str) -> Value {
    json!({
        "update_id": 7,
        "message": {"message_id": 1, "chat": {"id": 500}, "from": {"id": 500}, "text": text}
    })
}

#[tokio::test]
async fn webhook_accepts_non_command_update() {
    let app = webhook_server(service_with(NullCheck::passing()));
    let (status, _) = send(&app, post("/bot", None, Some(update("hello")))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn webhook_rejects_malformed_update() {
    let app = webhook_server(service_with(NullCheck::passing()));
    let (status, body) = send(&app, post("/bot", None, Some(json!({"message": 1})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn webhook_runs_referral_policy_and_reports_send_failure() {
    let service = service_with(NullCheck::passing());
    let app = webhook_server(Arc::clone(&service));
    let (status, body) = send(&app, post("/bot", None, Some(update("/start ref_77")))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal");
    assert_eq!(service.metrics().referrals_credited.get(), 1);
}

#[tokio::test]
async fn webhook_route_is_absent_without_bot() {
    let (status, _) = send(&app(), post("/bot", None, Some(update("hello")))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
