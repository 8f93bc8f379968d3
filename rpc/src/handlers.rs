//! RPC request handlers.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use visarun_node::{BotPoller, GameService};
use visarun_telegram::Update;
use visarun_types::{TaskMeta, UserState};

use crate::error::RpcError;

/// Header carrying the WebApp's raw init data.
pub const INIT_DATA_HEADER: &str = "x-telegram-initdata";

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

// ── Request / response bodies ────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub ok: bool,
    pub state: UserState,
}

impl StateResponse {
    fn new(state: UserState) -> Json<Self> {
        Json(Self { ok: true, state })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompleteRequest {
    pub task_id: String,
    #[serde(default)]
    pub payload: Option<TaskMeta>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Unix milliseconds.
    pub timestamp: u64,
}

// ── Handlers ─────────────────────────────────────────────────────────────

fn init_data(headers: &HeaderMap) -> Result<&str, RpcError> {
    headers
        .get(INIT_DATA_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(RpcError::MissingInitData)
}

pub async fn auth_verify(
    State(service): State<Arc<GameService>>,
    headers: HeaderMap,
) -> Result<Json<StateResponse>, RpcError> {
    let state = service.verify(init_data(&headers)?).await?;
    Ok(StateResponse::new(state))
}

pub async fn city_open(
    State(service): State<Arc<GameService>>,
    headers: HeaderMap,
) -> Result<Json<StateResponse>, RpcError> {
    let state = service.open_city(init_data(&headers)?).await?;
    Ok(StateResponse::new(state))
}

/// The init data is verified before the body is looked at, so a caller with
/// missing or forged init data gets a 401 whatever the body holds.
pub async fn task_complete(
    State(service): State<Arc<GameService>>,
    headers: HeaderMap,
    body: Result<Json<TaskCompleteRequest>, JsonRejection>,
) -> Result<Json<StateResponse>, RpcError> {
    let user = service.authenticate(init_data(&headers)?)?.user_id();
    let Json(request) = body.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    if request.task_id.trim().is_empty() {
        return Err(RpcError::InvalidRequest("taskId is required".into()));
    }
    let state = service
        .complete_task_for(user, &request.task_id, request.payload.unwrap_or_default())
        .await?;
    Ok(StateResponse::new(state))
}

/// Telegram webhook delivery. A failed update answers 500 so Telegram
/// retries it.
pub async fn bot_webhook(
    State(bot): State<Arc<BotPoller>>,
    body: Result<Json<Update>, JsonRejection>,
) -> Result<StatusCode, RpcError> {
    let Json(update) = body.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    bot.dispatch(&update)
        .await
        .map_err(|e| RpcError::Server(format!("update {}: {e}", update.update_id)))?;
    Ok(StatusCode::OK)
}

pub async fn health() -> Json<HealthResponse> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    Json(HealthResponse {
        ok: true,
        timestamp,
    })
}

pub async fn metrics(
    State(service): State<Arc<GameService>>,
) -> Result<impl IntoResponse, RpcError> {
    let body = service
        .metrics()
        .encode()
        .map_err(|e| RpcError::Metrics(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body))
}
