//! RPC error types and their JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use visarun_node::ServiceError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("missing x-telegram-initdata header")]
    MissingInitData,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::MissingInitData => StatusCode::UNAUTHORIZED,
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Service(e) => StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            RpcError::Metrics(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RpcError::MissingInitData => "missing_init_data",
            RpcError::InvalidRequest(_) => "invalid_request",
            RpcError::Service(e) => e.code(),
            RpcError::Metrics(_) | RpcError::Server(_) => "internal",
        }
    }
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(%status, code = self.code(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            ok: false,
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
