//! Axum-based RPC server.

use std::sync::Arc;

use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use visarun_node::{BotPoller, GameService, WEBHOOK_PATH};

use crate::error::RpcError;
use crate::handlers::{self, INIT_DATA_HEADER};

/// The full `/api` router with CORS and request tracing.
pub fn build_router(service: Arc<GameService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(INIT_DATA_HEADER),
        ]);

    let api = Router::new()
        .route("/auth/verify", post(handlers::auth_verify))
        .route("/city/open", post(handlers::city_open))
        .route("/task/complete", post(handlers::task_complete))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(service);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// The bot's webhook route, served outside `/api` and without CORS.
pub fn webhook_router(bot: Arc<BotPoller>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(handlers::bot_webhook))
        .with_state(bot)
        .layer(TraceLayer::new_for_http())
}

pub struct RpcServer {
    pub addr: String,
    service: Arc<GameService>,
    webhook: Option<Arc<BotPoller>>,
}

impl RpcServer {
    pub fn new(addr: impl Into<String>, service: Arc<GameService>) -> Self {
        Self {
            addr: addr.into(),
            service,
            webhook: None,
        }
    }

    /// Also accept Telegram updates on the webhook path.
    pub fn with_webhook(mut self, bot: Arc<BotPoller>) -> Self {
        self.webhook = Some(bot);
        self
    }

    pub fn router(&self) -> Router {
        let router = build_router(Arc::clone(&self.service));
        match &self.webhook {
            Some(bot) => router.merge(webhook_router(Arc::clone(bot))),
            None => router,
        }
    }

    /// Bind `addr` and serve until `shutdown` fires.
    pub async fn start(&self, shutdown: broadcast::Receiver<()>) -> Result<(), RpcError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {}: {e}", self.addr)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener. In-flight requests finish before
    /// this returns.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), RpcError> {
        let local = listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))?;
        tracing::info!(addr = %local, "HTTP API listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;

        tracing::info!("HTTP API stopped");
        Ok(())
    }
}
