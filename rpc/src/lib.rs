//! HTTP API for the VisaRun web app.
//!
//! Provides endpoints under `/api` for:
//! - Init-data verification and state fetch
//! - City reveal
//! - Task completion
//! - Health and Prometheus metrics
//!
//! and, in webhook mode, the bot's update endpoint at `/bot`.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use handlers::INIT_DATA_HEADER;
pub use server::{build_router, webhook_router, RpcServer};
