//! VisaRun game node. Ties the verifier, store and reward engine together.
//!
//! The node:
//! - Authenticates WebApp requests and serializes them per user
//! - Applies task completions and city reveals through the reward engine
//! - Runs the referral policy for bot `/start` commands
//! - Answers bot commands, by long polling or through a webhook
//! - Owns configuration, logging, metrics and shutdown

pub mod bot;
pub mod config;
pub mod error;
pub mod locks;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod service;
pub mod shutdown;
pub mod tracing_spans;

pub use bot::{BotPoller, BotReply};
pub use config::{NodeConfig, WEBHOOK_PATH};
pub use error::NodeError;
pub use locks::{UserGuard, UserLocks};
pub use logging::{init_logging, LogFormat};
pub use metrics::GameMetrics;
pub use node::VisaRunNode;
pub use service::{GameService, ReferralOutcome, ServiceError};
pub use shutdown::ShutdownController;
