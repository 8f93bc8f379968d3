//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use visarun_types::Catalog;

use crate::logging::LogFormat;
use crate::NodeError;

/// Path the bot's webhook is served on.
pub const WEBHOOK_PATH: &str = "/bot";

/// Configuration for a VisaRun node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Interface the HTTP API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// HTTP API port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bot token issued by @BotFather. Also the root of the init-data secret.
    #[serde(default)]
    pub bot_token: String,

    /// Bot username for referral links; looked up via `getMe` when absent.
    #[serde(default)]
    pub bot_username: Option<String>,

    /// Whether to run the bot at all (long polling or webhook).
    #[serde(default = "default_true")]
    pub enable_bot: bool,

    /// Receive updates on `POST /bot` instead of long polling.
    #[serde(default)]
    pub use_webhook: bool,

    /// Public origin Telegram delivers webhook updates to, e.g.
    /// `https://game.example`. Required when `use_webhook` is set.
    #[serde(default)]
    pub webhook_domain: Option<String>,

    /// URL the bot's "open web app" button points at.
    #[serde(default = "default_webapp_url")]
    pub webapp_url: String,

    /// Channel whose subscribers pass the `subscribe` task check
    /// (numeric id or `@username`).
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Upper bound on one external check, in seconds.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Maximum init-data age in seconds; 0 disables the freshness check.
    #[serde(default = "default_auth_max_age_secs")]
    pub auth_max_age_secs: u64,

    /// Long-poll window for `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Task and city definitions.
    #[serde(default)]
    pub catalog: Catalog,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_webapp_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_check_timeout_secs() -> u64 {
    5
}

fn default_auth_max_age_secs() -> u64 {
    86_400
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.bot_token.trim().is_empty() {
            return Err(NodeError::Config(
                "bot_token is required (set BOT_TOKEN or bot_token in the config file)".into(),
            ));
        }
        if self.check_timeout_secs == 0 {
            return Err(NodeError::Config("check_timeout_secs must be positive".into()));
        }
        if self.use_webhook && self.webhook_url().is_none() {
            return Err(NodeError::Config(
                "webhook_domain is required when use_webhook is set".into(),
            ));
        }
        self.parsed_log_format()?;
        self.catalog.validate()?;
        Ok(())
    }

    pub fn parsed_log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    /// Where Telegram should push updates, when webhook mode is on and a
    /// domain is configured.
    pub fn webhook_url(&self) -> Option<String> {
        if !self.use_webhook {
            return None;
        }
        let domain = self.webhook_domain.as_deref()?.trim().trim_end_matches('/');
        (!domain.is_empty()).then(|| format!("{domain}{WEBHOOK_PATH}"))
    }

    /// `listen_addr:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            bot_token: String::new(),
            bot_username: None,
            enable_bot: default_true(),
            use_webhook: false,
            webhook_domain: None,
            webapp_url: default_webapp_url(),
            channel_id: None,
            check_timeout_secs: default_check_timeout_secs(),
            auth_max_age_secs: default_auth_max_age_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            catalog: Catalog::default(),
        }
    }
}
