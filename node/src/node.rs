//! The node struct: builds every subsystem from a [`NodeConfig`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use visarun_crypto::InitDataVerifier;
use visarun_engine::{RewardEngine, ThreadRandom};
use visarun_store::MemoryUserStore;
use visarun_telegram::{BotClient, ChannelSubscriptionCheck};

use crate::bot::BotPoller;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::service::GameService;
use crate::shutdown::ShutdownController;

pub struct VisaRunNode {
    config: NodeConfig,
    client: Arc<BotClient>,
    service: Arc<GameService>,
    shutdown: ShutdownController,
}

impl VisaRunNode {
    /// Validate `config` and wire the store, verifier, engine and bot client.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;

        let catalog = Arc::new(config.catalog.clone());
        let store = Arc::new(MemoryUserStore::new(Arc::clone(&catalog)));
        let client = Arc::new(BotClient::new(&config.bot_token)?);

        let check = ChannelSubscriptionCheck::new(Arc::clone(&client), config.channel_id.clone());
        if !check.is_configured() {
            tracing::warn!("channel_id is not set, checked tasks will answer check_unavailable");
        }

        let engine = RewardEngine::new(catalog, Arc::new(ThreadRandom))
            .with_check_timeout(Duration::from_secs(config.check_timeout_secs));
        let verifier =
            InitDataVerifier::new(&config.bot_token).with_max_age(config.auth_max_age_secs);
        let service = Arc::new(GameService::new(store, verifier, engine, Arc::new(check)));

        tracing::info!(
            tasks = config.catalog.tasks.len(),
            cities = config.catalog.cities.len(),
            auth_max_age_secs = config.auth_max_age_secs,
            "node initialised"
        );

        Ok(Self {
            config,
            client,
            service,
            shutdown: ShutdownController::new(),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn service(&self) -> Arc<GameService> {
        Arc::clone(&self.service)
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// The configured bot loop, or `None` when the bot is disabled.
    pub fn bot_poller(&self) -> Option<BotPoller> {
        self.config.enable_bot.then(|| {
            BotPoller::new(
                Arc::clone(&self.client),
                Arc::clone(&self.service),
                &self.config.webapp_url,
                self.config.bot_username.clone(),
            )
            .with_poll_timeout(Duration::from_secs(self.config.poll_timeout_secs))
        })
    }

    /// The bot that serves `POST /bot`, when webhook delivery is on.
    pub fn webhook_bot(&self) -> Option<Arc<BotPoller>> {
        self.config.webhook_url()?;
        self.bot_poller().map(Arc::new)
    }

    /// Register the webhook with Telegram. Returns the URL, or `None` when
    /// the bot is disabled or long-polls.
    pub async fn register_webhook(&self) -> Result<Option<String>, NodeError> {
        let (Some(bot), Some(url)) = (self.bot_poller(), self.config.webhook_url()) else {
            return Ok(None);
        };
        bot.register_webhook(&url).await?;
        Ok(Some(url))
    }

    /// Spawn the long-polling loop; it stops when the node shuts down.
    /// Nothing is spawned in webhook mode.
    pub fn start_bot(&self) -> Option<JoinHandle<()>> {
        if self.shutdown.is_shutting_down() || self.config.webhook_url().is_some() {
            return None;
        }
        let poller = self.bot_poller()?;
        let shutdown = self.shutdown.subscribe();
        Some(tokio::spawn(async move { poller.run(shutdown).await }))
    }
}
