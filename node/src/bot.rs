//! Bot command handling: `/start` (with referral payload) and `/link`.
//!
//! Updates arrive either from the long-polling loop in [`BotPoller::run`] or
//! from the webhook route, which hands each one to [`BotPoller::dispatch`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, OnceCell};
use tracing::Instrument;

use visarun_telegram::{
    referral_link, BotClient, BotCommand, InlineKeyboardMarkup, TelegramError, Update,
};
use visarun_types::UserId;

use crate::service::{GameService, ReferralOutcome};
use crate::tracing_spans::bot_update_span;
use crate::NodeError;

pub const WELCOME_TEXT: &str =
    "Добро пожаловать в ВизаРан Бинго! Откройте веб‑приложение, чтобы начать игру.";
pub const OPEN_APP_BUTTON: &str = "Открыть Веб‑приложение";

/// Pause before polling again after a failed `getUpdates`.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// A message the bot sends back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub markup: Option<InlineKeyboardMarkup>,
}

pub struct BotPoller {
    client: Arc<BotClient>,
    service: Arc<GameService>,
    webapp_url: String,
    bot_username: OnceCell<String>,
    poll_timeout: Duration,
    retry_delay: Duration,
}

impl BotPoller {
    /// `bot_username` is looked up once via `getMe` when not given.
    pub fn new(
        client: Arc<BotClient>,
        service: Arc<GameService>,
        webapp_url: &str,
        bot_username: Option<String>,
    ) -> Self {
        let bot_username = bot_username.filter(|u| !u.trim().is_empty());
        Self {
            client,
            service,
            webapp_url: webapp_url.to_string(),
            bot_username: OnceCell::new_with(bot_username),
            poll_timeout: Duration::from_secs(30),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Poll until `shutdown` fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(poll_timeout_secs = self.poll_timeout.as_secs(), "bot started with long polling");
        let mut offset = 0i64;

        loop {
            let polled = tokio::select! {
                _ = shutdown.recv() => break,
                polled = self.client.get_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Err(e) = self.dispatch(&update).await {
                            tracing::warn!(update_id = update.update_id, error = %e, "failed to handle update");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, retry_in_ms = self.retry_delay.as_millis() as u64, "getUpdates failed");
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        tracing::info!("bot poller stopped");
    }

    /// Handle one update inside its own span.
    pub async fn dispatch(&self, update: &Update) -> Result<(), NodeError> {
        self.handle_update(update)
            .instrument(bot_update_span(update.update_id))
            .await
    }

    /// Point Telegram at `url` for update delivery.
    pub async fn register_webhook(&self, url: &str) -> Result<(), NodeError> {
        if !self.client.set_webhook(url).await? {
            return Err(TelegramError::InvalidResponse("setWebhook returned false".into()).into());
        }
        tracing::info!(url, "bot listening via webhook");
        Ok(())
    }

    /// React to one update. Anything that is not a known command from a
    /// user is ignored.
    pub async fn handle_update(&self, update: &Update) -> Result<(), NodeError> {
        let Some(message) = &update.message else {
            return Ok(());
        };
        let (Some(from), Some(text)) = (&message.from, &message.text) else {
            return Ok(());
        };
        let Some(command) = BotCommand::parse(text) else {
            return Ok(());
        };

        let reply = self.reply_for(UserId::new(from.id), &command).await?;
        self.client
            .send_message(message.chat.id, &reply.text, reply.markup.as_ref())
            .await?;
        Ok(())
    }

    /// Run the side effects of `command` for `user` and build the answer.
    pub async fn reply_for(
        &self,
        user: UserId,
        command: &BotCommand,
    ) -> Result<BotReply, NodeError> {
        match command {
            BotCommand::Start { payload } => {
                match self.service.register_start(user, payload.as_deref()).await {
                    Ok(ReferralOutcome::Credited { inviter }) => {
                        tracing::debug!(%user, %inviter, "start with referral");
                    }
                    Ok(outcome) => tracing::debug!(%user, ?outcome, "start"),
                    Err(e) => tracing::warn!(%user, error = %e, "referral policy failed"),
                }
                Ok(BotReply {
                    text: WELCOME_TEXT.to_string(),
                    markup: Some(InlineKeyboardMarkup::web_app_button(
                        OPEN_APP_BUTTON,
                        &self.webapp_url,
                    )),
                })
            }
            BotCommand::Link => {
                let username = self.bot_username().await?;
                Ok(BotReply {
                    text: format!("Ваша реферальная ссылка:\n{}", referral_link(username, user)),
                    markup: None,
                })
            }
        }
    }

    async fn bot_username(&self) -> Result<&str, TelegramError> {
        let username = self
            .bot_username
            .get_or_try_init(|| async {
                let me = self.client.get_me().await?;
                me.username.ok_or_else(|| {
                    TelegramError::InvalidResponse("getMe returned no username".into())
                })
            })
            .await?;
        Ok(username.as_str())
    }
}
