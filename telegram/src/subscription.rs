//! Channel subscription as an external task check.

use crate::BotClient;
use async_trait::async_trait;
use std::sync::Arc;
use visarun_engine::{CheckError, ExternalCheck};
use visarun_types::UserId;

/// Passes when the user is a member, administrator or creator of the
/// configured channel.
pub struct ChannelSubscriptionCheck {
    client: Arc<BotClient>,
    channel_id: Option<String>,
}

impl ChannelSubscriptionCheck {
    pub fn new(client: Arc<BotClient>, channel_id: Option<String>) -> Self {
        let channel_id = channel_id.filter(|c| !c.trim().is_empty());
        Self { client, channel_id }
    }

    pub fn is_configured(&self) -> bool {
        self.channel_id.is_some()
    }
}

#[async_trait]
impl ExternalCheck for ChannelSubscriptionCheck {
    async fn is_satisfied(&self, user: UserId) -> Result<bool, CheckError> {
        let channel = self
            .channel_id
            .as_deref()
            .ok_or_else(|| CheckError::NotConfigured("channel id is not set".into()))?;

        let member = self
            .client
            .get_chat_member(channel, user.as_i64())
            .await
            .map_err(|e| {
                tracing::warn!(%user, channel, error = %e, "subscription lookup failed");
                CheckError::Unavailable(e.to_string())
            })?;

        tracing::debug!(%user, channel, status = %member.status, "subscription status");
        Ok(member.is_subscribed())
    }

    fn name(&self) -> &str {
        "channel-subscription"
    }
}
