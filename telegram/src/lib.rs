//! Telegram Bot API integration.
//!
//! - [`BotClient`]: thin JSON client over the Bot API methods the game uses
//!   (`getMe`, `getChatMember`, `getUpdates`, `setWebhook`, `sendMessage`)
//! - [`ChannelSubscriptionCheck`]: the "subscribed to the channel" external
//!   check, backed by `getChatMember`
//! - [`BotCommand`]: parsing of `/start [payload]` and `/link`, including the
//!   `ref_<inviterId>` referral deep-link payload

pub mod client;
pub mod commands;
pub mod error;
pub mod subscription;
pub mod types;

pub use client::BotClient;
pub use commands::{parse_referral, referral_link, BotCommand, REFERRAL_PREFIX};
pub use error::TelegramError;
pub use subscription::ChannelSubscriptionCheck;
pub use types::{
    Chat, ChatMember, InlineKeyboardButton, InlineKeyboardMarkup, Message, TgUser, Update,
    WebAppInfo,
};
