//! Pre-built [`tracing::Span`] constructors for common node operations.
//!
//! Consistent span names and field sets make it easy to filter and correlate
//! request logs.

use tracing::{info_span, Span};
use visarun_types::UserId;

/// Span covering one authenticated API request.
pub fn request_span(action: &str, user: UserId) -> Span {
    info_span!("request", action = %action, user = %user)
}

/// Span covering one bot update.
pub fn bot_update_span(update_id: i64) -> Span {
    info_span!("bot_update", update_id = update_id)
}
