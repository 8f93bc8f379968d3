//! Bot command parsing and the referral deep link.

use visarun_types::UserId;

/// Deep-link payload prefix carrying the inviter's id.
pub const REFERRAL_PREFIX: &str = "ref_";

/// Commands the bot reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    /// `/start` with the optional deep-link payload.
    Start { payload: Option<String> },
    /// `/link`: ask for one's own referral link.
    Link,
}

impl BotCommand {
    /// Parse a message text. Accepts the `/cmd@botname` form; unknown
    /// commands and plain text yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);
        match name {
            "start" => Some(BotCommand::Start {
                payload: (!args.is_empty()).then(|| args.to_string()),
            }),
            "link" => Some(BotCommand::Link),
            _ => None,
        }
    }
}

/// Extract the inviter from a `ref_<inviterId>` payload.
///
/// Non-referral payloads, unparsable and non-positive ids yield `None`.
pub fn parse_referral(payload: &str) -> Option<UserId> {
    let raw = payload.trim().strip_prefix(REFERRAL_PREFIX)?;
    let id: i64 = raw.parse().ok()?;
    (id > 0).then(|| UserId::new(id))
}

/// `https://t.me/<bot>?start=ref_<user>`.
pub fn referral_link(bot_username: &str, user: UserId) -> String {
    format!(
        "https://t.me/{}?start={REFERRAL_PREFIX}{user}",
        bot_username.trim_start_matches('@')
    )
}
