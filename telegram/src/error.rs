use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Bot API unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP request to Bot API failed: {0}")]
    RequestFailed(String),

    #[error("invalid response from Bot API: {0}")]
    InvalidResponse(String),

    #[error("Bot API error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TelegramError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            TelegramError::Unreachable(format!("connection failed: {e}"))
        } else if e.is_decode() {
            TelegramError::InvalidResponse(e.to_string())
        } else {
            TelegramError::RequestFailed(e.to_string())
        }
    }
}
