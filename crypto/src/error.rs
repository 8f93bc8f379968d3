use thiserror::Error;

/// Why an init-data payload was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("init data signature is missing or invalid")]
    InvalidSignature,

    #[error("malformed init data: {0}")]
    Malformed(String),

    #[error("init data expired: issued {age_secs}s ago, limit is {max_age_secs}s")]
    Expired { age_secs: u64, max_age_secs: u64 },
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Malformed(_) => "malformed",
            AuthError::Expired { .. } => "expired",
        }
    }
}
