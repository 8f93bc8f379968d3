//! Signature verification for the WebApp handshake payload.
//!
//! The host platform hands the web app a URL-encoded `initData` string whose
//! `hash` field is an HMAC-SHA256 over the remaining fields, keyed by a secret
//! derived from the bot token:
//!
//! - `secret = HMAC_SHA256(key = "WebAppData", msg = bot_token)`
//! - `hash   = hex(HMAC_SHA256(key = secret, msg = sorted "k=v" lines))`

pub mod error;
pub mod init_data;
pub mod sign;
pub mod verifier;

pub use error::AuthError;
pub use init_data::{data_check_string, parse_init_data, WebAppUser};
pub use sign::sign_init_data;
pub use verifier::{InitDataVerifier, VerifiedInitData};

/// HMAC key used to derive the per-bot secret.
pub const WEB_APP_DATA_LABEL: &[u8] = b"WebAppData";

/// Name of the field carrying the signature.
pub const HASH_FIELD: &str = "hash";
