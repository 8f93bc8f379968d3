//! HMAC-SHA256 primitives and the signing side of the handshake.
//!
//! Production code only verifies; signing exists so tests, benchmarks and
//! local tooling can mint payloads the verifier accepts.

use crate::{data_check_string, HASH_FIELD, WEB_APP_DATA_LABEL};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sha2::Sha256;

pub(crate) type HmacSha256 = Hmac<Sha256>;

pub(crate) fn keyed_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length")
}

/// `HMAC_SHA256(key = "WebAppData", msg = bot_token)`.
pub(crate) fn derive_secret(bot_token: &str) -> [u8; 32] {
    let mut mac = keyed_mac(WEB_APP_DATA_LABEL);
    mac.update(bot_token.as_bytes());
    mac.finalize().into_bytes().into()
}

/// Produce a signed, URL-encoded init-data string for `fields`.
///
/// Any `hash` entry in `fields` is ignored and replaced by the computed one.
pub fn sign_init_data(bot_token: &str, fields: &[(&str, &str)]) -> String {
    let secret = derive_secret(bot_token);
    let mut mac = keyed_mac(&secret);
    mac.update(data_check_string(fields).as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut parts: Vec<String> = fields
        .iter()
        .filter(|(k, _)| *k != HASH_FIELD)
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, NON_ALPHANUMERIC),
                utf8_percent_encode(v, NON_ALPHANUMERIC)
            )
        })
        .collect();
    parts.push(format!("{HASH_FIELD}={hash}"));
    parts.join("&")
}
