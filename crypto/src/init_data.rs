//! Parsing of the URL-encoded init-data string.

use crate::{AuthError, HASH_FIELD};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// The `user` object embedded (as JSON) in init data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: Option<bool>,
}

/// Split a query string into decoded `(key, value)` pairs, preserving order
/// and duplicates.
///
/// `+` decodes to a space and percent escapes must yield UTF-8. Empty
/// segments are skipped; a segment without `=` is rejected.
pub fn parse_init_data(raw: &str) -> Result<Vec<(String, String)>, AuthError> {
    let mut pairs = Vec::new();
    for segment in raw.split('&') {
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| AuthError::Malformed(format!("segment without '=': {segment}")))?;
        pairs.push((decode_component(key)?, decode_component(value)?));
    }
    Ok(pairs)
}

fn decode_component(raw: &str) -> Result<String, AuthError> {
    let plus_decoded = raw.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| AuthError::Malformed(format!("invalid UTF-8 in init data: {e}")))
}

/// Build the string the signature is computed over: every pair except the
/// hash, rendered `key=value`, sorted, joined by newlines.
pub fn data_check_string<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut lines: Vec<String> = pairs
        .iter()
        .filter(|(k, _)| k.as_ref() != HASH_FIELD)
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect();
    lines.sort();
    lines.join("\n")
}

/// First value stored under `key`.
pub(crate) fn field<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
