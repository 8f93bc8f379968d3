//! Init-data verification.

use crate::init_data::field;
use crate::sign::{derive_secret, keyed_mac};
use crate::{data_check_string, parse_init_data, AuthError, WebAppUser, HASH_FIELD};
use hmac::Mac;
use std::fmt;
use visarun_types::{Timestamp, UserId};

/// Claims recovered from a payload whose signature checked out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedInitData {
    pub user: WebAppUser,
    pub auth_date: Timestamp,
    pub query_id: Option<String>,
    /// All decoded fields except the hash, in their original order.
    pub fields: Vec<(String, String)>,
}

impl VerifiedInitData {
    pub fn user_id(&self) -> UserId {
        UserId::new(self.user.id)
    }
}

/// Verifies init data against the secret derived from one bot token.
pub struct InitDataVerifier {
    secret: [u8; 32],
    max_age_secs: Option<u64>,
}

impl InitDataVerifier {
    /// Create a verifier for `bot_token` without a freshness window.
    pub fn new(bot_token: &str) -> Self {
        Self {
            secret: derive_secret(bot_token),
            max_age_secs: None,
        }
    }

    /// Reject payloads whose `auth_date` is older than `secs`. Zero disables
    /// the check.
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = (secs > 0).then_some(secs);
        self
    }

    pub fn max_age_secs(&self) -> Option<u64> {
        self.max_age_secs
    }

    /// Verify `raw` and extract its claims.
    ///
    /// Checks run in a fixed order: structure, signature presence, MAC,
    /// user presence, user JSON, `auth_date`, freshness.
    pub fn verify(&self, raw: &str, now: Timestamp) -> Result<VerifiedInitData, AuthError> {
        let pairs = parse_init_data(raw)?;

        let supplied = field(&pairs, HASH_FIELD).ok_or(AuthError::InvalidSignature)?;
        let supplied = decode_signature(supplied).ok_or(AuthError::InvalidSignature)?;

        let mut mac = keyed_mac(&self.secret);
        mac.update(data_check_string(&pairs).as_bytes());
        // verify_slice compares in constant time.
        mac.verify_slice(&supplied)
            .map_err(|_| AuthError::InvalidSignature)?;

        let user_json = field(&pairs, "user").ok_or(AuthError::InvalidSignature)?;
        let user: WebAppUser = serde_json::from_str(user_json)
            .map_err(|e| AuthError::Malformed(format!("user field: {e}")))?;

        let auth_date = match field(&pairs, "auth_date") {
            Some(v) => v
                .parse::<u64>()
                .map(Timestamp::new)
                .map_err(|e| AuthError::Malformed(format!("auth_date: {e}")))?,
            None => Timestamp::default(),
        };

        if let Some(max_age_secs) = self.max_age_secs {
            if auth_date.is_older_than(max_age_secs, now) {
                return Err(AuthError::Expired {
                    age_secs: auth_date.age_at(now),
                    max_age_secs,
                });
            }
        }

        let query_id = field(&pairs, "query_id").map(str::to_string);
        let fields = pairs.into_iter().filter(|(k, _)| k != HASH_FIELD).collect();

        Ok(VerifiedInitData {
            user,
            auth_date,
            query_id,
            fields,
        })
    }
}

/// Accept only the canonical form: 64 lowercase hex digits.
fn decode_signature(s: &str) -> Option<Vec<u8>> {
    let canonical = s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !canonical {
        return None;
    }
    hex::decode(s).ok()
}

impl fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("secret", &"<redacted>")
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign_init_data;

    const TOKEN: &str = "123456:TEST-TOKEN";
    const USER: &str = r#"{"id":279058397,"first_name":"Vladislav","username":"vdkfrost","language_code":"ru"}"#;

    fn signed(fields: &[(&str, &str)]) -> String {
        sign_init_data(TOKEN, fields)
    }

    fn now() -> Timestamp {
        Timestamp::new(1_700_000_100)
    }

    #[test]
    fn valid_payload_recovers_user() {
        let raw = signed(&[
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", USER),
            ("auth_date", "1700000000"),
        ]);
        let verified = InitDataVerifier::new(TOKEN).verify(&raw, now()).unwrap();
        assert_eq!(verified.user_id(), UserId::new(279058397));
        assert_eq!(verified.user.username.as_deref(), Some("vdkfrost"));
        assert_eq!(verified.auth_date, Timestamp::new(1_700_000_000));
        assert_eq!(verified.query_id.as_deref(), Some("AAHdF6IQAAAAAN0XohDhrOrc"));
        assert!(verified.fields.iter().all(|(k, _)| k != "hash"));
    }

    #[test]
    fn field_order_does_not_matter() {
        let a = signed(&[("user", USER), ("auth_date", "1700000000")]);
        let b = signed(&[("auth_date", "1700000000"), ("user", USER)]);
        let verifier = InitDataVerifier::new(TOKEN);
        assert!(verifier.verify(&a, now()).is_ok());
        assert!(verifier.verify(&b, now()).is_ok());
    }

    #[test]
    fn wrong_token_is_rejected() {
        let raw = signed(&[("user", USER), ("auth_date", "1700000000")]);
        let err = InitDataVerifier::new("other:token").verify(&raw, now()).unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn tampered_field_is_rejected() {
        let raw = signed(&[("user", USER), ("auth_date", "1700000000")]);
        let tampered = raw.replace("auth%5Fdate=1700000000", "auth%5Fdate=1700000001");
        assert_ne!(raw, tampered);
        let err = InitDataVerifier::new(TOKEN).verify(&tampered, now()).unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn missing_hash_is_invalid_signature() {
        let err = InitDataVerifier::new(TOKEN)
            .verify("auth_date=1&user=%7B%22id%22%3A1%7D", now())
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn uppercase_hash_is_rejected() {
        let raw = signed(&[("user", USER), ("auth_date", "1700000000")]);
        let (body, hash) = raw.rsplit_once("hash=").unwrap();
        let upper = format!("{body}hash={}", hash.to_uppercase());
        let err = InitDataVerifier::new(TOKEN).verify(&upper, now()).unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn first_and_last_hash_char_mutations_both_fail() {
        let raw = signed(&[("user", USER), ("auth_date", "1700000000")]);
        let (body, hash) = raw.rsplit_once("hash=").unwrap();
        let verifier = InitDataVerifier::new(TOKEN);
        for pos in [0, hash.len() - 1] {
            let mut chars: Vec<char> = hash.chars().collect();
            chars[pos] = if chars[pos] == '0' { '1' } else { '0' };
            let mutated = format!("{body}hash={}", chars.into_iter().collect::<String>());
            assert_eq!(
                verifier.verify(&mutated, now()).unwrap_err(),
                AuthError::InvalidSignature
            );
        }
    }

    #[test]
    fn signed_payload_without_user_is_invalid_signature() {
        let raw = signed(&[("auth_date", "1700000000"), ("query_id", "q")]);
        let err = InitDataVerifier::new(TOKEN).verify(&raw, now()).unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn signed_but_unparseable_user_is_malformed() {
        let raw = signed(&[("user", "{not json"), ("auth_date", "1700000000")]);
        let err = InitDataVerifier::new(TOKEN).verify(&raw, now()).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));

        let raw = signed(&[("user", r#"{"first_name":"NoId"}"#), ("auth_date", "1")]);
        let err = InitDataVerifier::new(TOKEN).verify(&raw, now()).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn signed_but_bad_auth_date_is_malformed() {
        let raw = signed(&[("user", USER), ("auth_date", "yesterday")]);
        let err = InitDataVerifier::new(TOKEN).verify(&raw, now()).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn broken_structure_is_malformed() {
        let err = InitDataVerifier::new(TOKEN)
            .verify("user&hash=00", now())
            .unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn freshness_window_is_optional() {
        let raw = signed(&[("user", USER), ("auth_date", "1000")]);
        let later = Timestamp::new(1000 + 86_400 + 1);

        assert!(InitDataVerifier::new(TOKEN).verify(&raw, later).is_ok());
        assert!(InitDataVerifier::new(TOKEN)
            .with_max_age(0)
            .verify(&raw, later)
            .is_ok());

        let err = InitDataVerifier::new(TOKEN)
            .with_max_age(86_400)
            .verify(&raw, later)
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::Expired {
                age_secs: 86_401,
                max_age_secs: 86_400
            }
        );
        assert_eq!(err.code(), "expired");

        let on_the_edge = Timestamp::new(1000 + 86_400);
        assert!(InitDataVerifier::new(TOKEN)
            .with_max_age(86_400)
            .verify(&raw, on_the_edge)
            .is_ok());
    }

    #[test]
    fn debug_output_hides_secret() {
        let dbg = format!("{:?}", InitDataVerifier::new(TOKEN));
        assert!(dbg.contains("redacted"));
    }
}
