// common/src/launch.rs
//! Verification of signed Mini App launch data.
//!
//! The host signs the launch parameters with a key derived from the bot token:
//! `secret = HMAC-SHA256(key = "WebAppData", msg = bot_token)`, then
//! `hash = hex(HMAC-SHA256(key = secret, msg = check_string))` where the check
//! string is every `key=value` pair except `hash`, sorted by key and joined
//! with `\n`.
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Fixed key used to derive the per-bot secret.
pub const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Default freshness window for `auth_date`, in seconds.
pub const DEFAULT_MAX_AGE_SECS: i64 = 300;

const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";
const USER_FIELD: &str = "user";

/// Reason a launch payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Bot token is not configured")]
    ConfigurationMissing,
    #[error("Hash is missing from initData")]
    MissingSignature,
    #[error("auth_date is missing from initData")]
    MissingTimestamp,
    #[error("auth_date is not a valid timestamp")]
    MalformedTimestamp,
    #[error("Telegram data is older than the allowed window")]
    StalePayload,
    #[error("Hash validation failed")]
    SignatureMismatch,
    #[error("User data is missing")]
    MissingUserData,
    #[error("Error parsing user data")]
    MalformedUserData,
}

impl Rejection {
    /// Stable machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::ConfigurationMissing => "configuration_missing",
            Rejection::MissingSignature => "missing_signature",
            Rejection::MissingTimestamp => "missing_timestamp",
            Rejection::MalformedTimestamp => "malformed_timestamp",
            Rejection::StalePayload => "stale_payload",
            Rejection::SignatureMismatch => "signature_mismatch",
            Rejection::MissingUserData => "missing_user_data",
            Rejection::MalformedUserData => "malformed_user_data",
        }
    }
}

/// The `user` object embedded in launch data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaim {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: Option<bool>,
    pub photo_url: Option<String>,
}

/// Launch data that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLaunch {
    /// All signed fields except `hash`
    pub fields: BTreeMap<String, String>,
    pub user: UserClaim,
    pub auth_date: DateTime<Utc>,
}

pub type VerificationOutcome = Result<VerifiedLaunch, Rejection>;

/// Split a raw `key=value&...` payload into decoded pairs, preserving order.
pub fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

/// Build the canonical check string: pairs sorted by key (byte order),
/// rendered as `key=value` and joined with a newline.
pub fn check_string<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Verifies launch payloads against a single bot token.
#[derive(Clone)]
pub struct LaunchVerifier {
    mac: Option<HmacSha256>,
    max_age: Duration,
}

impl fmt::Debug for LaunchVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchVerifier")
            .field("configured", &self.is_configured())
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl LaunchVerifier {
    /// An absent or empty bot token yields a verifier that rejects every
    /// payload with [`Rejection::ConfigurationMissing`].
    pub fn new(bot_token: Option<&str>, max_age: Duration) -> Self {
        let mac = bot_token
            .filter(|token| !token.is_empty())
            .and_then(|token| {
                let mut derive = HmacSha256::new_from_slice(WEB_APP_DATA_KEY).ok()?;
                derive.update(token.as_bytes());
                let secret_key = derive.finalize().into_bytes();
                HmacSha256::new_from_slice(&secret_key).ok()
            });

        Self { mac, max_age }
    }

    pub fn is_configured(&self) -> bool {
        self.mac.is_some()
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Verify `raw` as of `now`.
    ///
    /// Only payloads older than the window are refused; a future `auth_date`
    /// is accepted.
    pub fn verify(&self, raw: &str, now: DateTime<Utc>) -> VerificationOutcome {
        let mut mac = self.mac.clone().ok_or(Rejection::ConfigurationMissing)?;

        let mut pairs = parse_pairs(raw);

        let hash = first_value(&pairs, HASH_FIELD)
            .map(str::to_owned)
            .ok_or(Rejection::MissingSignature)?;
        pairs.retain(|(key, _)| key != HASH_FIELD);

        let auth_date = first_value(&pairs, AUTH_DATE_FIELD).ok_or(Rejection::MissingTimestamp)?;
        let auth_date: i64 = auth_date
            .parse()
            .map_err(|_| Rejection::MalformedTimestamp)?;
        let auth_date = Utc
            .timestamp_opt(auth_date, 0)
            .single()
            .ok_or(Rejection::MalformedTimestamp)?;

        if now.timestamp().saturating_sub(auth_date.timestamp()) > self.max_age.num_seconds() {
            return Err(Rejection::StalePayload);
        }

        let check = check_string(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let expected = decode_signature(&hash).ok_or(Rejection::SignatureMismatch)?;
        mac.update(check.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&expected)
            .map_err(|_| Rejection::SignatureMismatch)?;

        let fields: BTreeMap<String, String> = pairs.into_iter().collect();

        let user = fields
            .get(USER_FIELD)
            .filter(|raw_user| !raw_user.is_empty())
            .ok_or(Rejection::MissingUserData)?;
        let user: UserClaim =
            serde_json::from_str(user).map_err(|_| Rejection::MalformedUserData)?;

        Ok(VerifiedLaunch {
            fields,
            user,
            auth_date,
        })
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Only lowercase hex of the full digest length is accepted.
fn decode_signature(hash: &str) -> Option<Vec<u8>> {
    let well_formed = hash.len() == 64
        && hash
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !well_formed {
        return None;
    }
    hex::decode(hash).ok()
}
