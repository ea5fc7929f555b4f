// common/src/test_support.rs
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::launch::{check_string, WEB_APP_DATA_KEY};

pub const BOT_TOKEN: &str = "123456:TEST-bot-token";
pub const SIGNING_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

/// Hex signature the host would attach to `pairs`.
pub fn sign(bot_token: &str, pairs: &[(&str, &str)]) -> String {
    let mut derive = Hmac::<Sha256>::new_from_slice(WEB_APP_DATA_KEY).unwrap();
    derive.update(bot_token.as_bytes());
    let secret = derive.finalize().into_bytes();

    let mut mac = Hmac::<Sha256>::new_from_slice(&secret).unwrap();
    mac.update(check_string(pairs.iter().copied()).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn encode(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish()
}

/// `pairs` plus a valid `hash`, URL-encoded.
pub fn signed_payload(pairs: &[(&str, &str)]) -> String {
    let hash = sign(BOT_TOKEN, pairs);
    let mut all: Vec<(&str, &str)> = pairs.to_vec();
    all.push(("hash", hash.as_str()));
    encode(&all)
}
