//! Client-side bearer token inspection.
//!
//! Reads the payload of a JWT-shaped token without verifying its signature.
//! This only decides when to refresh proactively; the server still validates
//! the token on every call and remains the sole trust decision.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Map, Value};

/// Refresh when fewer than this many seconds remain.
pub const DEFAULT_REFRESH_WINDOW_SECS: i64 = 300;

/// Session lifetime assumed when the token carries no usable expiry.
pub const FALLBACK_SESSION_HOURS: i64 = 24;

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    claims: Map<String, Value>,
}

impl TokenClaims {
    /// Subject claim (the account email for this API).
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }

    /// `exp` claim in epoch seconds. Zero or non-numeric counts as absent.
    pub fn exp(&self) -> Option<i64> {
        let exp = self.claims.get("exp")?;
        let secs = exp
            .as_i64()
            .or_else(|| exp.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
        (secs != 0).then_some(secs)
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp()?, 0).single()
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.claims.get(claim)
    }
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}

/// Decode the payload segment of a three-part token.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.trim().split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = decode_segment(payload)?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(claims) => Some(TokenClaims { claims }),
        _ => None,
    }
}

pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token)?.expiration()
}

/// True if the token should be refreshed: less than `window` remains, or
/// the expiry cannot be read at all.
pub fn is_near_expiration(token: &str, now: DateTime<Utc>, window: Duration) -> bool {
    match expires_at(token) {
        Some(expiration) => expiration - now < window,
        None => true,
    }
}

/// When a stored session should be discarded: the token expiry, or 24 hours
/// from `now` if the token has none.
pub fn session_expiry(token: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    expires_at(token).unwrap_or_else(|| now + Duration::hours(FALLBACK_SESSION_HOURS))
}


#[cfg(test)]
mod tests {
    use super::test_support::make_token;
    use super::*;
    use serde_json::json;

    fn window() -> Duration {
        Duration::seconds(DEFAULT_REFRESH_WINDOW_SECS)
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_decode_claims() {
        let token = make_token(&json!({ "sub": "ana@example.com", "exp": 1_700_000_600 }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.subject(), Some("ana@example.com"));
        assert_eq!(claims.exp(), Some(1_700_000_600));
    }

    #[test]
    fn test_far_expiry_is_not_near() {
        let token = make_token(&json!({ "exp": 1_700_000_301 }));
        assert!(!is_near_expiration(&token, now(), window()));
    }

    #[test]
    fn test_expiry_inside_window_is_near() {
        let token = make_token(&json!({ "exp": 1_700_000_299 }));
        assert!(is_near_expiration(&token, now(), window()));

        // Exactly 300s left is not "fewer than 300s"
        let token = make_token(&json!({ "exp": 1_700_000_300 }));
        assert!(!is_near_expiration(&token, now(), window()));
    }

    #[test]
    fn test_expired_token_is_near() {
        let token = make_token(&json!({ "exp": 1_600_000_000 }));
        assert!(is_near_expiration(&token, now(), window()));
    }

    #[test]
    fn test_undecodable_tokens_fail_closed() {
        assert!(is_near_expiration("", now(), window()));
        assert!(is_near_expiration("not-a-token", now(), window()));
        assert!(is_near_expiration("a.b", now(), window()));
        assert!(is_near_expiration("a.!!!.c", now(), window()));
        assert!(is_near_expiration("a.b.c.d", now(), window()));

        let array_payload = make_token(&json!([1, 2, 3]));
        assert!(is_near_expiration(&array_payload, now(), window()));
    }

    #[test]
    fn test_missing_or_zero_exp_fails_closed() {
        let token = make_token(&json!({ "sub": "x" }));
        assert!(is_near_expiration(&token, now(), window()));

        let token = make_token(&json!({ "exp": 0 }));
        assert!(is_near_expiration(&token, now(), window()));

        let token = make_token(&json!({ "exp": "soon" }));
        assert!(is_near_expiration(&token, now(), window()));
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"exp":1700000900}"#);
        let token = format!("{}.{}.sig", header, body);
        assert_eq!(decode_claims(&token).unwrap().exp(), Some(1_700_000_900));
    }

    #[test]
    fn test_fractional_exp() {
        let token = make_token(&json!({ "exp": 1_700_000_900.5 }));
        assert_eq!(decode_claims(&token).unwrap().exp(), Some(1_700_000_900));
    }

    #[test]
    fn test_session_expiry_fallback() {
        let token = make_token(&json!({ "exp": 1_700_003_600 }));
        assert_eq!(
            session_expiry(&token, now()),
            Utc.timestamp_opt(1_700_003_600, 0).unwrap()
        );
        assert_eq!(session_expiry("garbage", now()), now() + Duration::hours(24));
    }
}
