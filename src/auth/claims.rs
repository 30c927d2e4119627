//! Claims extraction from an opaque three-segment bearer token.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

use crate::shared::UserId;

/// Identity claims carried in the payload segment of a bearer token.
///
/// The backend also embeds `exp`; expiry enforcement is the server's job,
/// so it is ignored here.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: UserId,
    pub username: String,
    pub role: String,
}

/// Decode the payload segment of a dot-delimited bearer token.
///
/// Fails closed: any malformed input — wrong segment count, invalid
/// base64, non-JSON payload, missing fields — yields `None`. Never
/// panics, never returns an error.
pub fn decode_token(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let bytes = decode_segment(payload)?;
    match serde_json::from_slice::<Claims>(&bytes) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!("Token payload is not valid claims JSON: {}", e);
            None
        }
    }
}

/// Tokens in the wild use either base64url (JWT spec) or the standard
/// alphabet, with or without padding. Accept all four.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(payload_json: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(payload_json);
        format!("header.{payload}.signature")
    }

    #[test]
    fn test_decode_valid_token() {
        let token =
            make_token(r#"{"user_id":"u1","username":"alice","role":"user","exp":1700000000}"#);
        let claims = decode_token(&token).expect("claims should decode");
        assert_eq!(claims.user_id.as_str(), "u1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn test_decode_padded_standard_base64() {
        let payload = base64::engine::general_purpose::STANDARD
            .encode(r#"{"user_id":"u2","username":"bob","role":"admin"}"#);
        let claims = decode_token(&format!("h.{payload}.s")).expect("claims should decode");
        assert_eq!(claims.username, "bob");
    }

    #[test]
    fn test_not_a_token_returns_none() {
        assert_eq!(decode_token("not-a-token"), None);
    }

    #[test]
    fn test_two_segments_returns_none() {
        assert_eq!(decode_token("a.b"), None);
    }

    #[test]
    fn test_four_segments_returns_none() {
        assert_eq!(decode_token("a.b.c.d"), None);
    }

    #[test]
    fn test_non_json_payload_returns_none() {
        let payload = URL_SAFE_NO_PAD.encode("definitely not json");
        assert_eq!(decode_token(&format!("a.{payload}.c")), None);
    }

    #[test]
    fn test_missing_claim_field_returns_none() {
        let token = make_token(r#"{"user_id":"u1"}"#);
        assert_eq!(decode_token(&token), None);
    }

    #[test]
    fn test_empty_string_returns_none() {
        assert_eq!(decode_token(""), None);
    }
}
