use super::*;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

fn token_with(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

#[test]
fn decode_reads_exp_and_sub() {
    let claims = decode(&token_with(&json!({ "sub": "alice", "exp": 1_900_000_000 }))).unwrap();
    assert_eq!(claims.exp, Some(1_900_000_000));
    assert_eq!(claims.sub, Some(json!("alice")));
}

#[test]
fn decode_accepts_numeric_sub() {
    let claims = decode(&token_with(&json!({
        "sub": 42,
        "email": "alice@example.com",
        "type": "access",
        "exp": 1_900_000_000
    })))
    .unwrap();
    assert_eq!(claims.sub, Some(json!(42)));
    assert_eq!(claims.extra.get("type"), Some(&json!("access")));
    assert!(!claims.is_expired(1_800_000_000));
}

#[test]
fn decode_keeps_unknown_claims() {
    let claims = decode(&token_with(&json!({ "exp": 1, "role": "admin" }))).unwrap();
    assert_eq!(claims.extra.get("role"), Some(&json!("admin")));
}

#[test]
fn decode_accepts_padded_standard_alphabet() {
    let body = STANDARD.encode(json!({ "exp": 5, "sub": "??>?" }).to_string());
    let claims = decode(&format!("h.{body}.s")).unwrap();
    assert_eq!(claims.exp, Some(5));
}

#[test]
fn decode_rounds_fractional_exp_up() {
    let claims = decode(&token_with(&json!({ "exp": 100.25 }))).unwrap();
    assert_eq!(claims.exp, Some(101));
}

#[test]
fn decode_rejects_wrong_segment_counts() {
    for token in ["", "abc", "a.b", "a.b.c.d"] {
        assert!(matches!(decode(token), Err(DecodeError::Malformed(_))), "expected Malformed for {token:?}");
    }
}

#[test]
fn decode_rejects_non_base64_payload() {
    assert!(matches!(decode("a.!!!.c"), Err(DecodeError::Base64(_))));
}

#[test]
fn decode_rejects_non_json_payload() {
    let body = URL_SAFE_NO_PAD.encode("not json");
    assert!(matches!(decode(&format!("a.{body}.c")), Err(DecodeError::Json(_))));
}

#[test]
fn decode_rejects_non_object_payload() {
    let body = URL_SAFE_NO_PAD.encode("42");
    assert!(matches!(decode(&format!("a.{body}.c")), Err(DecodeError::Json(_))));
}

#[test]
fn is_expired_boundaries() {
    let claims = Claims { exp: Some(1000), ..Claims::default() };
    assert!(!claims.is_expired(999));
    assert!(claims.is_expired(1000));
    assert!(claims.is_expired(1001));
}

#[test]
fn missing_exp_counts_as_expired() {
    assert!(Claims::default().is_expired(0));
}

#[test]
fn now_unix_is_after_2024() {
    assert!(now_unix() > 1_700_000_000);
}
