//! Unverified bearer-token payload decoding.
//!
//! The payload is read only to short-circuit tokens that have obviously
//! expired before spending a network round trip. It is never treated as
//! proof of identity; the backend's `/auth/me` answer is.

#[cfg(test)]
#[path = "decoder_test.rs"]
mod decoder_test;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("token must have three dot-separated segments, found {0}")]
    Malformed(usize),
    #[error("token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Claims carried in the token's middle segment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch. Fractional values round up.
    #[serde(default, deserialize_with = "deserialize_exp")]
    pub exp: Option<i64>,
    /// Subject as issued; backends use both numeric ids and usernames.
    #[serde(default)]
    pub sub: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// A token is only usable while `exp` is present and strictly in the future.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp.is_none_or(|exp| exp <= now)
    }
}

/// Decode the payload segment of `header.payload.signature`.
///
/// # Errors
///
/// Fails when the token does not have exactly three segments, or the middle
/// segment is not base64 (url-safe or standard, padded or not) encoding a
/// JSON object.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Malformed(segments.len()));
    }

    let normalized: String = segments[1]
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Current wall-clock time in seconds since the Unix epoch.
#[must_use]
pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[allow(clippy::cast_possible_truncation)]
fn deserialize_exp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(raw.and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f.ceil() as i64))))
}
