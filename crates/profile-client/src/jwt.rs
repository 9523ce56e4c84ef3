//! JWT claim decoding for session expiry checks.
//!
//! The client never verifies signatures; it only reads the payload to know
//! who is logged in and when the token lapses. Undecodable tokens count as
//! expired.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::Utc;
use serde::Deserialize;

use crate::{ProfileError, Result};

/// Slack applied to the expiry check, in seconds.
pub const DEFAULT_LEEWAY_SECS: i64 = 10;

/// Claims the backend puts in its tokens. All optional; absent claims are
/// simply not there.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub unique_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub exp: Option<i64>,
}

/// Decode the payload segment of a JWT.
pub fn decode(token: &str) -> Result<Claims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ProfileError::InvalidToken("not a JWT".into()))?;
    let bytes = decode_base64url(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Whether the token is expired (with leeway). Tokens without an `exp`
/// claim, or that cannot be decoded at all, are treated as expired.
pub fn is_expired(token: &str, leeway_secs: i64) -> bool {
    let Ok(claims) = decode(token) else {
        return true;
    };
    let Some(exp) = claims.exp else {
        return true;
    };
    Utc::now().timestamp() >= exp - leeway_secs
}

fn decode_base64url(segment: &str) -> Result<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| ProfileError::InvalidToken(format!("payload decode: {e}")))
}
