//! The validity check itself, plus the staleness hint.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value as JsonValue;

use crate::{InvalidToken, TokenClaims, UserId};

/// How old a token's `iat` may be before [`is_stale`] flags it.
///
/// Seven days. A token issued longer ago than this is technically still
/// usable if unexpired, but after a long device sleep it is worth a
/// background refresh before trusting it for anything important.
pub const DEFAULT_MAX_TOKEN_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Current wall-clock time as Unix seconds.
///
/// Saturates to 0 if the system clock reports a pre-epoch time, so the
/// validators stay total even on a badly misconfigured machine.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Validates a token against the current wall clock.
///
/// See [`validate_at`] for the actual rules.
pub fn validate(token: &str) -> Result<TokenClaims, InvalidToken> {
    validate_at(token, unix_now())
}

/// Validates a token string at an explicit point in time.
///
/// Validity requires, in order:
/// 1. exactly three dot-separated segments,
/// 2. a base64url-decodable middle segment,
/// 3. a JSON object payload carrying `sub`, `iat`, and `exp`,
/// 4. `exp` strictly greater than `now_unix`.
///
/// Any failure is returned as an [`InvalidToken`] reason. This function
/// is total and side-effect-free; it is safe to call on arbitrary
/// strings pulled from persisted storage.
pub fn validate_at(
    token: &str,
    now_unix: i64,
) -> Result<TokenClaims, InvalidToken> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(InvalidToken::MissingSegments);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| InvalidToken::PayloadEncoding)?;

    let json: JsonValue = serde_json::from_slice(&payload)
        .map_err(|_| InvalidToken::PayloadJson)?;

    // Extract each claim explicitly so the reason names the first
    // missing one instead of a generic parse error.
    let subject = json
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or(InvalidToken::MissingClaim("sub"))?;
    let issued_at = json
        .get("iat")
        .and_then(JsonValue::as_i64)
        .ok_or(InvalidToken::MissingClaim("iat"))?;
    let expires_at = json
        .get("exp")
        .and_then(JsonValue::as_i64)
        .ok_or(InvalidToken::MissingClaim("exp"))?;

    if expires_at <= now_unix {
        return Err(InvalidToken::Expired {
            expired_at: expires_at,
        });
    }

    Ok(TokenClaims {
        subject: UserId(subject.to_owned()),
        issued_at,
        expires_at,
    })
}

/// Returns `true` if the claims are suspiciously old.
///
/// This is a hint, not a failure: a token whose `iat` is older than
/// `max_age` is still valid if unexpired, but probably predates a long
/// device sleep and deserves a refresh. Callers decide what to do with
/// the hint.
pub fn is_stale(claims: &TokenClaims, now_unix: i64, max_age: Duration) -> bool {
    now_unix.saturating_sub(claims.issued_at) > max_age.as_secs() as i64
}

// =========================================================================
// Tests
// =========================================================================
