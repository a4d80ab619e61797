//! Identity and claim types decoded from a session token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a user, as issued by the identity backend.
///
/// This is a newtype wrapper around the backend's opaque subject string
/// (typically a UUID). Wrapping it keeps user ids from being confused
/// with other strings — tokens, paths, company ids — in function
/// signatures.
///
/// `#[serde(transparent)]` makes a `UserId` serialize as the bare string,
/// so a persisted record stores `"u-1234"` and not `{ "0": "u-1234" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// The claims a valid session token carries, decoded from its payload.
///
/// Only the three fields this system actually consumes are extracted;
/// any other claims in the payload are ignored, not rejected — the
/// backend is free to add claims without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// The subject — who the token was issued to.
    pub subject: UserId,

    /// When the token was issued (Unix seconds). Used for the
    /// staleness hint, not for validity.
    pub issued_at: i64,

    /// When the token stops being acceptable (Unix seconds).
    /// Validity requires this to be strictly in the future.
    pub expires_at: i64,
}
