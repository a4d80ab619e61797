//! The session record: what "being signed in" is made of.

use authgate_token::{validate_at, InvalidToken, UserId};
use serde::{Deserialize, Serialize};

/// One established session: the token pair plus its validity window.
///
/// Owned exclusively by the session store. A record is never mutated in
/// place — a token refresh replaces the whole record, so any clone a
/// subscriber holds stays internally consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque access token presented to the backend on every call.
    pub access_token: String,

    /// Opaque refresh token used to mint a new pair.
    pub refresh_token: String,

    /// When the access token was issued (Unix seconds, from its payload).
    pub issued_at: i64,

    /// When the access token expires (Unix seconds, from its payload).
    pub expires_at: i64,

    /// The user this session belongs to (from the token's subject).
    pub user_id: UserId,
}

impl SessionRecord {
    /// Builds a record from a token pair, deriving the timestamps and
    /// user id from the access token's payload.
    ///
    /// # Errors
    /// Returns the token's [`InvalidToken`] reason if the access token
    /// fails structural validation — a record is only ever built from a
    /// token that currently passes.
    pub fn from_tokens(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self, InvalidToken> {
        Self::from_tokens_at(
            access_token,
            refresh_token,
            authgate_token::unix_now(),
        )
    }

    /// [`from_tokens`](Self::from_tokens) with an explicit clock, for
    /// deterministic tests.
    pub fn from_tokens_at(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        now_unix: i64,
    ) -> Result<Self, InvalidToken> {
        let access_token = access_token.into();
        let claims = validate_at(&access_token, now_unix)?;
        Ok(Self {
            access_token,
            refresh_token: refresh_token.into(),
            issued_at: claims.issued_at,
            expires_at: claims.expires_at,
            user_id: claims.subject,
        })
    }
}
