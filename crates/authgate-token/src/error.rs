//! Rejection reasons for token validation.

/// Why a token failed validation.
///
/// Every way a token can be bad maps to one of these values. The
/// validator never panics and never distinguishes "weird" failures from
/// "expected" ones by crashing — a garbage string and a token that
/// expired one second ago both come back as a reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidToken {
    /// The token does not have exactly three dot-separated segments.
    #[error("token does not have three segments")]
    MissingSegments,

    /// The payload segment is not valid base64url.
    #[error("token payload is not base64url")]
    PayloadEncoding,

    /// The payload decoded, but is not a JSON object.
    #[error("token payload is not JSON")]
    PayloadJson,

    /// The payload is missing a required claim, or the claim has the
    /// wrong type. The field names which one.
    #[error("token payload missing claim: {0}")]
    MissingClaim(&'static str),

    /// The token decoded cleanly but its expiry is not in the future.
    #[error("token expired at {expired_at}")]
    Expired {
        /// The `exp` claim, Unix seconds.
        expired_at: i64,
    },
}
