//! Structural session-token validation for Authgate.
//!
//! This crate answers one question without ever talking to the network:
//! "does this token string *look* like a live session token?" It checks
//! the three-segment shape, decodes the payload, and compares the expiry
//! against the clock. It deliberately does NOT verify signatures — the
//! backend is the authority on that; the client only needs a cheap local
//! verdict to decide whether a persisted session is worth restoring.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session layer (above)  ← restores/refreshes sessions based on the verdict
//!     ↕
//! Token layer (this crate)  ← pure structural checks, no I/O
//! ```
//!
//! Everything here is total: a malformed token produces an
//! [`InvalidToken`] value, never a panic and never an error that
//! propagates as an exception.

mod claims;
mod error;
mod validate;

pub use claims::{TokenClaims, UserId};
pub use error::InvalidToken;
pub use validate::{
    is_stale, unix_now, validate, validate_at, DEFAULT_MAX_TOKEN_AGE,
};
