//! Failure guards for Authgate.
//!
//! Two small guard components live here, plus the storage seam they
//! (and the session layer above) share:
//!
//! 1. **Circuit breaker** ([`CircuitBreaker`]) — stops repeated failing
//!    sign-in attempts from being retried forever. Its state is
//!    persisted, so reloading the page does not quietly re-arm a user
//!    who just failed five times.
//! 2. **Loop detector** ([`LoopDetector`]) — recognizes pathological
//!    redirect cycles between the login route and protected routes, and
//!    converts an infinite loop into a single detected-and-halted event.
//!
//! # How it fits in the stack
//!
//! ```text
//! Navigation layer (above)  ← consults the loop detector before redirecting
//! Session layer (above)     ← consults the breaker before signing in
//!     ↕
//! Guard layer (this crate)  ← counts failures and redirects, nothing else
//! ```
//!
//! Neither guard ever initiates anything. They are consulted; they
//! answer; the caller decides.

mod breaker;
mod error;
mod loopdetect;
mod storage;

pub use breaker::{BreakerConfig, BreakerStatus, CircuitBreaker};
pub use error::StorageError;
pub use loopdetect::{LoopConfig, LoopDetector, LoopStatus};
pub use storage::{keys, MemoryStorage, StateStorage};
