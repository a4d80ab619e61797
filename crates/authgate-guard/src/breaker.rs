//! The sign-in circuit breaker.
//!
//! Repeated failing authentication attempts are worse than useless: they
//! hammer the backend, they can trip server-side rate limits or account
//! lockouts, and they teach users to mash the button. The breaker counts
//! consecutive failures and, past a threshold, refuses further attempts
//! for a cooldown window.
//!
//! # Persistence
//!
//! Breaker state is written through to [`StateStorage`] so that a page
//! reload does not reset an open breaker — reloading is exactly what a
//! frustrated user tries first. In-memory state remains authoritative
//! for the lifetime of the page: if storage writes fail, the breaker
//! keeps working and only cross-reload persistence is lost.
//!
//! # Who closes an open breaker
//!
//! Exactly three things: cooldown expiry (observed lazily by
//! [`status`](CircuitBreaker::status)), a successful authentication
//! ([`record_success`](CircuitBreaker::record_success)), or an explicit
//! [`reset`](CircuitBreaker::reset) from the recovery path. No state
//! transition elsewhere in the system may close it implicitly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use authgate_token::unix_now;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{keys, StateStorage};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable limits for the circuit breaker.
///
/// The defaults match the converged production values, but every
/// deployment knob is a field here — nothing is hard-coded at call
/// sites.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker. Clamped to at least 1
    /// by [`validated`](Self::validated).
    pub failure_threshold: u32,

    /// Failures further apart than this restart the count — a failure
    /// yesterday should not contribute to opening the breaker today.
    pub failure_window: Duration,

    /// How long the breaker stays open once tripped.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            failure_window: Duration::from_secs(30),
            cooldown: Duration::from_secs(300),
        }
    }
}

impl BreakerConfig {
    /// Clamps out-of-range values so the config is safe to use.
    /// A threshold of 0 would open the breaker before the first attempt.
    pub fn validated(mut self) -> Self {
        if self.failure_threshold == 0 {
            warn!("failure_threshold of 0 is meaningless — clamping to 1");
            self.failure_threshold = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Persisted record and status snapshot
// ---------------------------------------------------------------------------

/// The persisted breaker state. Created lazily on first failure,
/// removed on rehabilitation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BreakerRecord {
    /// Consecutive failures inside the failure window.
    failures: u32,

    /// Unix seconds of the most recent failure. 0 means "never".
    last_failure_unix: i64,

    /// When the breaker closes again, if open.
    open_until_unix: Option<i64>,

    /// Human-readable reason the breaker opened, for display.
    reason: Option<String>,
}

/// A snapshot answer to "may I attempt authentication right now?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerStatus {
    /// `true` while the breaker refuses attempts.
    pub open: bool,

    /// Why it opened, if it is open and a reason was recorded.
    pub reason: Option<String>,

    /// Time until the breaker closes on its own. Zero when closed.
    pub remaining_cooldown: Duration,
}

impl BreakerStatus {
    fn closed() -> Self {
        Self {
            open: false,
            reason: None,
            remaining_cooldown: Duration::ZERO,
        }
    }

    /// Remaining cooldown in whole seconds, for countdown display.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_cooldown.as_secs()
    }
}

// ---------------------------------------------------------------------------
// The breaker
// ---------------------------------------------------------------------------

/// Inner cache: the record as this page currently knows it.
///
/// `loaded` distinguishes "never looked at storage" from "looked and
/// found nothing", so storage is read exactly once per page lifetime.
#[derive(Debug, Default)]
struct Cache {
    loaded: bool,
    record: Option<BreakerRecord>,
}

/// Counts authentication failures and refuses attempts past a threshold.
///
/// Shared as an `Arc` between the session store (which consults it
/// before every sign-in) and the recovery path (which force-closes it).
/// All methods take `&self`; interior state lives behind a mutex.
pub struct CircuitBreaker {
    storage: Arc<dyn StateStorage>,
    config: BreakerConfig,
    cache: Mutex<Cache>,
}

impl CircuitBreaker {
    /// Creates a breaker over the given storage. Existing persisted
    /// state is picked up lazily on first use.
    pub fn new(storage: Arc<dyn StateStorage>, config: BreakerConfig) -> Self {
        Self {
            storage,
            config: config.validated(),
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Records a failed authentication attempt.
    ///
    /// Returns the status after the failure, so the caller can tell the
    /// user immediately if this attempt was the one that tripped it.
    pub fn record_failure(&self, reason: &str) -> BreakerStatus {
        let now = unix_now();
        self.with_record(|record| {
            let mut rec = record.take().unwrap_or_default();

            // Failures outside the window restart the count.
            if rec.last_failure_unix > 0
                && now - rec.last_failure_unix
                    > self.config.failure_window.as_secs() as i64
            {
                rec.failures = 0;
            }

            rec.failures += 1;
            rec.last_failure_unix = now;

            if rec.failures >= self.config.failure_threshold {
                let newly_opened = rec.open_until_unix.is_none();
                rec.open_until_unix =
                    Some(now + self.config.cooldown.as_secs() as i64);
                rec.reason = Some(reason.to_owned());
                if newly_opened {
                    warn!(
                        failures = rec.failures,
                        cooldown_secs = self.config.cooldown.as_secs(),
                        reason,
                        "circuit breaker opened"
                    );
                }
            } else {
                debug!(failures = rec.failures, reason, "auth failure recorded");
            }

            let status = Self::status_of(&rec, now);
            self.persist(&rec);
            *record = Some(rec);
            status
        })
    }

    /// Records a successful authentication.
    ///
    /// A single success fully rehabilitates the circuit: the count goes
    /// to zero and an open breaker closes, unconditionally.
    pub fn record_success(&self) {
        self.with_record(|record| {
            if record.take().is_some() {
                debug!("circuit breaker cleared after successful authentication");
                self.clear_persisted();
            }
        });
    }

    /// Force-closes the breaker regardless of cooldown.
    ///
    /// This is the administrative action used by recovery — not
    /// something ordinary sign-in flows should ever call.
    pub fn reset(&self) {
        self.with_record(|record| {
            if record.take().is_some() {
                info!("circuit breaker force-closed");
            }
            self.clear_persisted();
        });
    }

    /// Answers whether attempts are currently refused.
    ///
    /// Cooldown expiry is observed here: the first status check after
    /// the cooldown elapses discards the record entirely, so the next
    /// failure starts a fresh count.
    pub fn status(&self) -> BreakerStatus {
        let now = unix_now();
        self.with_record(|record| match record {
            Some(rec)
                if rec.open_until_unix.is_some_and(|until| now >= until) =>
            {
                info!("circuit breaker cooldown elapsed, closing");
                *record = None;
                self.clear_persisted();
                BreakerStatus::closed()
            }
            Some(rec) => Self::status_of(rec, now),
            None => BreakerStatus::closed(),
        })
    }

    // -- Internals ---------------------------------------------------------

    fn status_of(rec: &BreakerRecord, now: i64) -> BreakerStatus {
        match rec.open_until_unix {
            Some(until) if now < until => BreakerStatus {
                open: true,
                reason: rec.reason.clone(),
                remaining_cooldown: Duration::from_secs((until - now) as u64),
            },
            _ => BreakerStatus::closed(),
        }
    }

    /// Runs `f` with the cached record, loading it from storage first if
    /// this is the first access of the page lifetime.
    fn with_record<R>(
        &self,
        f: impl FnOnce(&mut Option<BreakerRecord>) -> R,
    ) -> R {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !cache.loaded {
            cache.record = self.read_persisted();
            cache.loaded = true;
        }
        f(&mut cache.record)
    }

    fn read_persisted(&self) -> Option<BreakerRecord> {
        match self.storage.get(keys::BREAKER) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(rec) => Some(rec),
                Err(error) => {
                    warn!(%error, "discarding unreadable circuit breaker record");
                    self.clear_persisted();
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(%error, "storage unreadable, breaker starts closed");
                None
            }
        }
    }

    fn persist(&self, rec: &BreakerRecord) {
        // Serializing a plain record cannot fail; storage can.
        let raw = match serde_json::to_string(rec) {
            Ok(raw) => raw,
            Err(_) => return,
        };
        if let Err(error) = self.storage.set(keys::BREAKER, &raw) {
            warn!(%error, "breaker state not persisted, keeping in-memory only");
        }
    }

    fn clear_persisted(&self) {
        if let Err(error) = self.storage.remove(keys::BREAKER) {
            warn!(%error, "failed to remove persisted breaker record");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn breaker_with(
        storage: Arc<dyn StateStorage>,
        config: BreakerConfig,
    ) -> CircuitBreaker {
        CircuitBreaker::new(storage, config)
    }

    fn default_breaker() -> (Arc<MemoryStorage>, CircuitBreaker) {
        let storage = Arc::new(MemoryStorage::new());
        let breaker =
            breaker_with(storage.clone(), BreakerConfig::default());
        (storage, breaker)
    }

    // =====================================================================
    // Opening
    // =====================================================================

    #[test]
    fn test_record_failure_below_threshold_stays_closed() {
        let (_storage, breaker) = default_breaker();

        assert!(!breaker.record_failure("wrong password").open);
        assert!(!breaker.record_failure("wrong password").open);
        assert!(!breaker.status().open);
    }

    #[test]
    fn test_record_failure_at_threshold_opens() {
        let (_storage, breaker) = default_breaker();
        breaker.record_failure("wrong password");
        breaker.record_failure("wrong password");

        let status = breaker.record_failure("wrong password");

        assert!(status.open);
        assert_eq!(status.reason.as_deref(), Some("wrong password"));
        assert!(breaker.status().open);
    }

    #[test]
    fn test_open_breaker_reports_remaining_cooldown() {
        let (_storage, breaker) = default_breaker();
        for _ in 0..3 {
            breaker.record_failure("wrong password");
        }

        let status = breaker.status();

        assert!(status.open);
        assert!(status.remaining_cooldown > Duration::ZERO);
        assert!(status.remaining_cooldown <= Duration::from_secs(300));
    }

    #[test]
    fn test_failures_outside_window_restart_count() {
        // Pre-seed a record whose failures happened long ago. The next
        // failure must start a fresh count, not continue the old one.
        let (storage, breaker) = default_breaker();
        storage
            .set(
                keys::BREAKER,
                r#"{"failures":2,"last_failure_unix":1000,"open_until_unix":null,"reason":null}"#,
            )
            .unwrap();

        assert!(!breaker.record_failure("wrong password").open);
        assert!(!breaker.record_failure("wrong password").open);
        // Third consecutive recent failure opens as usual.
        assert!(breaker.record_failure("wrong password").open);
    }

    // =====================================================================
    // Closing
    // =====================================================================

    #[test]
    fn test_record_success_closes_and_resets_count() {
        let (_storage, breaker) = default_breaker();
        breaker.record_failure("wrong password");
        breaker.record_failure("wrong password");

        breaker.record_success();

        // The count restarted: two more failures are not enough.
        breaker.record_failure("wrong password");
        assert!(!breaker.record_failure("wrong password").open);
    }

    #[test]
    fn test_record_success_closes_open_breaker() {
        let (_storage, breaker) = default_breaker();
        for _ in 0..3 {
            breaker.record_failure("wrong password");
        }
        assert!(breaker.status().open);

        breaker.record_success();

        assert!(!breaker.status().open);
    }

    #[test]
    fn test_reset_force_closes_regardless_of_cooldown() {
        let (_storage, breaker) = default_breaker();
        for _ in 0..3 {
            breaker.record_failure("wrong password");
        }

        breaker.reset();

        assert!(!breaker.status().open);
    }

    #[test]
    fn test_cooldown_expiry_closes_lazily() {
        // With a zero cooldown the breaker is already expired by the
        // time status() looks, and must self-heal.
        let storage = Arc::new(MemoryStorage::new());
        let breaker = breaker_with(
            storage,
            BreakerConfig {
                cooldown: Duration::ZERO,
                ..BreakerConfig::default()
            },
        );
        for _ in 0..3 {
            breaker.record_failure("wrong password");
        }

        assert!(!breaker.status().open);
        // And the record is gone: the next failure starts fresh.
        assert!(!breaker.record_failure("wrong password").open);
    }

    // =====================================================================
    // Persistence
    // =====================================================================

    #[test]
    fn test_open_breaker_survives_reload() {
        // A "reload" is a brand-new breaker over the same storage.
        let (storage, breaker) = default_breaker();
        for _ in 0..3 {
            breaker.record_failure("wrong password");
        }

        let reloaded =
            breaker_with(storage, BreakerConfig::default());

        let status = reloaded.status();
        assert!(status.open, "reload must not reset an open breaker");
        assert_eq!(status.reason.as_deref(), Some("wrong password"));
    }

    #[test]
    fn test_unreadable_record_discarded() {
        let (storage, breaker) = default_breaker();
        storage.set(keys::BREAKER, "not json").unwrap();

        assert!(!breaker.status().open);
        assert_eq!(storage.get(keys::BREAKER).unwrap(), None);
    }

    #[test]
    fn test_storage_write_failure_degrades_to_memory() {
        /// Storage that accepts reads but refuses writes.
        struct ReadOnlyStorage;

        impl StateStorage for ReadOnlyStorage {
            fn get(&self, _key: &str) -> Result<Option<String>, crate::StorageError> {
                Ok(None)
            }
            fn set(&self, _key: &str, _value: &str) -> Result<(), crate::StorageError> {
                Err(crate::StorageError("read-only".into()))
            }
            fn remove(&self, _key: &str) -> Result<(), crate::StorageError> {
                Err(crate::StorageError("read-only".into()))
            }
        }

        let breaker = breaker_with(
            Arc::new(ReadOnlyStorage),
            BreakerConfig::default(),
        );
        for _ in 0..3 {
            breaker.record_failure("wrong password");
        }

        // Still opens: in-memory state is authoritative for this page.
        assert!(breaker.status().open);
    }

    // =====================================================================
    // Config validation
    // =====================================================================

    #[test]
    fn test_validated_clamps_zero_threshold() {
        let config = BreakerConfig {
            failure_threshold: 0,
            ..BreakerConfig::default()
        }
        .validated();
        assert_eq!(config.failure_threshold, 1);
    }
}
