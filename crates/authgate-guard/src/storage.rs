//! The persisted client storage seam.
//!
//! Authgate does not know whether it is running against browser
//! `localStorage`, a file, or a test HashMap. It only needs synchronous,
//! fallible key-value access — the [`StateStorage`] trait is that
//! contract. Host applications implement it once; everything in
//! Authgate that persists state goes through it.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::StorageError;

/// The storage keys this system owns.
///
/// Single-writer rule: each key has exactly one writing component — the
/// session store writes the session and profile keys, the circuit
/// breaker writes its own record. Everyone else may only read. The
/// recovery path is the one exception: it purges all of
/// [`OWNED`](keys::OWNED) at once.
pub mod keys {
    /// The current session record (JSON), written by the session store.
    pub const SESSION_RECORD: &str = "authgate.session";

    /// The cached profile for the signed-in user (JSON), written by the
    /// session store alongside the record.
    pub const PROFILE_CACHE: &str = "authgate.profile";

    /// The circuit breaker record (JSON), written by the breaker.
    pub const BREAKER: &str = "authgate.breaker";

    /// Every key this system owns, in purge order.
    pub const OWNED: &[&str] = &[SESSION_RECORD, PROFILE_CACHE, BREAKER];
}

/// Synchronous fallible key-value storage.
///
/// # Contract
///
/// - Operations are synchronous and may fail ([`StorageError`]) —
///   callers must handle failure, never panic on it.
/// - `get` of an absent key is `Ok(None)`, not an error.
/// - `remove` of an absent key is `Ok(())` — purging is idempotent.
///
/// # Trait bounds
///
/// `Send + Sync` because the storage handle is shared across the store
/// actor, the breaker, and the recovery path as an `Arc<dyn StateStorage>`.
pub trait StateStorage: Send + Sync {
    /// Reads the value at `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` at `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes the value at `key` if present.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`StateStorage`] backed by a mutexed `HashMap`.
///
/// Ships in the library (not just tests) because native hosts and demos
/// need a working storage without a browser, and tests need a cheap one.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError("storage mutex poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError("storage mutex poisoned".into()))?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError("storage mutex poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}
