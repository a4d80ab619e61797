//! Error type for the storage seam.

/// Persisted client storage was unavailable or refused the operation.
///
/// Browser storage can be disabled, full, or blocked by privacy modes,
/// and it fails synchronously when it fails at all. Every consumer of
/// [`StateStorage`](crate::StateStorage) must treat this as a degraded
/// mode to work through, never a reason to crash.
#[derive(Debug, Clone, thiserror::Error)]
#[error("storage unavailable: {0}")]
pub struct StorageError(pub String);
