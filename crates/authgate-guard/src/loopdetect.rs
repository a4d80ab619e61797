//! The redirect-loop detector.
//!
//! A route guard that sends unauthenticated users to login, plus a login
//! page that sends authenticated users home, can oscillate forever if
//! the underlying session determination itself oscillates (as it does
//! briefly during a token refresh). Each side believes it is doing the
//! right thing; together they are a storm. The detector is the backstop:
//! it counts redirects in a short sliding window and, past a threshold,
//! tells the caller to stop redirecting and show a manual affordance
//! instead.
//!
//! State is tab-lifetime only — a reload clears it, which is exactly
//! right, because a reload breaks the loop anyway.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable limits for loop detection.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Redirects inside the window that count as a loop.
    pub redirect_threshold: usize,

    /// The sliding window redirects are counted in.
    pub window: Duration,

    /// A gap this long with no redirects discards all history at once.
    /// Longer than `window`, so it only matters for bookkeeping — any
    /// entry older than the window has already stopped counting.
    pub quiet_period: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            redirect_threshold: 5,
            window: Duration::from_secs(5),
            quiet_period: Duration::from_secs(25),
        }
    }
}

/// A read-only snapshot for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStatus {
    /// Redirects currently inside the window.
    pub recent_redirects: usize,

    /// Whether the next redirect would be suppressed.
    pub flagged: bool,
}

// ---------------------------------------------------------------------------
// The detector
// ---------------------------------------------------------------------------

/// Counts navigation redirects in a sliding time window.
///
/// One instance per tab, shared as an `Arc` between every route guard
/// and the recovery path. The guards are the only writers (via
/// [`record_redirect`](Self::record_redirect)); recovery may
/// [`reset`](Self::reset).
pub struct LoopDetector {
    config: LoopConfig,
    /// Instants of recent redirects, oldest first. Pruned lazily on
    /// every call — no scheduled timer to leak or cancel.
    hits: Mutex<Vec<Instant>>,
}

impl LoopDetector {
    /// Creates a detector with the given limits.
    pub fn new(config: LoopConfig) -> Self {
        Self {
            config,
            hits: Mutex::new(Vec::new()),
        }
    }

    /// Records that a redirect is about to be issued.
    ///
    /// Returns `true` if this redirect completes a loop — in which case
    /// the caller must NOT perform it, and should surface a static
    /// recovery affordance instead.
    pub fn record_redirect(&self) -> bool {
        let now = Instant::now();
        let mut hits = self
            .hits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // A long quiet stretch wipes the slate entirely.
        if let Some(last) = hits.last() {
            if now.duration_since(*last) >= self.config.quiet_period {
                hits.clear();
            }
        }

        // Slide the window: only recent redirects count.
        hits.retain(|hit| now.duration_since(*hit) <= self.config.window);
        hits.push(now);

        let detected = hits.len() >= self.config.redirect_threshold;
        if detected {
            warn!(
                redirects = hits.len(),
                window_secs = self.config.window.as_secs(),
                "redirect loop detected, suppressing navigation"
            );
        } else {
            debug!(redirects = hits.len(), "redirect recorded");
        }
        detected
    }

    /// Read-only view of the current window, without recording anything.
    pub fn status(&self) -> LoopStatus {
        let now = Instant::now();
        let hits = self
            .hits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let recent = hits
            .iter()
            .filter(|hit| now.duration_since(**hit) <= self.config.window)
            .count();
        LoopStatus {
            recent_redirects: recent,
            flagged: recent >= self.config.redirect_threshold,
        }
    }

    /// Discards all redirect history. Used by recovery.
    pub fn reset(&self) {
        self.hits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(LoopConfig::default())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Time-dependent behavior is tested with the paused Tokio clock:
    //! `advance` moves time forward deterministically, so "six seconds
    //! later" costs nothing and never flakes.

    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_record_redirect_fifth_within_window_detects_loop() {
        let detector = LoopDetector::default();

        for i in 1..=4 {
            assert!(
                !detector.record_redirect(),
                "redirect {i} should not flag"
            );
            advance(Duration::from_millis(500)).await;
        }

        // Fifth redirect, two seconds in: loop.
        assert!(detector.record_redirect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_redirect_after_quiet_gap_does_not_detect() {
        let detector = LoopDetector::default();

        for _ in 0..4 {
            assert!(!detector.record_redirect());
            advance(Duration::from_millis(200)).await;
        }

        // Six seconds of quiet: the old redirects fall out of the window.
        advance(Duration::from_secs(6)).await;

        assert!(!detector.record_redirect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_redirects_never_accumulate() {
        // One redirect every four seconds keeps at most two in any
        // five-second window — never a loop, no matter how long it runs.
        let detector = LoopDetector::default();

        for _ in 0..20 {
            assert!(!detector.record_redirect());
            advance(Duration::from_secs(4)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_without_recording() {
        let detector = LoopDetector::default();
        detector.record_redirect();
        detector.record_redirect();

        let status = detector.status();

        assert_eq!(status.recent_redirects, 2);
        assert!(!status.flagged);
        // status() itself did not count as a redirect.
        assert_eq!(detector.status().recent_redirects, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_history() {
        let detector = LoopDetector::default();
        for _ in 0..4 {
            detector.record_redirect();
        }

        detector.reset();

        assert_eq!(detector.status().recent_redirects, 0);
        assert!(!detector.record_redirect());
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_configurable() {
        let detector = LoopDetector::new(LoopConfig {
            redirect_threshold: 2,
            ..LoopConfig::default()
        });

        assert!(!detector.record_redirect());
        assert!(detector.record_redirect());
    }
}
