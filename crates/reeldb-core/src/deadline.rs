//! Caller-supplied deadline / cancellation signal.
//!
//! Checked at orchestrator iteration boundaries and before blocking external
//! calls, so a long-running search can be aborted between iterations without
//! corrupting accumulated state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// A deadline that never fires (but can still be cancelled).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal cancellation from another task. Observed at the next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn expired(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_observed_across_clones() {
        let d = Deadline::none();
        let d2 = d.clone();
        assert!(!d2.expired());
        d.cancel();
        assert!(d2.expired());
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.expired());
    }
}
