//! Thread-safe count of connected world sessions.
//!
//! # Read-consistency model
//!
//! Every connection task reads the count when it builds a directory response.
//! The value is loaded exactly once per response ([`LiveSessionCount::snapshot`])
//! so all entries of one directory carry the same occupancy, even if the count
//! changes while the body is being encoded.  Two responses built at the same
//! time may observe different values; that is acceptable for a status display.
//!
//! The counter uses an atomic rather than a lock so readers never block.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared, lock-free count of connected world sessions.
///
/// # Examples
///
/// ```rust
/// use broker_core::domain::sessions::LiveSessionCount;
///
/// let sessions = LiveSessionCount::new(2);
/// sessions.increment();
/// assert_eq!(sessions.snapshot(), 3);
/// assert_eq!(sessions.occupancy(), 3u16);
/// ```
#[derive(Debug, Default)]
pub struct LiveSessionCount {
    inner: AtomicUsize,
}

impl LiveSessionCount {
    /// Creates a counter starting at `initial`.
    pub fn new(initial: usize) -> Self {
        Self {
            inner: AtomicUsize::new(initial),
        }
    }

    /// Returns the current count.
    pub fn snapshot(&self) -> usize {
        self.inner.load(Ordering::Acquire)
    }

    /// Returns the current count clamped to the 16-bit occupancy field.
    pub fn occupancy(&self) -> u16 {
        u16::try_from(self.snapshot()).unwrap_or(u16::MAX)
    }

    /// Records a newly connected world session and returns the new count.
    pub fn increment(&self) -> usize {
        self.inner.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records a disconnected world session and returns the new count.
    ///
    /// Never goes below zero.
    pub fn decrement(&self) -> usize {
        let step_down = |n: usize| Some(n.saturating_sub(1));
        let previous = self
            .inner
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, step_down)
            .unwrap_or_else(|n| n);
        previous.saturating_sub(1)
    }

    /// Overwrites the count, e.g. after an external world-server report.
    pub fn set(&self, count: usize) {
        self.inner.store(count, Ordering::Release);
    }
}
