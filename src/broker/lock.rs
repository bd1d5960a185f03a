//! Global FIFO lock for state-mutating operations.
//!
//! Every operation that reads or writes session state runs inside one
//! [`LockGuard`] scope. Waiters are served strictly in the order they called
//! [`AsyncLock::lock`], and an operation that fails simply drops its guard,
//! so the next waiter proceeds.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

// ============================================================================
// AsyncLock
// ============================================================================

/// FIFO critical-section queue.
///
/// Backed by tokio's fair mutex, which never poisons. The guard may be held
/// across `.await`; later submissions wait behind it.
#[derive(Default)]
pub struct AsyncLock {
    /// Fair queue of critical sections.
    queue: Mutex<()>,
    /// Next submission ticket.
    next_ticket: AtomicU64,
}

impl AsyncLock {
    /// Creates an unlocked queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for this caller's turn and enters the critical section.
    ///
    /// The section ends when the returned guard is dropped.
    pub async fn lock(&self) -> LockGuard<'_> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        trace!(ticket, "Queued for broker lock");

        let guard = self.queue.lock().await;
        trace!(ticket, "Entered broker lock");

        LockGuard {
            _guard: guard,
            ticket,
        }
    }

    /// Returns `true` if a critical section is currently running.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.queue.try_lock().is_err()
    }
}

impl fmt::Debug for AsyncLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLock")
            .field("locked", &self.is_locked())
            .field("next_ticket", &self.next_ticket.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================================================
// LockGuard
// ============================================================================

/// Proof of being inside the broker's critical section.
///
/// Session table mutators take `&LockGuard` so they cannot be called
/// outside a locked section.
pub struct LockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    ticket: u64,
}

impl LockGuard<'_> {
    /// Returns the submission ticket of this section.
    ///
    /// Tickets increase in submission order.
    #[inline]
    #[must_use]
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        trace!(ticket = self.ticket, "Left broker lock");
    }
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("ticket", &self.ticket)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
