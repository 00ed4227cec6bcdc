//! Site generation counter with wait/notify semantics.
//!
//! The epoch is the only state shared between the build side (sole writer)
//! and the serving side (readers and long-poll waiters). Counter, closed flag
//! and waiters all live behind one mutex + condvar pair, so a waiter that
//! checks after an `advance()` already happened never blocks.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant, SystemTime};

/// Monotonic epoch counter shared by the build worker and HTTP handlers.
#[derive(Debug)]
pub struct EpochBroadcaster {
    state: Mutex<EpochState>,
    changed: Condvar,
}

#[derive(Debug)]
struct EpochState {
    epoch: u64,
    /// Set at shutdown: every waiter returns immediately.
    closed: bool,
}

/// A blocked long-poll request: the epoch it saw and when it gives up.
#[derive(Debug, Clone, Copy)]
struct PollWaiter {
    observed: u64,
    deadline: Option<Instant>,
}

impl PollWaiter {
    fn new(observed: u64, timeout: Duration) -> Self {
        Self {
            observed,
            deadline: Instant::now().checked_add(timeout),
        }
    }

    fn is_released(&self, state: &EpochState) -> bool {
        state.closed || state.epoch != self.observed
    }
}

impl Default for EpochBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochBroadcaster {
    /// Create a broadcaster starting at a wall-clock derived epoch.
    ///
    /// Starting from the current time (in milliseconds) keeps the value
    /// nonzero, and a browser tab left open across a server restart sees a
    /// different epoch on its next poll and reloads.
    pub fn new() -> Self {
        Self::starting_at(initial_epoch())
    }

    /// Create a broadcaster starting at `epoch` (clamped to at least 1, so the
    /// sentinel 0 is always stale).
    pub fn starting_at(epoch: u64) -> Self {
        Self {
            state: Mutex::new(EpochState {
                epoch: epoch.max(1),
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Latest epoch. Non-blocking apart from the short state lock.
    pub fn current(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Increment the epoch by exactly one and wake every waiter.
    ///
    /// Returns the new epoch.
    pub fn advance(&self) -> u64 {
        let epoch = {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.epoch
        };
        self.changed.notify_all();
        epoch
    }

    /// Block until the epoch differs from `baseline` or `timeout` elapses.
    ///
    /// Returns the epoch at wake-up time, which equals `baseline` on timeout.
    /// Returns immediately once the broadcaster is closed.
    pub fn wait_until_changed(&self, baseline: u64, timeout: Duration) -> u64 {
        let waiter = PollWaiter::new(baseline, timeout);
        let mut state = self.state.lock();

        while !waiter.is_released(&state) {
            match waiter.deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }

        state.epoch
    }

    /// Release all present and future waiters. Used at shutdown.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_all();
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Milliseconds since the Unix epoch, never zero.
fn initial_epoch() -> u64 {
    let millis = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(1);
    u64::try_from(millis).unwrap_or(u64::MAX / 2).max(1)
}
