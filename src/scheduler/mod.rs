//! Build scheduler with a single worker.
//!
//! Every rebuild goes through one dedicated thread, so builds never overlap:
//!
//! ```text
//!            mark_dirty()                 debounce elapsed
//!   IDLE ───────────────▶ IDLE + pending ──────────────────▶ BUILDING
//!    ▲                                                          │
//!    │      pending empty           builders return, epoch++    │
//!    └──────────────────────────────────────────────────────────┤
//!                                   pending nonempty            │
//!                         BUILDING ◀────────────────────────────┘
//! ```
//!
//! Changes that arrive while a build runs collect in a fresh pending set and
//! produce exactly one follow-up build. The debounce window is anchored at
//! the first change of a burst, so a steady stream of events cannot postpone
//! a build forever.

mod builder;
mod pending;


pub use builder::Builder;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::EpochBroadcaster;
use crate::watch::WatchedRoot;
use crate::{debug, debug_do, log, warn};
use pending::{DrainedChanges, PendingChangeSet};

/// Default delay between the first change of a burst and the build.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Worker phase, observable for status and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Building,
}

/// Serializes rebuilds and advances the epoch after each one.
pub struct BuildScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    state: Mutex<SchedulerState>,
    /// Signalled on new changes and on shutdown.
    wake: Condvar,
    epoch: Arc<EpochBroadcaster>,
    debounce: Duration,
}

struct SchedulerState {
    pending: PendingChangeSet,
    /// When the oldest pending change arrived; `Some` iff `pending` is nonempty.
    first_change: Option<Instant>,
    phase: Phase,
    completed: u64,
    shutdown: bool,
}

impl BuildScheduler {
    pub fn new(epoch: Arc<EpochBroadcaster>, debounce: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState {
                    pending: PendingChangeSet::default(),
                    first_change: None,
                    phase: Phase::Idle,
                    completed: 0,
                    shutdown: false,
                }),
                wake: Condvar::new(),
                epoch,
                debounce,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the build worker. Calling it again is a no-op.
    pub fn start(&self) -> std::io::Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("docserve-build".into())
            .spawn(move || shared.run_worker())?;
        *worker = Some(handle);
        Ok(())
    }

    /// Record a change under `root`. Its builders run in the next cycle.
    pub fn mark_dirty(&self, root: WatchedRoot) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return;
        }

        if state.pending.is_empty() {
            state.first_change = Some(Instant::now());
        }
        state.pending.insert(root);
        drop(state);

        self.shared.wake.notify_all();
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    /// Number of finished build cycles (successful or not).
    pub fn completed_builds(&self) -> u64 {
        self.shared.state.lock().completed
    }

    /// Number of roots waiting for the next cycle.
    #[cfg(test)]
    pub(crate) fn pending_roots(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Stop the worker after the in-flight build (if any). Pending changes
    /// are discarded.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.pending.clear();
            state.first_change = None;
        }
        self.shared.wake.notify_all();
    }

    /// Wait for the worker thread to exit. Call after [`shutdown`](Self::shutdown).
    pub fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("build"; "build worker exited abnormally");
        }
    }
}

impl Shared {
    fn run_worker(&self) {
        debug!("build"; "worker started");
        while let Some(changes) = self.next_batch() {
            self.build(&changes);
        }
        debug!("build"; "worker stopped");
    }

    /// Block until a batch is due (debounce elapsed) or shutdown.
    fn next_batch(&self) -> Option<DrainedChanges> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }

            let Some(first_change) = state.first_change else {
                self.wake.wait(&mut state);
                continue;
            };

            let due = first_change + self.debounce;
            if Instant::now() >= due {
                state.first_change = None;
                state.phase = Phase::Building;
                return Some(state.pending.drain());
            }

            // Spurious or early wakeups just re-check.
            self.wake.wait_until(&mut state, due);
        }
    }

    /// Run every distinct builder of the batch, then advance the epoch.
    ///
    /// The epoch advances even when a builder fails, so waiting browsers are
    /// released and show whatever the failed build left on disk.
    fn build(&self, changes: &DrainedChanges) {
        debug_do! {
            for path in changes.paths() {
                debug!("build"; "detected changes in {}", path.display());
            }
        }

        let started = Instant::now();
        let mut failures = 0usize;
        for builder in changes.builders() {
            if let Err(e) = builder.run() {
                failures += 1;
                warn!("build"; "`{}` failed: {:#}", builder.name(), e);
            }
        }

        // Counted before the epoch moves: anyone woken by the advance already
        // sees this cycle as completed.
        {
            let mut state = self.state.lock();
            state.phase = Phase::Idle;
            state.completed += 1;
        }
        let epoch = self.epoch.advance();

        let elapsed = started.elapsed().as_millis();
        if failures == 0 {
            log!("build"; "rebuilt in {}ms, reloading browsers (epoch {})", elapsed, epoch);
        } else {
            log!("build"; "build finished with errors in {}ms, reloading browsers (epoch {})", elapsed, epoch);
        }
    }
}
