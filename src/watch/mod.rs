//! Watch coordinator
//!
//! Observes registered directories and hands dirty roots to the build scheduler.
//!
//! Architecture:
//! ```text
//! notify backend → WatchMsg channel → dispatcher thread → BuildScheduler::mark_dirty
//! ```
//!
//! Roots registered before `start()` are attached when it runs; roots
//! registered afterwards are attached on registration.

mod root;


pub use root::WatchedRoot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;

use crate::scheduler::{BuildScheduler, Builder};
use crate::utils::path::normalize_path;
use crate::{debug, warn};

/// Messages for the dispatcher thread.
enum WatchMsg {
    Event(notify::Result<notify::Event>),
    Stop,
}

/// Registry of watched roots plus the live watcher, once started.
pub struct WatchCoordinator {
    roots: Arc<RwLock<Vec<WatchedRoot>>>,
    scheduler: Arc<BuildScheduler>,
    running: Mutex<Option<Running>>,
}

struct Running {
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    attached: FxHashSet<PathBuf>,
    tx: Sender<WatchMsg>,
    dispatcher: JoinHandle<()>,
}

impl WatchCoordinator {
    pub fn new(scheduler: Arc<BuildScheduler>) -> Self {
        Self {
            roots: Arc::new(RwLock::new(Vec::new())),
            scheduler,
            running: Mutex::new(None),
        }
    }

    /// Register `builder` to run when anything under `path` changes.
    ///
    /// Registering the same (path, builder) pair twice is a no-op.
    pub fn watch(&self, path: &Path, builder: Builder) {
        let path = normalize_path(path);
        let is_new_root = {
            let mut roots = self.roots.write();
            match roots.iter_mut().find(|r| r.path() == path) {
                Some(existing) => {
                    existing.add(builder);
                    false
                }
                None => {
                    roots.push(WatchedRoot::new(path.clone(), builder));
                    true
                }
            }
        };

        if is_new_root && let Some(running) = self.running.lock().as_mut() {
            running.attach(&path);
        }
    }

    /// Snapshot of the registered roots.
    pub fn roots(&self) -> Vec<WatchedRoot> {
        self.roots.read().clone()
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Create the platform watcher, attach every registered root and spawn
    /// the dispatcher. Calling it again while running is a no-op.
    pub fn start(&self) -> anyhow::Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let (tx, rx) = channel::unbounded();
        let notify_tx = tx.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = notify_tx.send(WatchMsg::Event(res));
        })?;

        let roots = Arc::clone(&self.roots);
        let scheduler = Arc::clone(&self.scheduler);
        let dispatcher = thread::Builder::new()
            .name("docserve-watch".into())
            .spawn(move || dispatch(rx, &roots, &scheduler))?;

        let mut state = Running {
            watcher,
            attached: FxHashSet::default(),
            tx,
            dispatcher,
        };
        let paths: Vec<PathBuf> = self.roots.read().iter().map(|r| r.path().to_path_buf()).collect();
        for path in &paths {
            state.attach(path);
        }

        *running = Some(state);
        Ok(())
    }

    /// Detach every root and join the dispatcher. Safe to call when not running.
    pub fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };

        let Running {
            watcher,
            tx,
            dispatcher,
            ..
        } = running;

        // Dropping the watcher stops the backend from producing events.
        drop(watcher);
        let _ = tx.send(WatchMsg::Stop);
        if dispatcher.join().is_err() {
            warn!("watch"; "watch dispatcher exited abnormally");
        }
    }
}

impl Drop for WatchCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Running {
    /// Begin observing `path`. A root that cannot be observed is logged and
    /// skipped; the others keep working.
    fn attach(&mut self, path: &Path) {
        if self.attached.contains(path) {
            return;
        }
        match self.watcher.watch(path, RecursiveMode::Recursive) {
            Ok(()) => {
                debug!("watch"; "watching {}", path.display());
                self.attached.insert(path.to_path_buf());
            }
            Err(e) => warn!("watch"; "cannot watch {}: {}", path.display(), e),
        }
    }
}

fn dispatch(rx: Receiver<WatchMsg>, roots: &RwLock<Vec<WatchedRoot>>, scheduler: &BuildScheduler) {
    while let Ok(msg) = rx.recv() {
        match msg {
            WatchMsg::Event(Ok(event)) => route_event(&event, roots, scheduler),
            WatchMsg::Event(Err(e)) => warn!("watch"; "notify error: {}", e),
            WatchMsg::Stop => break,
        }
    }
}

/// Mark every root the event touches as dirty.
///
/// An event without paths (a backend rescan) dirties every root.
fn route_event(event: &notify::Event, roots: &RwLock<Vec<WatchedRoot>>, scheduler: &BuildScheduler) {
    if !is_content_change(&event.kind) {
        return;
    }

    debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

    let dirty: Vec<WatchedRoot> = roots
        .read()
        .iter()
        .filter(|root| event.paths.is_empty() || event.paths.iter().any(|p| root.contains(p)))
        .cloned()
        .collect();

    for root in dirty {
        scheduler.mark_dirty(root);
    }
}

/// Create, modify, remove and rename are content changes. Reads and
/// metadata-only modifications (mtime/atime/chmod) are not, otherwise a
/// builder that merely reads its sources would trigger itself.
fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Any | EventKind::Other => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) => false,
    }
}
