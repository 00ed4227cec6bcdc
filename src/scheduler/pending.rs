use std::path::Path;

use super::builder::{Builder, dedup_builders};
use crate::watch::WatchedRoot;

/// Roots with changes not yet picked up by a build.
///
/// Keyed by root path: marking a root twice keeps one entry (refreshed with
/// the latest snapshot of its builders).
#[derive(Debug, Default)]
pub(super) struct PendingChangeSet {
    roots: Vec<WatchedRoot>,
}

impl PendingChangeSet {
    pub(super) fn insert(&mut self, root: WatchedRoot) {
        match self.roots.iter_mut().find(|r| r.path() == root.path()) {
            Some(existing) => *existing = root,
            None => self.roots.push(root),
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub(super) fn len(&self) -> usize {
        self.roots.len()
    }

    pub(super) fn clear(&mut self) {
        self.roots.clear();
    }

    /// Take every pending root, leaving a fresh empty set behind.
    pub(super) fn drain(&mut self) -> DrainedChanges {
        DrainedChanges {
            roots: std::mem::take(&mut self.roots),
        }
    }
}

/// The roots reconciled by one build cycle.
#[derive(Debug)]
pub(super) struct DrainedChanges {
    roots: Vec<WatchedRoot>,
}

impl DrainedChanges {
    /// Distinct builders across all drained roots, first-registered first.
    pub(super) fn builders(&self) -> Vec<Builder> {
        dedup_builders(self.roots.iter().flat_map(WatchedRoot::builders))
    }

    pub(super) fn paths(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(WatchedRoot::path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_insert_dedups_by_path() {
        let builder = Builder::new(|| Ok(()));
        let mut pending = PendingChangeSet::default();
        pending.insert(WatchedRoot::new(PathBuf::from("/docs"), builder.clone()));
        pending.insert(WatchedRoot::new(PathBuf::from("/docs"), builder.clone()));
        pending.insert(WatchedRoot::new(PathBuf::from("/theme"), builder));
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_drain_leaves_fresh_set_and_dedups_builders() {
        let shared = Builder::named("shared", || Ok(()));
        let extra = Builder::named("extra", || Ok(()));

        let mut theme = WatchedRoot::new(PathBuf::from("/theme"), shared.clone());
        theme.add(extra);

        let mut pending = PendingChangeSet::default();
        pending.insert(WatchedRoot::new(PathBuf::from("/docs"), shared));
        pending.insert(theme);

        let drained = pending.drain();
        assert!(pending.is_empty());

        let names: Vec<_> = drained.builders().iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names, ["shared", "extra"]);
        assert_eq!(drained.paths().count(), 2);
    }
}
