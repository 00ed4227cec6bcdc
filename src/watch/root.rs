use std::path::{Path, PathBuf};

use crate::scheduler::Builder;

/// A directory registered for change observation and the builders it triggers.
///
/// Only ever gains builders; duplicates (by identity) are ignored.
#[derive(Debug, Clone)]
pub struct WatchedRoot {
    path: PathBuf,
    builders: Vec<Builder>,
}

impl WatchedRoot {
    pub fn new(path: PathBuf, builder: Builder) -> Self {
        Self {
            path,
            builders: vec![builder],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn builders(&self) -> &[Builder] {
        &self.builders
    }

    /// Add a builder. Returns false if this exact builder is already registered.
    pub fn add(&mut self, builder: Builder) -> bool {
        if self.builders.iter().any(|b| b.same_as(&builder)) {
            return false;
        }
        self.builders.push(builder);
        true
    }

    /// Whether `path` is this root or lies beneath it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent_per_builder() {
        let builder = Builder::new(|| Ok(()));
        let other = Builder::new(|| Ok(()));

        let mut root = WatchedRoot::new(PathBuf::from("/docs"), builder.clone());
        assert!(!root.add(builder.clone()));
        assert!(root.add(other));
        assert_eq!(root.builders().len(), 2);
    }

    #[test]
    fn test_contains_is_component_based() {
        let root = WatchedRoot::new(PathBuf::from("/srv/docs"), Builder::new(|| Ok(())));
        assert!(root.contains(Path::new("/srv/docs")));
        assert!(root.contains(Path::new("/srv/docs/guide/index.md")));
        assert!(!root.contains(Path::new("/srv/docs-old/index.md")));
        assert!(!root.contains(Path::new("/srv")));
    }
}
