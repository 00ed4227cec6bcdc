//! Rebuild callbacks.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{Result, anyhow};

type BuildFn = dyn Fn() -> Result<()> + Send + Sync;

/// An opaque, caller-owned rebuild callback.
///
/// Cloning shares the callback: clones compare equal under [`Builder::same_as`],
/// which is how roots sharing a builder collapse into a single build.
#[derive(Clone)]
pub struct Builder {
    name: Arc<str>,
    func: Arc<BuildFn>,
}

impl Builder {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::named("build", func)
    }

    /// A builder with a display name used in build logs.
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity comparison: true only for clones of the same builder.
    pub fn same_as(&self, other: &Builder) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.func), Arc::as_ptr(&other.func))
    }

    /// Run the callback, turning a panic into an error.
    pub fn run(&self) -> Result<()> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)())) {
            Ok(result) => result,
            Err(payload) => Err(anyhow!(
                "builder panicked: {}",
                crate::utils::panic_message(payload.as_ref())
            )),
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("name", &self.name)
            .field("func", &Arc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}

/// Keep the first occurrence of every distinct builder, in order.
pub(crate) fn dedup_builders<'a>(builders: impl IntoIterator<Item = &'a Builder>) -> Vec<Builder> {
    let mut unique: Vec<Builder> = Vec::new();
    for builder in builders {
        if !unique.iter().any(|b| b.same_as(builder)) {
            unique.push(builder.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let a = Builder::new(|| Ok(()));
        let b = Builder::new(|| Ok(()));
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_run_reports_error() {
        let builder = Builder::named("failing", || anyhow::bail!("broken nav"));
        let err = builder.run().unwrap_err();
        assert_eq!(err.to_string(), "broken nav");
        assert_eq!(builder.name(), "failing");
    }

    #[test]
    fn test_run_catches_panic() {
        let builder = Builder::new(|| panic!("theme missing"));
        let err = builder.run().unwrap_err();
        assert!(err.to_string().contains("theme missing"));
    }

    #[test]
    fn test_release_profile_unwinds() {
        let manifest: toml::Table = include_str!("../../Cargo.toml").parse().unwrap();
        let panic = manifest
            .get("profile")
            .and_then(|p| p.get("release"))
            .and_then(|r| r.get("panic"))
            .and_then(|v| v.as_str());
        // `catch_unwind` cannot contain anything under abort.
        assert_ne!(panic, Some("abort"));
    }

    #[test]
    fn test_dedup_keeps_order() {
        let a = Builder::named("a", || Ok(()));
        let b = Builder::named("b", || Ok(()));
        let list = [a.clone(), b.clone(), a.clone(), b];
        let unique = dedup_builders(&list);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name(), "a");
        assert_eq!(unique[1].name(), "b");
    }
}
