//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"        # Network interface (127.0.0.1 = localhost only)
//! port = 8000                    # First port tried; the next free one is used if taken
//! root = "site"                  # Directory served over HTTP (builder output)
//! watch = ["docs"]               # Directories that trigger a rebuild
//! build = ["mkdocs", "build"]    # Rebuild command; empty = serve only
//! debounce_ms = 300              # Quiet period collapsing a burst of edits
//! poll_timeout_secs = 60         # Longest a browser poll is held open
//! poll_interval_ms = 1000        # Browser retry delay after a failed poll
//! error_page = "404.html"        # File under `root` served for 404s ("" = built-in page)
//! ```
//!
//! Relative paths are resolved against the directory holding `docserve.toml`.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::server::ServerOptions;

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Served directory.
    pub root: PathBuf,

    /// Directories observed for changes.
    pub watch: Vec<PathBuf>,

    /// Rebuild command as argv (program first).
    pub build: Vec<String>,

    pub debounce_ms: u64,

    pub poll_timeout_secs: u64,

    pub poll_interval_ms: u64,

    /// Custom 404 page, relative to `root`. Empty disables it.
    pub error_page: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8000,
            root: PathBuf::from("site"),
            watch: vec![PathBuf::from("docs")],
            build: Vec::new(),
            debounce_ms: 300,
            poll_timeout_secs: 60,
            poll_interval_ms: 1000,
            error_page: PathBuf::from("404.html"),
        }
    }
}

/// Upper bound for `debounce_ms`; longer windows make the preview feel broken.
const MAX_DEBOUNCE_MS: u64 = 10_000;

impl ServeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The custom error page path, if one is configured.
    pub fn error_page_path(&self) -> Option<PathBuf> {
        (!self.error_page.as_os_str().is_empty()).then(|| self.root.join(&self.error_page))
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            interface: self.interface,
            port: self.port,
            root: self.root.clone(),
            debounce: self.debounce(),
            poll_timeout: self.poll_timeout(),
            poll_interval: self.poll_interval(),
        }
    }

    /// Check values that parse fine but cannot work. Paths must already be
    /// absolute (see `Config::finalize`).
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.poll_timeout_secs == 0 {
            diag.error("serve.poll_timeout_secs", "must be greater than 0");
        }
        if self.poll_interval_ms == 0 {
            diag.error("serve.poll_interval_ms", "must be greater than 0");
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            diag.error(
                "serve.debounce_ms",
                format!("must be at most {MAX_DEBOUNCE_MS}, got {}", self.debounce_ms),
            );
        }
        if self.build.first().is_some_and(|program| program.trim().is_empty()) {
            diag.error("serve.build", "program name is empty");
        }
        if self.error_page.is_absolute() {
            diag.error("serve.error_page", "must be relative to `serve.root`");
        }

        // A builder writing into a watched directory would trigger itself forever.
        if !self.build.is_empty()
            && let Some(dir) = self.watch.iter().find(|dir| self.root.starts_with(dir))
        {
            diag.error_with_hint(
                "serve.root",
                format!(
                    "`{}` lies inside the watched directory `{}`",
                    self.root.display(),
                    dir.display()
                ),
                "every build would trigger another; move the output elsewhere",
            );
        }
    }
}
