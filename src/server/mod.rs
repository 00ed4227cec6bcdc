//! Live-reload server: wires the epoch, build scheduler, watchers and HTTP
//! side together and owns their threads.
//!
//! ```text
//!   notify ──▶ WatchCoordinator ──mark_dirty──▶ BuildScheduler ──advance──▶ EpochBroadcaster
//!                                                                              │
//!   browser ◀──────────── ContentServer (one thread per request) ◀──wait──────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let server = LiveReloadServer::new(ServerOptions { root: "site".into(), ..Default::default() });
//! server.watch("docs", Builder::named("mkdocs", || run_mkdocs()));
//! let addr = server.start()?;
//! // ...
//! server.shutdown();
//! ```

mod error;
mod lifecycle;


pub use error::ServeError;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tiny_http::Server;

use crate::core::EpochBroadcaster;
use crate::scheduler::{BuildScheduler, Builder, DEFAULT_DEBOUNCE};
use crate::serve::{self, ContentServer};
use crate::watch::WatchCoordinator;
use crate::{debug, log, warn};

/// Settings fixed at construction.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub interface: IpAddr,
    /// First port tried; 0 picks any free port.
    pub port: u16,
    /// Directory served over HTTP.
    pub root: PathBuf,
    pub debounce: Duration,
    /// Upper bound on a single long-poll wait.
    pub poll_timeout: Duration,
    /// Client retry delay after a failed poll.
    pub poll_interval: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            root: PathBuf::from("."),
            debounce: DEFAULT_DEBOUNCE,
            poll_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

enum Lifecycle {
    Idle,
    Running {
        http: Arc<Server>,
        addr: SocketAddr,
        acceptor: Option<JoinHandle<()>>,
    },
    Stopped,
}

pub struct LiveReloadServer {
    options: ServerOptions,
    epoch: Arc<EpochBroadcaster>,
    scheduler: Arc<BuildScheduler>,
    watcher: WatchCoordinator,
    content: Arc<ContentServer>,
    lifecycle: Mutex<Lifecycle>,
}

impl LiveReloadServer {
    pub fn new(options: ServerOptions) -> Self {
        let epoch = Arc::new(EpochBroadcaster::new());
        let scheduler = Arc::new(BuildScheduler::new(Arc::clone(&epoch), options.debounce));
        let watcher = WatchCoordinator::new(Arc::clone(&scheduler));
        let content = Arc::new(ContentServer::new(
            options.root.clone(),
            Arc::clone(&epoch),
            options.poll_timeout,
            options.poll_interval,
        ));

        Self {
            options,
            epoch,
            scheduler,
            watcher,
            content,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Run `builder` whenever anything under `path` changes.
    ///
    /// Works before and after [`start`](Self::start).
    pub fn watch(&self, path: impl AsRef<Path>, builder: Builder) {
        self.watcher.watch(path.as_ref(), builder);
    }

    /// Install the error page hook. `Ok(None)` from it selects the built-in page.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(u16) -> anyhow::Result<Option<Vec<u8>>> + Send + Sync + 'static,
    {
        self.content.set_error_handler(Some(Arc::new(handler)));
    }

    pub fn epoch(&self) -> &Arc<EpochBroadcaster> {
        &self.epoch
    }

    pub fn scheduler(&self) -> &BuildScheduler {
        &self.scheduler
    }

    pub fn root(&self) -> &Path {
        self.content.root()
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.lifecycle.lock() {
            Lifecycle::Running { addr, .. } => Some(*addr),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<String> {
        self.local_addr().map(|addr| format!("http://{addr}/"))
    }

    /// Bind the socket, start watchers and the build worker, then accept
    /// connections on a background thread. Returns the bound address.
    ///
    /// A failure part-way through tears down whatever was started.
    pub fn start(&self) -> Result<SocketAddr, ServeError> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running { .. } => return Err(ServeError::AlreadyRunning),
            Lifecycle::Stopped => return Err(ServeError::ShutDown),
        }

        let (http, addr) = lifecycle::bind_with_retry(self.options.interface, self.options.port)?;
        let http = Arc::new(http);
        *lifecycle = Lifecycle::Running {
            http: Arc::clone(&http),
            addr,
            acceptor: None,
        };

        match self.launch(&http) {
            Ok(acceptor) => {
                if let Lifecycle::Running { acceptor: slot, .. } = &mut *lifecycle {
                    *slot = Some(acceptor);
                }
            }
            Err(e) => {
                drop(lifecycle);
                self.shutdown();
                return Err(e);
            }
        }

        log!("serve"; "serving {} on http://{}/", self.root().display(), addr);
        Ok(addr)
    }

    fn launch(&self, http: &Arc<Server>) -> Result<JoinHandle<()>, ServeError> {
        self.scheduler
            .start()
            .map_err(|e| ServeError::start("build worker", e))?;
        self.watcher
            .start()
            .map_err(|e| ServeError::start("file watcher", e))?;

        let http = Arc::clone(http);
        let content = Arc::clone(&self.content);
        thread::Builder::new()
            .name("docserve-accept".into())
            .spawn(move || serve::run_request_loop(&http, &content))
            .map_err(|e| ServeError::start("request loop", e))
    }

    /// Stop accepting, release long-polls, stop watchers and the build
    /// worker (after its in-flight build), and join every thread.
    ///
    /// Idempotent, and safe after a failed [`start`](Self::start).
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);

        let (http, acceptor) = match previous {
            Lifecycle::Running { http, acceptor, .. } => (Some(http), acceptor),
            Lifecycle::Idle | Lifecycle::Stopped => (None, None),
        };
        let was_running = http.is_some();

        if let Some(http) = &http {
            http.unblock();
        }
        self.epoch.close();
        self.watcher.stop();
        self.scheduler.shutdown();
        self.scheduler.join();

        if let Some(acceptor) = acceptor
            && acceptor.join().is_err()
        {
            warn!("serve"; "request loop exited abnormally");
        }
        // Last handle: the listening socket closes here.
        drop(http);

        if was_running {
            debug!(
                "serve";
                "server stopped after {} builds",
                self.scheduler.completed_builds()
            );
        }
    }
}

impl Drop for LiveReloadServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
