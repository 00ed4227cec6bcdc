//! HTTP content server with live reload support.
//!
//! Routes:
//!
//! | Path                          | Response                                  |
//! |-------------------------------|-------------------------------------------|
//! | `/js/livereload.js`           | embedded client script                    |
//! | `/livereload/{epoch}/{id}`    | decimal epoch, immediately or after a wait |
//! | anything else                 | file under the root, HTML gets the script |
//!
//! Every failure goes through the error hook and is logged with the request line.

mod content;
mod error;
mod path;
mod poll;
mod response;

#[cfg(test)]
mod tests;

pub use error::ErrorHandler;
pub use response::Reply;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tiny_http::{Method, Request, Server};

use crate::core::EpochBroadcaster;
use crate::embed::serve::LIVERELOAD_JS;
use crate::utils::mime::{self, types};
use crate::{debug, warn};
use error::ErrorHook;
use path::Resolved;
use poll::{ConnectedTabs, PollRequest};

/// URL of the embedded client script.
pub const SCRIPT_PATH: &str = "/js/livereload.js";

/// The parts of a request the router needs.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub url: String,
    /// `METHOD URL HTTP/x.y`, used in logs.
    pub line: String,
    pub referer: Option<String>,
}

impl RequestInfo {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            line: format!("{method} {url} HTTP/1.1"),
            method,
            url,
            referer: None,
        }
    }

    pub fn from_request(request: &Request) -> Self {
        let version = request.http_version();
        let referer = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Referer"))
            .map(|h| h.value.to_string());
        Self {
            method: request.method().clone(),
            url: request.url().to_string(),
            line: format!(
                "{} {} HTTP/{}.{}",
                request.method(),
                request.url(),
                version.0,
                version.1
            ),
            referer,
        }
    }
}

/// Serves the built site, the client script and the long-poll endpoint.
pub struct ContentServer {
    root: PathBuf,
    epoch: Arc<EpochBroadcaster>,
    poll_timeout: Duration,
    poll_interval: Duration,
    error_hook: ArcSwapOption<ErrorHook>,
    tabs: ConnectedTabs,
}

impl ContentServer {
    pub fn new(
        root: PathBuf,
        epoch: Arc<EpochBroadcaster>,
        poll_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            root,
            epoch,
            poll_timeout,
            poll_interval,
            error_hook: ArcSwapOption::empty(),
            tabs: ConnectedTabs::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Install (or with `None`, remove) the error page hook. Takes effect
    /// for the next error response.
    pub fn set_error_handler(&self, handler: Option<Arc<ErrorHandler>>) {
        self.error_hook
            .store(handler.map(|h| Arc::new(ErrorHook::new(h))));
    }

    /// Compute the response for a request. May block on a long poll.
    pub fn route(&self, req: &RequestInfo) -> Reply {
        if !matches!(req.method, Method::Get | Method::Head) {
            return self.error(req, 501);
        }

        let (path, _) = path::split_url(&req.url);
        if path == SCRIPT_PATH {
            return Reply::ok(types::JAVASCRIPT, LIVERELOAD_JS.as_bytes().to_vec());
        }
        if let Some(poll) = poll::parse_poll(path) {
            return self.poll(req, &poll);
        }

        match path::resolve_path(&req.url, &self.root) {
            Resolved::File(file) => self.serve_file(req, &file),
            Resolved::Redirect(location) => Reply::redirect(location),
            Resolved::Missing => self.error(req, 404),
        }
    }

    /// Route and answer one request. Send failures (client gone) are not errors.
    pub fn handle(&self, request: Request) {
        let info = RequestInfo::from_request(&request);
        let reply = self.route(&info);
        debug!("serve"; "\"{}\" {}", info.line, reply.status);
        if let Err(e) = response::send(request, reply) {
            debug!("serve"; "failed to respond to \"{}\": {}", info.line, e);
        }
    }

    fn serve_file(&self, req: &RequestInfo, file: &Path) -> Reply {
        // Taken before reading: a build finishing meanwhile makes the page
        // look stale, which only costs one extra reload.
        let epoch = self.epoch.current();

        let body = match fs::read(file) {
            Ok(body) => body,
            Err(e) => {
                debug!("serve"; "cannot read {}: {}", file.display(), e);
                return self.error(req, 404);
            }
        };

        let content_type = mime::from_path(file);
        if mime::is_html(content_type) {
            Reply::ok(content_type, self.inject(&body, epoch))
        } else {
            Reply::ok(content_type, body)
        }
    }

    fn poll(&self, req: &RequestInfo, poll: &PollRequest<'_>) -> Reply {
        self.tabs.note(req.referer.as_deref(), poll.request_id);

        let current = self.epoch.current();
        let epoch = if poll.epoch != current {
            current
        } else {
            self.epoch.wait_until_changed(poll.epoch, self.poll_timeout)
        };
        Reply::ok(types::PLAIN, epoch.to_string().into_bytes())
    }

    /// Error response through the hook. Error pages are HTML and reload too.
    fn error(&self, req: &RequestInfo, status: u16) -> Reply {
        warn!("serve"; "\"{}\" code {}", req.line, status);

        let epoch = self.epoch.current();
        let hook = self.error_hook.load_full();
        let body = error::error_body(hook.as_deref(), status, &req.line);
        Reply::with_status(status, types::HTML, self.inject(&body, epoch))
    }

    fn inject(&self, body: &[u8], epoch: u64) -> Vec<u8> {
        let interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX);
        content::inject_reload_script(body, &content::reload_tag(epoch, interval_ms))
    }
}

/// Work handed to a request thread.
type RequestJob = Box<dyn FnOnce() + Send + 'static>;

/// Accept requests until the server is unblocked, one thread per request.
/// Returns once every request thread has finished.
pub fn run_request_loop(server: &Server, content: &Arc<ContentServer>) {
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    for request in server.incoming_requests() {
        workers.retain(|handle| !handle.is_finished());
        if let Some(handle) = dispatch(content, request, spawn_request_thread) {
            workers.push(handle);
        }
    }

    for handle in workers {
        if handle.join().is_err() {
            warn!("serve"; "request thread panicked");
        }
    }
}

fn spawn_request_thread(job: RequestJob) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("docserve-request".into())
        .spawn(job)
}

/// Answer `request` on a thread from `spawn`, or on the calling thread when
/// no thread can be created. Every request gets a response either way.
fn dispatch<S>(content: &Arc<ContentServer>, request: Request, spawn: S) -> Option<JoinHandle<()>>
where
    S: FnOnce(RequestJob) -> io::Result<JoinHandle<()>>,
{
    // A failed spawn drops the job unrun, leaving the request in the slot.
    let slot = Arc::new(Mutex::new(Some(request)));
    let job: RequestJob = {
        let slot = Arc::clone(&slot);
        let content = Arc::clone(content);
        Box::new(move || {
            let request = slot.lock().take();
            if let Some(request) = request {
                content.handle(request);
            }
        })
    };

    match spawn(job) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("serve"; "cannot spawn request thread, answering inline: {}", e);
            let request = slot.lock().take();
            if let Some(request) = request {
                content.handle(request);
            }
            None
        }
    }
}
