use std::fs;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tiny_http::Method;

use super::{ContentServer, ErrorHandler, Reply, RequestInfo, dispatch, spawn_request_thread};
use crate::core::EpochBroadcaster;
use crate::utils::mime::types;

const RELOAD_TAG_PREFIX: &str = r#"<script src="/js/livereload.js"></script><script>livereload("#;

struct Site {
    _temp: TempDir,
    root: PathBuf,
    epoch: Arc<EpochBroadcaster>,
    server: ContentServer,
}

fn site(poll_timeout: Duration) -> Site {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("site");
    fs::create_dir_all(root.join("guide")).unwrap();
    fs::write(root.join("index.html"), "<html><body>home</body></html>").unwrap();
    fs::write(root.join("guide/index.html"), "<body>guide</body>").unwrap();
    fs::write(root.join("style.css"), "body{}").unwrap();

    let epoch = Arc::new(EpochBroadcaster::starting_at(500));
    let server = ContentServer::new(
        root.clone(),
        Arc::clone(&epoch),
        poll_timeout,
        Duration::from_millis(1000),
    );
    Site {
        _temp: temp,
        root,
        epoch,
        server,
    }
}

fn handler<F>(f: F) -> Option<Arc<ErrorHandler>>
where
    F: Fn(u16) -> anyhow::Result<Option<Vec<u8>>> + Send + Sync + 'static,
{
    Some(Arc::new(f))
}

fn get(site: &Site, url: &str) -> Reply {
    site.server.route(&RequestInfo::new(Method::Get, url))
}

#[test]
fn test_html_gets_reload_script_with_epoch() {
    let site = site(Duration::from_secs(1));
    let reply = get(&site, "/");
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, types::HTML);
    assert_eq!(
        reply.body_str(),
        r#"<html><body>home<script src="/js/livereload.js"></script><script>livereload(500, 1000);</script></body></html>"#
    );
}

#[test]
fn test_non_html_is_untouched() {
    let site = site(Duration::from_secs(1));
    let reply = get(&site, "/style.css");
    assert_eq!(reply.content_type, types::CSS);
    assert_eq!(reply.body_str(), "body{}");
}

#[test]
fn test_files_are_read_fresh() {
    let site = site(Duration::from_secs(1));
    assert_eq!(get(&site, "/style.css").body_str(), "body{}");
    fs::write(site.root.join("style.css"), "p{}").unwrap();
    assert_eq!(get(&site, "/style.css").body_str(), "p{}");
}

#[test]
fn test_injected_epoch_tracks_current() {
    let site = site(Duration::from_secs(1));
    site.epoch.advance();
    assert!(get(&site, "/guide/").body_str().contains("livereload(501, 1000)"));
}

#[test]
fn test_script_endpoint() {
    let site = site(Duration::from_secs(1));
    let reply = get(&site, "/js/livereload.js");
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, types::JAVASCRIPT);
    assert!(reply.body_str().contains("function livereload(epoch, interval)"));
    assert!(!reply.body_str().contains(RELOAD_TAG_PREFIX));
}

#[test]
fn test_missing_is_404_with_reload_script() {
    let site = site(Duration::from_secs(1));
    let reply = get(&site, "/missing-route.html");
    assert_eq!(reply.status, 404);
    assert_eq!(reply.content_type, types::HTML);
    assert!(reply.body_str().contains("404"));
    assert!(reply.body_str().contains(RELOAD_TAG_PREFIX));
    assert!(crate::logger::capture::contains_all(&[
        "\"GET /missing-route.html HTTP/1.1\" code 404"
    ]));
}

#[test]
fn test_directory_redirect() {
    let site = site(Duration::from_secs(1));
    let reply = get(&site, "/guide?x=1");
    assert_eq!(reply.status, 301);
    assert_eq!(reply.location.as_deref(), Some("/guide/?x=1"));
}

#[test]
fn test_unsupported_method_is_501() {
    let site = site(Duration::from_secs(1));
    let reply = site.server.route(&RequestInfo::new(Method::Post, "/"));
    assert_eq!(reply.status, 501);
    assert!(reply.body_str().contains("501"));
}

#[test]
fn test_head_routes_like_get() {
    let site = site(Duration::from_secs(1));
    let reply = site.server.route(&RequestInfo::new(Method::Head, "/style.css"));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, types::CSS);
}

#[test]
fn test_custom_error_handler() {
    let site = site(Duration::from_secs(1));
    site.server
        .set_error_handler(handler(|code| Ok(Some(format!("<p>oops {code}</p>").into_bytes()))));

    let reply = get(&site, "/nope");
    assert_eq!(reply.status, 404);
    assert!(reply.body_str().starts_with("<p>oops 404</p>"));
    assert!(reply.body_str().contains(RELOAD_TAG_PREFIX));

    site.server.set_error_handler(None);
    assert!(!get(&site, "/nope").body_str().contains("oops"));
}

#[test]
fn test_failing_error_handler_falls_back() {
    let site = site(Duration::from_secs(1));
    site.server
        .set_error_handler(handler(|_| anyhow::bail!("theme has no 404 template")));

    let reply = get(&site, "/route-with-failing-hook");
    assert_eq!(reply.status, 404);
    assert!(reply.body_str().contains("404"));
    assert!(crate::logger::capture::contains_all(&[
        "GET /route-with-failing-hook HTTP/1.1",
        "theme has no 404 template"
    ]));
}

#[test]
fn test_stale_poll_returns_immediately() {
    let site = site(Duration::from_secs(30));
    let started = Instant::now();
    let reply = get(&site, "/livereload/0/tab");
    assert_eq!(reply.status, 200);
    assert_eq!(reply.content_type, types::PLAIN);
    assert_eq!(reply.body_str(), "500");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_current_poll_times_out_with_same_epoch() {
    let site = site(Duration::from_millis(300));
    let started = Instant::now();
    let reply = get(&site, "/livereload/500/tab");
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(reply.body_str(), "500");
}

#[test]
fn test_current_poll_wakes_on_advance() {
    let site = Arc::new(site(Duration::from_secs(30)));
    let advancer = {
        let site = Arc::clone(&site);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            site.epoch.advance();
        })
    };

    let started = Instant::now();
    let reply = get(&site, "/livereload/500/tab");
    advancer.join().unwrap();
    assert_eq!(reply.body_str(), "501");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_poll_with_query_string() {
    let site = site(Duration::from_secs(30));
    assert_eq!(get(&site, "/livereload/1/tab?nocache=3").body_str(), "500");
}

// ============================================================================
// Request dispatch
// ============================================================================

/// Accept one real request for `url` and pass it to `answer`; returns what
/// the client received.
fn exchange<F>(url: &str, answer: F) -> String
where
    F: FnOnce(tiny_http::Request),
{
    let http = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = http.server_addr().to_ip().unwrap();
    let line = format!("GET {url} HTTP/1.0\r\nHost: localhost\r\n\r\n");
    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(30))).unwrap();
        stream.write_all(line.as_bytes()).unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();
        String::from_utf8_lossy(&raw).into_owned()
    });

    answer(http.recv().unwrap());
    client.join().unwrap()
}

#[test]
fn test_dispatch_answers_on_spawned_thread() {
    let Site { _temp: temp, server, .. } = site(Duration::from_secs(1));
    let content = Arc::new(server);

    let raw = exchange("/style.css", |request| {
        let handle = dispatch(&content, request, spawn_request_thread);
        handle.expect("thread spawned").join().unwrap();
    });
    assert!(raw.split("\r\n").next().unwrap().contains(" 200"));
    assert!(raw.ends_with("body{}"));
    drop(temp);
}

#[test]
fn test_dispatch_answers_inline_when_spawn_fails() {
    let Site { _temp: temp, server, .. } = site(Duration::from_secs(1));
    let content = Arc::new(server);

    let raw = exchange("/style.css", |request| {
        let handle = dispatch(&content, request, |_job| {
            Err(io::Error::other("thread limit reached"))
        });
        assert!(handle.is_none());
    });
    assert!(raw.split("\r\n").next().unwrap().contains(" 200"));
    assert!(raw.ends_with("body{}"));
    assert!(crate::logger::capture::contains_all(&[
        "cannot spawn request thread, answering inline",
        "thread limit reached"
    ]));
    drop(temp);
}
