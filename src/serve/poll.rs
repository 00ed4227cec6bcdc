//! Long-poll endpoint: `/livereload/{epoch}/{request-id}`.

use std::collections::VecDeque;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;

use crate::log;

static POLL_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/livereload/([0-9]+)/([^/]+)$").expect("poll route pattern is valid")
});

/// How many browser tabs are remembered for the "connected" message.
const REMEMBERED_TABS: usize = 128;

/// A parsed poll request.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct PollRequest<'a> {
    /// Epoch the page was built at. Out-of-range values read as 0, which is
    /// never current, so the poll answers immediately.
    pub epoch: u64,
    pub request_id: &'a str,
}

pub(super) fn parse_poll(path: &str) -> Option<PollRequest<'_>> {
    let caps = POLL_ROUTE.captures(path)?;
    let epoch = caps.get(1)?.as_str().parse().unwrap_or(0);
    let request_id = caps.get(2)?.as_str();
    Some(PollRequest { epoch, request_id })
}

/// Remembers recently seen tabs so each logs "browser connected" once.
#[derive(Default)]
pub(super) struct ConnectedTabs {
    seen: Mutex<VecDeque<(String, String)>>,
}

impl ConnectedTabs {
    /// Log the first poll of a tab. Returns whether it was new.
    pub(super) fn note(&self, referer: Option<&str>, request_id: &str) -> bool {
        let page = referer.unwrap_or("(unknown page)");
        let key = (page.to_string(), request_id.to_string());

        {
            let mut seen = self.seen.lock();
            if seen.contains(&key) {
                return false;
            }
            if seen.len() == REMEMBERED_TABS {
                seen.pop_front();
            }
            seen.push_back(key);
        }

        log!("serve"; "browser connected: {}", page);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poll() {
        assert_eq!(
            parse_poll("/livereload/1700000000000/abc123"),
            Some(PollRequest {
                epoch: 1700000000000,
                request_id: "abc123"
            })
        );
        assert_eq!(parse_poll("/livereload/5"), None);
        assert_eq!(parse_poll("/livereload/x/1"), None);
        assert_eq!(parse_poll("/livereload/5/1/extra"), None);
        assert_eq!(parse_poll("/docs/livereload/5/1"), None);
    }

    #[test]
    fn test_parse_poll_overflow_is_stale() {
        let poll = parse_poll("/livereload/99999999999999999999999/1").unwrap();
        assert_eq!(poll.epoch, 0);
    }

    #[test]
    fn test_connected_logged_once_per_tab() {
        let tabs = ConnectedTabs::default();
        assert!(tabs.note(Some("http://localhost/tab-one/"), "r1"));
        assert!(!tabs.note(Some("http://localhost/tab-one/"), "r1"));
        assert!(tabs.note(Some("http://localhost/tab-one/"), "r2"));
        assert!(crate::logger::capture::contains_all(&[
            "browser connected",
            "/tab-one/"
        ]));
    }

    #[test]
    fn test_connected_forgets_oldest() {
        let tabs = ConnectedTabs::default();
        for i in 0..=REMEMBERED_TABS {
            tabs.note(Some("page"), &i.to_string());
        }
        // "0" was evicted by the 129th tab.
        assert!(tabs.note(Some("page"), "0"));
        assert!(!tabs.note(Some("page"), &REMEMBERED_TABS.to_string()));
    }
}
