//! Error responses and the user-installable error page hook.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use tiny_http::StatusCode;

use crate::embed::serve::{ERROR_HTML, ErrorVars};
use crate::utils::panic_message;
use crate::warn;

/// Renders the body for an error status. `Ok(None)` declines, falling back
/// to the built-in page.
pub type ErrorHandler = dyn Fn(u16) -> anyhow::Result<Option<Vec<u8>>> + Send + Sync;

/// Slot payload for the installed handler.
pub(super) struct ErrorHook {
    handler: Arc<ErrorHandler>,
}

impl ErrorHook {
    pub(super) fn new(handler: Arc<ErrorHandler>) -> Self {
        Self { handler }
    }

    /// Call the handler, turning a panic into an error.
    fn call(&self, status: u16) -> anyhow::Result<Option<Vec<u8>>> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(status))) {
            Ok(result) => result,
            Err(payload) => Err(anyhow!(
                "error handler panicked: {}",
                panic_message(payload.as_ref())
            )),
        }
    }
}

/// Body for an error response: the hook's output when it produces one,
/// otherwise the built-in page.
///
/// `request_line` only feeds the diagnostic when the hook fails.
pub(super) fn error_body(hook: Option<&ErrorHook>, status: u16, request_line: &str) -> Vec<u8> {
    if let Some(hook) = hook {
        match hook.call(status) {
            Ok(Some(body)) => return body,
            Ok(None) => {}
            Err(e) => {
                warn!("serve"; "failed to render an error page for \"{}\" (code {}): {:#}", request_line, status, e);
            }
        }
    }
    default_body(status)
}

/// The built-in minimal page.
pub(super) fn default_body(status: u16) -> Vec<u8> {
    ERROR_HTML
        .render(&ErrorVars {
            code: status,
            reason: reason_phrase(status),
        })
        .into_bytes()
}

pub(super) fn reason_phrase(status: u16) -> &'static str {
    StatusCode(status).default_reason_phrase()
}
