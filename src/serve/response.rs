//! HTTP response assembly.

use std::io::Cursor;

use anyhow::{Result, anyhow};
use tiny_http::{Header, Request, Response, StatusCode};

use crate::utils::mime::types::PLAIN;

/// A fully computed response, independent of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub location: Option<String>,
}

impl Reply {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self::with_status(200, content_type, body)
    }

    pub fn with_status(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
            location: None,
        }
    }

    /// `301 Moved Permanently` to `location`.
    pub fn redirect(location: String) -> Self {
        Self {
            status: 301,
            content_type: PLAIN,
            body: Vec::new(),
            location: Some(location),
        }
    }

    #[cfg(test)]
    pub(crate) fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }

    /// `Content-Length` comes from the body; HEAD requests get headers only
    /// (tiny_http drops the body for them).
    ///
    /// Bodies are always sent whole. tiny_http would otherwise switch large
    /// HTTP/1.1 responses to chunked encoding and omit the length.
    pub(super) fn into_response(self) -> Result<Response<Cursor<Vec<u8>>>> {
        let mut response = Response::from_data(self.body)
            .with_chunked_threshold(usize::MAX)
            .with_status_code(StatusCode(self.status))
            .with_header(make_header("Content-Type", self.content_type)?);
        if let Some(location) = &self.location {
            response.add_header(make_header("Location", location)?);
        }
        Ok(response)
    }
}

/// Write `reply` to the client.
pub(super) fn send(request: Request, reply: Reply) -> Result<()> {
    request.respond(reply.into_response()?)?;
    Ok(())
}

fn make_header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header value for {key}: {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_http::HTTPVersion;

    fn wire(reply: Reply, version: HTTPVersion, head_only: bool) -> String {
        let mut out = Vec::new();
        reply
            .into_response()
            .unwrap()
            .raw_print(&mut out, version, &[], head_only, None)
            .unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    fn head_block(raw: &str) -> String {
        raw.split("\r\n\r\n").next().unwrap().to_ascii_lowercase()
    }

    #[test]
    fn test_large_body_keeps_content_length_on_http11() {
        let body = vec![b'x'; 40_000];
        let raw = wire(Reply::ok("text/html", body), HTTPVersion(1, 1), false);

        let head = head_block(&raw);
        assert!(head.contains("content-length: 40000"));
        assert!(!head.contains("transfer-encoding"));
        assert!(raw.ends_with(&"x".repeat(40_000)));
    }

    #[test]
    fn test_head_keeps_content_length_without_body() {
        let body = vec![b'x'; 40_000];
        let raw = wire(Reply::ok("text/html", body), HTTPVersion(1, 1), true);

        assert!(head_block(&raw).contains("content-length: 40000"));
        assert!(raw.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_response_headers() {
        let response = Reply::ok("text/css", b"body{}".to_vec()).into_response().unwrap();
        assert_eq!(response.status_code(), StatusCode(200));
        assert!(
            response
                .headers()
                .iter()
                .any(|h| h.field.equiv("Content-Type") && h.value.as_str() == "text/css")
        );
    }

    #[test]
    fn test_redirect_sets_location() {
        let response = Reply::redirect("/guide/".into()).into_response().unwrap();
        assert_eq!(response.status_code(), StatusCode(301));
        assert!(
            response
                .headers()
                .iter()
                .any(|h| h.field.equiv("Location") && h.value.as_str() == "/guide/")
        );
    }
}
