//! Live-reload script injection.

use crate::embed::serve::{RELOAD_TAG, ReloadVars};

/// Byte pattern for `</body>`, matched case-insensitively.
const BODY_CLOSE: &[u8] = b"</body>";

/// Render the script pair for a page built at `epoch`.
pub(super) fn reload_tag(epoch: u64, interval_ms: u64) -> String {
    RELOAD_TAG.render(&ReloadVars { epoch, interval_ms })
}

/// Insert `tag` before the last `</body>`, or append it when there is none.
pub(super) fn inject_reload_script(content: &[u8], tag: &str) -> Vec<u8> {
    let tag = tag.as_bytes();
    let mut result = Vec::with_capacity(content.len() + tag.len());

    match content
        .windows(BODY_CLOSE.len())
        .rposition(|w| w.eq_ignore_ascii_case(BODY_CLOSE))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(tag);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(tag);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = "<script>x</script>";

    fn inject(content: &str) -> String {
        String::from_utf8(inject_reload_script(content.as_bytes(), TAG)).unwrap()
    }

    #[test]
    fn test_inject_before_body_close() {
        assert_eq!(
            inject("<html><body>hi</body></html>"),
            "<html><body>hi<script>x</script></body></html>"
        );
    }

    #[test]
    fn test_inject_uses_last_body_close() {
        assert_eq!(
            inject("<body></body><pre></body></pre></body>"),
            "<body></body><pre></body></pre><script>x</script></body>"
        );
    }

    #[test]
    fn test_inject_is_case_insensitive() {
        assert_eq!(inject("<BODY>a</BODY>"), "<BODY>a<script>x</script></BODY>");
        assert_eq!(inject("<p>b</Body >"), "<p>b</Body ><script>x</script>");
    }

    #[test]
    fn test_inject_appends_without_body() {
        assert_eq!(inject("<p>fragment</p>"), "<p>fragment</p><script>x</script>");
        assert_eq!(inject(""), "<script>x</script>");
    }

    #[test]
    fn test_reload_tag_carries_epoch_and_interval() {
        assert_eq!(
            reload_tag(7, 250),
            r#"<script src="/js/livereload.js"></script><script>livereload(7, 250);</script>"#
        );
    }
}
