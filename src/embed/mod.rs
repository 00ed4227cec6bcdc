//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server resources (livereload.js, reload tag, error page)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{RELOAD_TAG, ReloadVars};
//!
//! let tag = RELOAD_TAG.render(&ReloadVars { epoch: 42, interval_ms: 1000 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Client script served at `/js/livereload.js`.
    pub const LIVERELOAD_JS: &str = include_str!("serve/livereload.js");

    /// Variables for the tag pair injected into HTML responses.
    pub struct ReloadVars {
        pub epoch: u64,
        pub interval_ms: u64,
    }

    impl TemplateVars for ReloadVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__EPOCH__", &self.epoch.to_string())
                .replace("__INTERVAL__", &self.interval_ms.to_string())
        }
    }

    /// Script pair inserted before `</body>`.
    pub const RELOAD_TAG: Template<ReloadVars> = Template::new(
        r#"<script src="/js/livereload.js"></script><script>livereload(__EPOCH__, __INTERVAL__);</script>"#,
    );

    /// Variables for error.html.
    pub struct ErrorVars<'a> {
        pub code: u16,
        pub reason: &'a str,
    }

    impl TemplateVars for ErrorVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__CODE__", &self.code.to_string())
                .replace("__REASON__", self.reason)
        }
    }

    /// Built-in error page, used when no custom error body is available.
    pub const ERROR_HTML: Template<ErrorVars<'static>> =
        Template::new(include_str!("serve/error.html"));
}

#[cfg(test)]
mod tests {
    use super::serve::*;

    #[test]
    fn test_reload_tag_literal_form() {
        let tag = RELOAD_TAG.render(&ReloadVars {
            epoch: 1700000000123,
            interval_ms: 1000,
        });
        assert_eq!(
            tag,
            r#"<script src="/js/livereload.js"></script><script>livereload(1700000000123, 1000);</script>"#
        );
    }

    #[test]
    fn test_error_page_mentions_code() {
        let html = ERROR_HTML.render(&ErrorVars {
            code: 404,
            reason: "Not Found",
        });
        assert!(html.contains("404"));
        assert!(html.contains("Not Found"));
        assert!(!html.contains("__CODE__"));
    }

    #[test]
    fn test_script_exposes_entry_point() {
        assert!(LIVERELOAD_JS.contains("function livereload(epoch, interval)"));
        assert!(LIVERELOAD_JS.contains("/livereload/"));
    }
}
