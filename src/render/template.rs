//! HTML template handling module
//!
//! The bundler emits a page template containing a marker comment where the
//! rendered application markup belongs. Splitting happens once per build
//! cycle so the request path only concatenates prepared halves.

use std::fmt;

/// Marker comment the bundler leaves at the application mount point
pub const CONTENT_MARKER: &str = "<!-- APP -->";

/// Template document split at the content marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Everything before the marker
    pub head: String,
    /// Everything after the marker
    pub tail: String,
}

/// Template parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateError {
    /// The document does not contain the content marker
    MarkerMissing,
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkerMissing => {
                write!(f, "template does not contain the marker {CONTENT_MARKER:?}")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl Template {
    /// Split a template document at the first content marker.
    ///
    /// `head + tail` reconstructs the document with the marker removed,
    /// for any marker position including the very start or end.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let Some(i) = source.find(CONTENT_MARKER) else {
            return Err(TemplateError::MarkerMissing);
        };

        Ok(Self {
            head: source[..i].to_string(),
            tail: source[i + CONTENT_MARKER.len()..].to_string(),
        })
    }
}

/// Serialize an initial-state value into an inline script tag.
///
/// `<` is escaped as `\u003c` so a state string containing `</script>`
/// cannot terminate the tag early.
pub fn state_script(state: &serde_json::Value) -> String {
    let json = serde_json::to_string(state).unwrap_or_else(|_| "null".to_string());
    let json = json.replace('<', "\\u003c");
    format!("<script>window.__INITIAL_STATE__={json}</script>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_marker_in_middle() {
        let tpl = Template::parse("<div>\n<!-- APP -->\n</div>").unwrap();
        assert_eq!(tpl.head, "<div>\n");
        assert_eq!(tpl.tail, "\n</div>");
    }

    #[test]
    fn test_split_marker_at_start() {
        let tpl = Template::parse("<!-- APP --></body>").unwrap();
        assert_eq!(tpl.head, "");
        assert_eq!(tpl.tail, "</body>");
    }

    #[test]
    fn test_split_marker_at_end() {
        let tpl = Template::parse("<body><!-- APP -->").unwrap();
        assert_eq!(tpl.head, "<body>");
        assert_eq!(tpl.tail, "");
    }

    #[test]
    fn test_split_reconstructs_without_marker() {
        let source = "<html><head></head><body><!-- APP --></body></html>";
        let tpl = Template::parse(source).unwrap();
        let rejoined = format!("{}{}", tpl.head, tpl.tail);
        assert_eq!(rejoined, source.replace(CONTENT_MARKER, ""));
    }

    #[test]
    fn test_only_first_marker_is_removed() {
        let tpl = Template::parse("a<!-- APP -->b<!-- APP -->c").unwrap();
        assert_eq!(tpl.head, "a");
        assert_eq!(tpl.tail, "b<!-- APP -->c");
    }

    #[test]
    fn test_missing_marker_is_error() {
        assert_eq!(
            Template::parse("<html></html>"),
            Err(TemplateError::MarkerMissing)
        );
    }

    #[test]
    fn test_state_script_embeds_json() {
        let script = state_script(&serde_json::json!({"x": 1}));
        assert_eq!(
            script,
            "<script>window.__INITIAL_STATE__={\"x\":1}</script>"
        );
    }

    #[test]
    fn test_state_script_escapes_script_breakout() {
        let script = state_script(&serde_json::json!({"v": "</script><script>alert(1)"}));
        assert!(!script.contains("</script><script>"));
        assert!(script.contains("\\u003c/script"));
        assert!(script.ends_with("</script>"));
    }
}
