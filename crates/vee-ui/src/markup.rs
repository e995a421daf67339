//! # Inline Markup
//!
//! `**bold**` and `*italic*` only. The source is HTML-escaped first, so user
//! text never reaches the page as markup; only the two substitutions do.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));

/// Renders post, comment, bio and rules text. Absent text renders as `""`.
pub fn render_inline(text: Option<&str>) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return String::new();
    };

    let escaped = html_escape::encode_safe(text);
    // Bold must run first, or `**a**` would become `<em></em>a<em></em>`.
    let bold = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}
