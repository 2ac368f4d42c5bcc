//! Derived HTML rendering for mirrored message content.
//!
//! The mirror stores the raw content alongside a pre-rendered HTML form so
//! the read path never interprets user text at query time. Rendering is
//! deliberately minimal: escape, then paragraph/line-break structure.

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render message content to HTML: blank lines separate paragraphs, single
/// newlines become `<br>`.
pub fn render_html(content: &str) -> String {
    let escaped = escape_html(content.trim());
    let paragraphs: Vec<String> = escaped
        .split("\n\n")
        .map(|p| p.trim().replace('\n', "<br>"))
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return "<p></p>".to_string();
    }

    paragraphs
        .iter()
        .map(|p| format!("<p>{p}</p>"))
        .collect::<Vec<_>>()
        .join("")
}

/// Short plain-text preview carried in notification payloads.
pub fn content_preview(content: &str) -> String {
    const PREVIEW_LEN: usize = 120;
    let trimmed = content.trim();
    if trimmed.chars().count() <= PREVIEW_LEN {
        trimmed.to_string()
    } else {
        let mut preview: String = trimmed.chars().take(PREVIEW_LEN).collect();
        preview.push('…');
        preview
    }
}
