use pulldown_cmark::{Event, Options, Parser, html};

/// Render the agent's markdown answer to HTML.
///
/// Raw HTML in the answer is shown as text.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Escape text for HTML element content and double-quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    pulldown_cmark_escape::escape_html(&mut out, input).expect("writing to a String cannot fail");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;"
        );
    }

    #[test]
    fn test_tables_render() {
        let html = render_markdown("| repo | stars |\n|---|---|\n| axum | 20k |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>axum</td>"));
    }

    #[test]
    fn test_links_render() {
        let html = render_markdown("See [#42](https://github.com/tokio-rs/axum/issues/42)");
        assert!(html.contains(r#"<a href="https://github.com/tokio-rs/axum/issues/42">#42</a>"#));
    }

    #[test]
    fn test_raw_html_is_text() {
        let html = render_markdown("hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
