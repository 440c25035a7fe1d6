//! HTML synthesis for pasted text and the print stylesheet injected into every page.

const ANCHOR_STYLE: &str = "color: blue; text-decoration: underline; word-break: break-all;";

/// Strips default margins and scrollbars so the measured height is content only.
pub const PRINT_CSS: &str = "html, body { margin: 0 !important; padding: 0 !important; overflow: hidden !important; min-height: 100vh !important; }\n::-webkit-scrollbar { display: none; }";

const TEXT_DOCUMENT_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  #txt-container {
    white-space: pre-wrap; word-wrap: break-word; font-family: "Consolas", monospace;
    font-size: 12px; line-height: 16px; color: #333; padding: 40px; width: 100%; box-sizing: border-box;
  }
  a { color: blue !important; text-decoration: underline !important; }
</style>
</head>
<body><pre id="txt-container">
"#;

const TEXT_DOCUMENT_TAIL: &str = "</pre></body>\n</html>\n";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wraps every `http://` / `https://` run (up to the next whitespace) in an anchor.
///
/// Expects already-escaped text: the run is copied verbatim into both the
/// `href` attribute and the link text.
pub fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = next_url_start(rest) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
        let url = &tail[..end];

        out.push_str("<a href=\"");
        out.push_str(url);
        out.push_str("\" style=\"");
        out.push_str(ANCHOR_STYLE);
        out.push_str("\">");
        out.push_str(url);
        out.push_str("</a>");

        rest = &tail[end..];
    }

    out.push_str(rest);
    out
}

// Earliest position of a scheme that is followed by at least one non-space char.
fn next_url_start(text: &str) -> Option<usize> {
    let mut offset = 0;
    loop {
        let haystack = &text[offset..];
        let found = [haystack.find("http://"), haystack.find("https://")]
            .into_iter()
            .flatten()
            .min()?;
        let start = offset + found;
        let scheme_len = if text[start..].starts_with("https://") { 8 } else { 7 };
        match text[start + scheme_len..].chars().next() {
            Some(c) if !c.is_whitespace() => return Some(start),
            // "http://" alone is not a link; keep scanning past it
            _ => offset = start + scheme_len,
        }
    }
}

/// Full HTML document presenting `text` as escaped, linkified monospace content.
pub fn text_document(text: &str) -> String {
    let body = linkify(&escape_html(text));
    let mut doc = String::with_capacity(TEXT_DOCUMENT_HEAD.len() + body.len() + TEXT_DOCUMENT_TAIL.len());
    doc.push_str(TEXT_DOCUMENT_HEAD);
    doc.push_str(&body);
    doc.push_str(TEXT_DOCUMENT_TAIL);
    doc
}

/// Script that appends [`PRINT_CSS`] as a `<style>` element to the current document.
pub fn print_style_script() -> String {
    // serde_json gives us a correctly quoted JS string literal
    let css = serde_json::to_string(PRINT_CSS).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const style = document.createElement('style'); style.textContent = {}; (document.head || document.documentElement).appendChild(style); return true; }})()",
        css
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn escapes_all_five_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn escaped_text_keeps_no_raw_markup() {
        let escaped = escape_html("if a < b && c > d { say(\"hi\"); it's }");
        for raw in ['<', '>', '"', '\''] {
            assert!(!escaped.contains(raw), "found raw {raw:?} in {escaped}");
        }
        // every remaining ampersand starts an entity
        for (i, _) in escaped.match_indices('&') {
            let tail = &escaped[i..];
            assert!(
                ["&amp;", "&lt;", "&gt;", "&quot;", "&#039;"].iter().any(|e| tail.starts_with(e)),
                "bare ampersand at {i} in {escaped}"
            );
        }
    }

    #[test]
    fn ampersand_is_escaped_once() {
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn linkifies_urls_up_to_whitespace() {
        let out = linkify("Visit https://example.com now");
        assert_eq!(
            out,
            format!(
                "Visit <a href=\"https://example.com\" style=\"{}\">https://example.com</a> now",
                ANCHOR_STYLE
            )
        );
    }

    #[test]
    fn linkifies_multiple_and_trailing_urls() {
        let out = linkify("a http://one.test/x?y=1\nb https://two.test");
        assert!(out.contains("<a href=\"http://one.test/x?y=1\""));
        assert!(out.contains(">https://two.test</a>"));
        assert!(out.starts_with("a <a"));
        assert!(out.contains("</a>\nb <a"));
    }

    #[test]
    fn bare_scheme_is_left_alone() {
        assert_eq!(linkify("see http:// later"), "see http:// later");
        assert_eq!(linkify("plain text"), "plain text");
    }

    #[test]
    fn embedded_scheme_is_linked_from_its_start() {
        let out = linkify("url:https://a.test");
        assert!(out.starts_with("url:<a href=\"https://a.test\""));
    }

    #[test]
    fn document_anchor_href_matches_the_url() {
        let doc = text_document("Visit https://example.com now");
        let html = Html::parse_document(&doc);
        let anchor = Selector::parse("#txt-container a").unwrap();
        let links: Vec<_> = html.select(&anchor).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].value().attr("href"), Some("https://example.com"));
        assert_eq!(links[0].text().collect::<String>(), "https://example.com");
    }

    #[test]
    fn document_text_survives_parsing_unchanged() {
        let input = "<script>alert('x')</script> & \"quoted\"";
        let html = Html::parse_document(&text_document(input));
        let container = Selector::parse("#txt-container").unwrap();
        let pre = html.select(&container).next().unwrap();
        assert_eq!(pre.text().collect::<String>(), input);
        assert_eq!(html.select(&Selector::parse("#txt-container script").unwrap()).count(), 0);
    }

    #[test]
    fn leading_blank_line_is_preserved() {
        let html = Html::parse_document(&text_document("\nfirst line after blank"));
        let container = Selector::parse("#txt-container").unwrap();
        let pre = html.select(&container).next().unwrap();
        assert_eq!(pre.text().collect::<String>(), "\nfirst line after blank");
    }

    #[test]
    fn print_script_embeds_the_stylesheet() {
        let script = print_style_script();
        assert!(script.contains("overflow: hidden !important"));
        assert!(script.contains("::-webkit-scrollbar"));
        assert!(script.contains("\\n"));
    }
}
