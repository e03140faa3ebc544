//! Text extraction helpers
//!
//! Whitespace normalization, the minimal HTML entity decoder and tag
//! stripping for raw HTML fragments.

/// Entities decoded during text extraction
const ENTITIES: [(&str, &str); 6] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
    ("&amp;", "&"),
];

/// Collapse runs of whitespace to single spaces and trim both ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode `&amp; &lt; &gt; &quot; &#39; &nbsp;`
///
/// Decoding is a single left-to-right pass so `&amp;lt;` yields `&lt;`
/// rather than `<`.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, replacement)) => {
                out.push_str(replacement);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Remove tags from a raw HTML fragment, keeping only character data
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

/// Plain text of a raw HTML fragment: tags stripped, entities decoded,
/// whitespace normalized
pub fn raw_html_text(html: &str) -> String {
    normalize_whitespace(&decode_entities(&strip_tags(html)))
}

/// Escape text for inclusion in HTML or SVG character data
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("&lt;a&gt; &amp; &quot;b&quot; &#39;c&#39;&nbsp;d"),
            "<a> & \"b\" 'c' d"
        );
    }

    #[test]
    fn test_decode_entities_single_pass() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&copy;"), "&copy;");
    }

    #[test]
    fn test_raw_html_text() {
        assert_eq!(
            raw_html_text("<div class=\"x\">Fish &amp;<br/>chips</div>"),
            "Fish & chips"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
    }
}
