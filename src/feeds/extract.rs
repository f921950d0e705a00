//! Recovers a feed document from text that is not clean XML.
//!
//! Two sources need this: servers that prepend a BOM or junk before the XML,
//! and browser-rendered pages where the feed is wrapped in HTML.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::decode_entities;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Markers of an anti-bot interstitial still being shown.
pub const CHALLENGE_MARKERS: [&str; 4] = [
    "Just a moment",
    "Checking your browser",
    "cf-browser-verification",
    "challenge-platform",
];

const FEED_START_TOKENS: [&str; 3] = ["<?xml", "<rss", "<feed"];

/// Strip a leading BOM and whitespace, then drop anything before the first
/// XML declaration or feed root tag.
pub fn clean_feed_text(text: &str) -> &str {
    let text = text.trim_start_matches('\u{feff}').trim_start();

    if FEED_START_TOKENS.iter().any(|t| text.starts_with(t)) {
        return text;
    }

    FEED_START_TOKENS
        .iter()
        .filter_map(|t| text.find(t))
        .min()
        .map_or(text, |start| &text[start..])
}

/// Whether the rendered page is still an anti-bot challenge.
pub fn is_challenge_page(html: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|m| html.contains(m))
}

// Patterns are literals; a failure here is a programming error.
#[allow(clippy::expect_used)]
static RSS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<rss.*</rss>").expect("valid rss pattern"));
#[allow(clippy::expect_used)]
static ATOM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<feed.*</feed>").expect("valid feed pattern"));
#[allow(clippy::expect_used)]
static PRE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").expect("valid pre pattern"));
#[allow(clippy::expect_used)]
static BODY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").expect("valid body pattern"));

/// Pull the feed XML out of a browser-rendered document.
///
/// Tried in order: the document is already XML; a whole `<rss>` or `<feed>`
/// block (re-wrapped with a declaration); the entity-decoded contents of a
/// `<pre>` block; the `<body>` contents when they hold a feed root tag.
pub fn extract_xml_content(html: &str) -> Option<String> {
    let trimmed = html.trim();
    if trimmed.starts_with("<?xml") {
        return Some(trimmed.to_string());
    }

    if let Some(m) = RSS_BLOCK.find(html).or_else(|| ATOM_BLOCK.find(html)) {
        return Some(format!("{}{}", XML_DECLARATION, m.as_str()));
    }

    if let Some(caps) = PRE_BLOCK.captures(html) {
        return Some(decode_entities(&caps[1]));
    }

    BODY_BLOCK.captures(html).and_then(|caps| {
        let body = caps[1].trim();
        (body.contains("<rss") || body.contains("<feed")).then(|| body.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_bom_and_whitespace() {
        let text = "\u{feff}  \n<?xml version=\"1.0\"?><rss></rss>";
        assert_eq!(clean_feed_text(text), "<?xml version=\"1.0\"?><rss></rss>");
    }

    #[test]
    fn test_clean_slices_leading_junk() {
        let text = "Warning: deprecated call in feed.php\n<rss version=\"2.0\"></rss>";
        assert_eq!(clean_feed_text(text), "<rss version=\"2.0\"></rss>");

        let text = "junk <feed xmlns=\"x\"></feed> <rss>";
        assert_eq!(clean_feed_text(text), "<feed xmlns=\"x\"></feed> <rss>");
    }

    #[test]
    fn test_clean_leaves_unrecognized_text() {
        assert_eq!(clean_feed_text("  plain text"), "plain text");
    }

    #[test]
    fn test_challenge_detection() {
        assert!(is_challenge_page("<title>Just a moment...</title>"));
        assert!(is_challenge_page("<div id=\"challenge-platform\"></div>"));
        assert!(!is_challenge_page("<rss><channel></channel></rss>"));
    }

    #[test]
    fn test_extract_plain_xml() {
        let doc = "  <?xml version=\"1.0\"?><rss></rss>  ";
        assert_eq!(
            extract_xml_content(doc).as_deref(),
            Some("<?xml version=\"1.0\"?><rss></rss>")
        );
    }

    #[test]
    fn test_extract_rss_block_from_html() {
        let doc = "<html><body><div><rss version=\"2.0\"><channel/></rss></div></body></html>";
        let xml = extract_xml_content(doc).unwrap();
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.ends_with("<rss version=\"2.0\"><channel/></rss>"));
    }

    #[test]
    fn test_extract_atom_block_from_html() {
        let doc = "<html><body><FEED xmlns=\"a\"><title>T</title></FEED></body></html>";
        let xml = extract_xml_content(doc).unwrap();
        assert!(xml.contains("<FEED xmlns=\"a\"><title>T</title></FEED>"));
    }

    #[test]
    fn test_extract_pre_block_decodes_entities() {
        let doc = "<html><body><pre class=\"x\">&lt;channel&gt;&amp;&lt;/channel&gt;</pre></body></html>";
        assert_eq!(
            extract_xml_content(doc).as_deref(),
            Some("<channel>&</channel>")
        );
    }

    #[test]
    fn test_extract_fails_on_plain_page() {
        let doc = "<html><body><p>Access denied</p></body></html>";
        assert_eq!(extract_xml_content(doc), None);
    }
}
