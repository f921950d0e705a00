//! Turns raw feed documents into ordered, normalized entries.

use feed_rs::model::{Link, Text};
use feed_rs::parser;

use crate::error::{FeedError, Result};

/// Maximum length of an entry's plain-text excerpt, in characters.
pub const MAX_EXCERPT_LENGTH: usize = 500;

/// A parsed feed: its own title plus entries in source order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Feed title, empty when the document has none.
    pub title: String,
    pub entries: Vec<FeedEntry>,
}

/// One normalized feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Stable identifier: guid, else link, else title.
    pub guid: String,
    /// Short plain-text body: summary, else content, else empty.
    pub content: String,
}

impl FeedEntry {
    /// Build an entry with the same value for guid and link.
    pub fn new(guid: impl Into<String>, title: impl Into<String>) -> Self {
        let guid = guid.into();
        Self {
            title: title.into(),
            link: guid.clone(),
            guid,
            content: String::new(),
        }
    }

    /// Set the excerpt.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Parse a feed document (RSS 0.9x/1.0/2.0, Atom or JSON Feed).
///
/// Entry identifiers fall back from the feed's own guid/id to the first link
/// and then to the title, so feeds without guids still get stable cursors.
pub fn normalize(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::Builder::new()
        .id_generator(fallback_id)
        .build()
        .parse(bytes)
        .map_err(|e| FeedError::Parse(e.to_string()))?;

    let title = feed.title.map(|t| t.content).unwrap_or_default();

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| strip_html(&t.content))
                .unwrap_or_default();
            let link = article_link(&entry.links)
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let content = entry
                .summary
                .map(|t| t.content)
                .filter(|s| !s.trim().is_empty())
                .or(entry.content.and_then(|c| c.body))
                .map(|body| truncate(&strip_html(&body)))
                .unwrap_or_default();

            let guid = if !entry.id.is_empty() {
                entry.id
            } else if !link.is_empty() {
                link.clone()
            } else {
                title.clone()
            };

            FeedEntry {
                title,
                link,
                guid,
                content,
            }
        })
        .collect();

    Ok(ParsedFeed { title, entries })
}

/// The link pointing at the entry itself: the first one without a `rel` or
/// with `rel="alternate"`, else the first link of any kind.
fn article_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
}

// Used by feed-rs only when the document has no guid/id for an entry.
fn fallback_id(links: &[Link], title: &Option<Text>, _base: Option<&str>) -> String {
    article_link(links)
        .map(|l| l.href.clone())
        .filter(|href| !href.is_empty())
        .or_else(|| title.as_ref().map(|t| t.content.clone()))
        .unwrap_or_default()
}

/// Strip HTML tags and decode the common entities, collapsing whitespace.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the handful of HTML entities feeds and browsers commonly emit.
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_EXCERPT_LENGTH {
        text.to_string()
    } else {
        text.chars().take(MAX_EXCERPT_LENGTH).collect()
    }
}
