/// Check an entry against include and exclude words.
///
/// Matching is a case-insensitive substring search over `title + " " + body`.
/// Any exclude hit rejects the entry. With no include words every remaining
/// entry passes, otherwise at least one include word must appear.
pub fn matches_keywords<S: AsRef<str>>(
    title: &str,
    body: &str,
    include: &[S],
    exclude: &[S],
) -> bool {
    let haystack = format!("{} {}", title, body).to_lowercase();
    let contains = |word: &S| {
        let word = word.as_ref().trim();
        !word.is_empty() && haystack.contains(&word.to_lowercase())
    };

    if exclude.iter().any(contains) {
        return false;
    }

    include.is_empty() || include.iter().any(contains)
}

/// Merged keyword lists for one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl KeywordSet {
    /// Union of the configured lists and the stored ones, without duplicates.
    pub fn merge(
        static_include: &[String],
        static_exclude: &[String],
        stored_include: Vec<String>,
        stored_exclude: Vec<String>,
    ) -> Self {
        Self {
            include: union(static_include, stored_include),
            exclude: union(static_exclude, stored_exclude),
        }
    }

    /// Whether an entry with this title and body should be delivered.
    pub fn accepts(&self, title: &str, body: &str) -> bool {
        matches_keywords(title, body, &self.include, &self.exclude)
    }
}

fn union(base: &[String], extra: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for word in base.iter().cloned().chain(extra) {
        if !out.iter().any(|w| w.eq_ignore_ascii_case(&word)) {
            out.push(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn test_open_filter_accepts_everything() {
        assert!(matches_keywords("Anything", "at all", NONE, NONE));
        assert!(matches_keywords("", "", NONE, NONE));
    }

    #[test]
    fn test_exclude_only() {
        assert!(!matches_keywords("Buy SPAM now", "", NONE, &["spam"]));
        assert!(!matches_keywords("Title", "this is Spam", NONE, &["spam"]));
        assert!(matches_keywords("Real news", "nothing bad", NONE, &["spam"]));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        assert!(!matches_keywords("News about spam", "", &["news"], &["spam"]));
        assert!(!matches_keywords("Other", "spam", &["news"], &["spam"]));
        assert!(matches_keywords("Daily NEWS", "", &["news"], &["spam"]));
        assert!(!matches_keywords("Weather", "", &["news"], &["spam"]));
    }

    #[test]
    fn test_include_matches_body() {
        assert!(matches_keywords("Headline", "Rust 1.80 released", &["rust"], NONE));
    }

    #[test]
    fn test_match_spans_title_and_body_boundary() {
        // Title and body are joined by a space, so words may not merge across it.
        assert!(!matches_keywords("foo", "bar", &["foobar"], NONE));
        assert!(matches_keywords("foo", "bar", &["foo bar"], NONE));
    }

    #[test]
    fn test_keyword_set_merge_deduplicates() {
        let set = KeywordSet::merge(
            &["rust".to_string()],
            &["spam".to_string()],
            vec!["Rust".to_string(), "tokio".to_string()],
            vec!["ads".to_string()],
        );

        assert_eq!(set.include, vec!["rust", "tokio"]);
        assert_eq!(set.exclude, vec!["spam", "ads"]);
        assert!(set.accepts("tokio 2.0", ""));
        assert!(!set.accepts("rust ads", ""));
    }
}
