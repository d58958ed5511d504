use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Longest summary kept on a record, in characters.
pub const SUMMARY_MAX_CHARS: usize = 300;

/// One article discovered on a search listing page.
///
/// A record starts out holding only listing data. The resolve stage fills
/// `resolved_url`, the fetch stage fills `body`; the two flags track which
/// of those stages succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub publish_time: Option<String>,
    /// Search term that surfaced this record.
    pub keyword: String,
    pub indirect_url: String,
    pub resolved_url: String,
    pub body: String,
    pub crawled_at: DateTime<Utc>,
    pub resolved: bool,
    pub content_fetched: bool,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: None,
            source: None,
            publish_time: None,
            keyword: String::new(),
            indirect_url: String::new(),
            resolved_url: String::new(),
            body: String::new(),
            crawled_at: Utc::now(),
            resolved: false,
            content_fetched: false,
        }
    }

    /// Identity used for storage deduplication, derived from title and publish time.
    pub fn fingerprint(&self) -> String {
        Self::generate_fingerprint(&self.title, self.publish_time.as_deref().unwrap_or(""))
    }

    pub fn generate_fingerprint(title: &str, publish_time: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update([0x1f]);
        hasher.update(publish_time.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn mark_resolved(&mut self, url: impl Into<String>) {
        self.resolved_url = url.into();
        self.resolved = !self.resolved_url.is_empty();
    }

    /// Record a fetched body. Ignored for unresolved records, so that
    /// `content_fetched` always implies `resolved`.
    pub fn mark_fetched(&mut self, body: impl Into<String>) {
        if !self.resolved {
            return;
        }
        self.body = body.into();
        self.content_fetched = true;
    }

    /// Only fully fetched records are written to the store.
    pub fn is_persistable(&self) -> bool {
        self.content_fetched
    }

    /// Truncate to [`SUMMARY_MAX_CHARS`] characters, appending `...` when cut.
    pub fn clip_summary(text: &str) -> String {
        if text.chars().count() > SUMMARY_MAX_CHARS {
            let mut clipped: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
            clipped.push_str("...");
            clipped
        } else {
            text.to_string()
        }
    }

    pub fn display_source(&self) -> &str {
        self.source.as_deref().unwrap_or("(unknown source)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = ArticleRecord::generate_fingerprint("Title", "2024-01-01 08:00:00");
        let b = ArticleRecord::generate_fingerprint("Title", "2024-01-01 08:00:00");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_depends_on_title_and_time() {
        let base = ArticleRecord::generate_fingerprint("Title", "2024-01-01 08:00:00");
        assert_ne!(base, ArticleRecord::generate_fingerprint("Other", "2024-01-01 08:00:00"));
        assert_ne!(base, ArticleRecord::generate_fingerprint("Title", "2024-01-02 08:00:00"));
        // field boundary matters
        assert_ne!(
            ArticleRecord::generate_fingerprint("ab", "c"),
            ArticleRecord::generate_fingerprint("a", "bc")
        );
    }

    #[test]
    fn test_fingerprint_ignores_crawl_state() {
        let mut a = ArticleRecord::new("Same");
        let b = ArticleRecord::new("Same");
        a.mark_resolved("https://mp.weixin.qq.com/s?x=1");
        a.mark_fetched("body");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_mark_fetched_requires_resolved() {
        let mut record = ArticleRecord::new("T");
        record.mark_fetched("text");
        assert!(!record.content_fetched);
        assert!(record.body.is_empty());

        record.mark_resolved("https://example.com/a");
        record.mark_fetched("text");
        assert!(record.resolved);
        assert!(record.content_fetched);
        assert!(record.is_persistable());
    }

    #[test]
    fn test_mark_resolved_empty_url_stays_unresolved() {
        let mut record = ArticleRecord::new("T");
        record.mark_resolved("");
        assert!(!record.resolved);
    }

    #[test]
    fn test_clip_summary() {
        assert_eq!(ArticleRecord::clip_summary("short"), "short");

        let exact = "a".repeat(SUMMARY_MAX_CHARS);
        assert_eq!(ArticleRecord::clip_summary(&exact), exact);

        let long = "字".repeat(SUMMARY_MAX_CHARS + 5);
        let clipped = ArticleRecord::clip_summary(&long);
        assert!(clipped.ends_with("..."));
        assert_eq!(clipped.chars().count(), SUMMARY_MAX_CHARS + 3);
    }
}
