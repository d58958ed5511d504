use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ArticleRecord;

/// Publish-time window a crawl was asked for.
///
/// Accepted and carried through, not yet applied to search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Which stages of the pipeline run for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    pub resolve_urls: bool,
    /// Only honoured together with `resolve_urls`.
    pub fetch_content: bool,
    pub time_range: TimeRange,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            resolve_urls: true,
            fetch_content: false,
            time_range: TimeRange::default(),
        }
    }
}

/// One (keyword, page) unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub keyword: String,
    pub page: u32,
    pub time_range: TimeRange,
}

impl CrawlJob {
    pub fn new(keyword: impl Into<String>, page: u32) -> Self {
        Self {
            keyword: keyword.into(),
            page,
            time_range: TimeRange::default(),
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }
}

/// Outcome of crawling one page.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub success: bool,
    pub message: String,
    pub records: Vec<ArticleRecord>,
    /// Search stayed empty even after re-authenticating. The driving loop
    /// treats this as the end of the run.
    pub exhausted: bool,
}

impl CrawlResult {
    pub fn succeeded(message: impl Into<String>, records: Vec<ArticleRecord>) -> Self {
        Self {
            success: true,
            message: message.into(),
            records,
            exhausted: false,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            records: Vec::new(),
            exhausted: false,
        }
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            records: Vec::new(),
            exhausted: true,
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.records.iter().filter(|r| r.resolved).count()
    }

    pub fn fetched_count(&self) -> usize {
        self.records.iter().filter(|r| r.content_fetched).count()
    }
}

#[derive(Debug, Clone)]
pub struct PageReport {
    pub keyword: String,
    pub page: u32,
    pub result: CrawlResult,
}

/// Outcome of a multi-keyword run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub success: bool,
    pub message: String,
    pub pages: Vec<PageReport>,
    /// The run stopped early on the terminal condition.
    pub halted: bool,
}

impl RunReport {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            pages: Vec::new(),
            halted: false,
        }
    }

    pub fn fetched_count(&self) -> usize {
        self.pages.iter().map(|p| p.result.fetched_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CrawlOptions::default();
        assert!(options.resolve_urls);
        assert!(!options.fetch_content);
        assert!(options.time_range.is_unbounded());
    }

    #[test]
    fn test_result_counts() {
        let mut resolved = ArticleRecord::new("a");
        resolved.mark_resolved("https://example.com/a");
        let mut fetched = ArticleRecord::new("b");
        fetched.mark_resolved("https://example.com/b");
        fetched.mark_fetched("text");

        let result = CrawlResult::succeeded("ok", vec![ArticleRecord::new("c"), resolved, fetched]);
        assert_eq!(result.resolved_count(), 2);
        assert_eq!(result.fetched_count(), 1);
        assert!(!result.exhausted);
    }

    #[test]
    fn test_exhausted_is_not_success() {
        let result = CrawlResult::exhausted("still empty");
        assert!(!result.success);
        assert!(result.exhausted);
    }
}
