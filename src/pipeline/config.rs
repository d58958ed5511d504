use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::fetcher::{FETCH_WORKERS, RESOLVE_WORKERS};

/// Configuration for the crawl driving loop and its batch stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// File with one search keyword per line
    pub accounts_file: PathBuf,

    /// First page to crawl for every keyword (default: 1)
    pub start_page: u32,

    /// Page number the run stops before (default: 3000)
    pub end_page: u32,

    /// Resolve redirect links into article URLs (default: true)
    pub resolve_urls: bool,

    /// Fetch and store article bodies; needs `resolve_urls` (default: true)
    pub fetch_content: bool,

    /// Concurrent redirect page requests (default: 3)
    pub resolve_concurrency: usize,

    /// Concurrent article page requests (default: 2)
    pub fetch_concurrency: usize,

    /// Pause after each redirect page request in milliseconds (default: 1000)
    pub resolve_pause_ms: u64,

    /// Pause after each article page request in milliseconds (default: 2000)
    pub fetch_pause_ms: u64,

    /// Random pause between pages, lower bound in milliseconds (default: 3000)
    pub page_pause_min_ms: u64,

    /// Random pause between pages, upper bound in milliseconds (default: 5000)
    pub page_pause_max_ms: u64,

    /// Wait before re-authenticating after an empty search in seconds (default: 60)
    pub empty_cooldown_secs: u64,

    /// Consecutive exhausted pages that end the run (default: 1)
    pub max_consecutive_empty: u32,

    /// Random pause after the homepage visit, lower bound in milliseconds (default: 2000)
    pub warmup_pause_min_ms: u64,

    /// Random pause after the homepage visit, upper bound in milliseconds (default: 4000)
    pub warmup_pause_max_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            accounts_file: default_accounts_file(),
            start_page: 1,
            end_page: 3000,
            resolve_urls: true,
            fetch_content: true,
            resolve_concurrency: RESOLVE_WORKERS,
            fetch_concurrency: FETCH_WORKERS,
            resolve_pause_ms: 1000,
            fetch_pause_ms: 2000,
            page_pause_min_ms: 3000,
            page_pause_max_ms: 5000,
            empty_cooldown_secs: 60,
            max_consecutive_empty: 1,
            warmup_pause_min_ms: 2000,
            warmup_pause_max_ms: 4000,
        }
    }
}

impl CrawlerConfig {
    pub fn pages(&self) -> Range<u32> {
        self.start_page..self.end_page
    }

    pub fn resolve_pause(&self) -> Duration {
        Duration::from_millis(self.resolve_pause_ms)
    }

    pub fn fetch_pause(&self) -> Duration {
        Duration::from_millis(self.fetch_pause_ms)
    }

    pub fn empty_cooldown(&self) -> Duration {
        Duration::from_secs(self.empty_cooldown_secs)
    }

    pub fn page_pause(&self) -> Duration {
        random_pause(self.page_pause_min_ms, self.page_pause_max_ms)
    }

    pub fn warmup_pause(&self) -> Duration {
        random_pause(self.warmup_pause_min_ms, self.warmup_pause_max_ms)
    }
}

/// Uniform pause in `[min_ms, max_ms]`. Bounds given in the wrong order are swapped.
fn random_pause(min_ms: u64, max_ms: u64) -> Duration {
    let (low, high) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    if low == high {
        return Duration::from_millis(low);
    }
    Duration::from_millis(rand::rng().random_range(low..=high))
}

/// `<config dir>/wxcrawl/accounts.txt`
fn default_accounts_file() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("wxcrawl").join("accounts.txt"))
        .unwrap_or_else(|| PathBuf::from("accounts.txt"))
}
