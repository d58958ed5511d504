use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Search engine origin, without trailing slash
    pub base_url: String,

    /// User agent string sent with every request
    pub user_agent: String,

    /// Accept-Language header value
    pub accept_language: String,

    /// Timeout for listing page requests in seconds (default: 15)
    pub search_timeout_secs: u64,

    /// Timeout for redirect page requests in seconds (default: 10)
    pub resolve_timeout_secs: u64,

    /// Timeout for article page requests in seconds (default: 15)
    pub fetch_timeout_secs: u64,

    /// Visit the homepage before each search (default: true)
    pub warmup: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://weixin.sogou.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "zh-CN,zh;q=0.9,ja;q=0.8".to_string(),
            search_timeout_secs: 15,
            resolve_timeout_secs: 10,
            fetch_timeout_secs: 15,
            warmup: true,
        }
    }
}

impl HttpConfig {
    pub fn home_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }

    pub fn search_url(&self) -> String {
        format!("{}/weixin", self.base_url.trim_end_matches('/'))
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
