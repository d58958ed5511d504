//! Configuration management for wxcrawl.
//!
//! Configuration is read from `~/.config/wxcrawl/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The keyword list lives in a separate plain-text file (`crawler.accounts_file`).

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fetcher::HttpConfig;
use crate::pipeline::CrawlerConfig;
use crate::scraper::ExtractorConfig;
use crate::session::SessionConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub session: SessionConfig,
    pub extractor: ExtractorConfig,
    pub store: StoreConfig,
}

/// Article database location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_dir()
                .map(|d| d.join("wxcrawl").join("articles.db"))
                .unwrap_or_else(|| PathBuf::from("articles.db")),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/wxcrawl/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("wxcrawl").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# wxcrawl configuration
#
# Paths left commented out default to the platform data/config directories.

[crawler]
# One keyword per line; blank lines and lines starting with '#' are ignored
# accounts_file = "~/.config/wxcrawl/accounts.txt"

# Pages to crawl per keyword: start_page <= page < end_page
start_page = 1
end_page = 3000

# Stages to run after the search itself
resolve_urls = true
fetch_content = true

# Concurrent requests per stage
resolve_concurrency = 3
fetch_concurrency = 2

# Pause after each request in a stage (milliseconds)
resolve_pause_ms = 1000
fetch_pause_ms = 2000

# Random pause between pages (milliseconds)
page_pause_min_ms = 3000
page_pause_max_ms = 5000

# An empty search usually means the session died: wait, log in again, retry once
empty_cooldown_secs = 60

# Stop the run after this many pages in a row stay empty after re-login
max_consecutive_empty = 1

# Random pause after visiting the homepage before a search (milliseconds)
warmup_pause_min_ms = 2000
warmup_pause_max_ms = 4000

[http]
base_url = "https://weixin.sogou.com"
accept_language = "zh-CN,zh;q=0.9,ja;q=0.8"

# Request timeouts (seconds)
search_timeout_secs = 15
resolve_timeout_secs = 10
fetch_timeout_secs = 15

# Visit the homepage before each search
warmup = true

[session]
# cookie_path = "~/.local/share/wxcrawl/cookies.json"

# Wait for the login code to be scanned: login_ticks polls, poll_interval_ms apart
login_ticks = 60
poll_interval_ms = 1000

# A cookie whose name contains one of these means the login went through
auth_cookie_markers = ["suid", "sct", "ssuid", "login"]

# The login code has to be scanned, so the browser window is shown by default
headless = false

[extractor]
# CSS selectors to try for article content (in priority order)
content_selectors = [
    "#js_content",
    ".rich_media_content",
    ".article-content",
    ".content",
    "article",
    ".post-content",
]

# Elements whose text is dropped
remove_selectors = ["script", "style"]

[store]
# db_path = "~/.local/share/wxcrawl/articles.db"
"##
        .to_string()
    }
}

/// Read the keyword list: one keyword per line, blank and `#` lines skipped.
///
/// A missing file yields an empty list.
pub fn load_keywords(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Keyword file {} not found", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
