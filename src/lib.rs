//! # wxcrawl
//!
//! A keyword crawler for WeChat public-account articles, reached through
//! Sogou's WeChat search.
//!
//! ## Architecture
//!
//! One control task drives a four-stage pipeline per (keyword, page):
//!
//! ```text
//! Search → Resolve → Fetch → Store
//! ```
//!
//! Resolve and fetch fan out over a bounded worker pool. An empty search is
//! taken as a dead session: the login is redone once and the page retried.
//!
//! ## Quick Start
//!
//! ```bash
//! # Scan the QR code once, cookies are saved for later runs
//! wxcrawl login
//!
//! # Crawl every keyword in ~/.config/wxcrawl/accounts.txt
//! wxcrawl crawl --start-page 1 --end-page 10
//!
//! # One page, search and resolve only
//! wxcrawl page 养老 1 --no-content
//!
//! # Show what was stored
//! wxcrawl list -n 50
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// the HTTP session, the login browser and the pipeline.
pub mod app;

/// Command-line interface using clap.
///
/// - `crawl` - Crawl all configured keywords
/// - `page <keyword> <page>` - Crawl one results page
/// - `login [--force]` - Scan the QR code and save the session
/// - `list [-n N]` - Show recently stored articles
/// - `stats` - Show article and request counts
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/wxcrawl/config.toml` and reads the keyword list.
pub mod config;

/// Core domain models.
///
/// - [`ArticleRecord`](domain::ArticleRecord): One search result, with SHA256 fingerprint
/// - [`CrawlJob`](domain::CrawlJob): One (keyword, page) unit of work
/// - [`CrawlResult`](domain::CrawlResult) / [`RunReport`](domain::RunReport): Outcomes
pub mod domain;

/// HTTP access shared by every stage.
///
/// - [`HttpSession`](fetcher::HttpSession): Async trait for cookie-carrying GETs
/// - [`ReqwestSession`](fetcher::ReqwestSession): reqwest-based implementation
/// - [`BatchRunner`](fetcher::BatchRunner): Concurrent batch map with semaphore
pub mod fetcher;

/// The crawl pipeline and its driving loop.
pub mod pipeline;

/// HTML and script parsing.
///
/// - [`SearchResultParser`](scraper::SearchResultParser): Listing pages into records
/// - [`UrlResolver`](scraper::UrlResolver): Redirect pages into article URLs
/// - [`ContentExtractor`](scraper::ContentExtractor): Article pages into plain text
pub mod scraper;

/// Login session lifecycle.
///
/// Uses headed Chrome via chromiumoxide to show the login QR code and
/// capture cookies once it has been scanned.
pub mod session;

/// SQLite persistence layer.
///
/// - [`ArticleStore`](store::ArticleStore): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
