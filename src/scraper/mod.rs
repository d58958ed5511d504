//! Page parsing for the crawl pipeline.
//!
//! All three parsers are pure functions of a page body; fetching is the
//! pipeline's job.
//!
//! ```text
//! listing page  → SearchResultParser → ArticleRecord (indirect_url)
//! redirect page → UrlResolver        → resolved_url
//! article page  → ContentExtractor   → body
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use wxcrawl::scraper::{ContentExtractor, SearchResultParser, UrlResolver};
//!
//! let records = SearchResultParser::new("https://weixin.sogou.com").parse(&listing_html);
//! let url = UrlResolver::new().resolve(&redirect_html);
//! let text = ContentExtractor::default().extract(&article_html);
//! ```

mod config;
mod extractor;
mod resolver;
mod search;

pub use config::ExtractorConfig;
pub use extractor::ContentExtractor;
pub use resolver::{UrlResolver, DEFAULT_ARTICLE_PATTERN};
pub use search::{format_unix_local, publish_time_from_script, SearchResultParser, PLATFORM_BOILERPLATE};
