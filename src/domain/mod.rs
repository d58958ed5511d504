pub mod article;
pub mod job;

pub use article::ArticleRecord;
pub use job::{CrawlJob, CrawlOptions, CrawlResult, PageReport, RunReport, TimeRange};
