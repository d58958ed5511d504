//! Search → resolve → fetch → persist, for one page or a whole run.

pub mod config;

use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::app::{CrawlError, Result};
use crate::domain::{ArticleRecord, CrawlJob, CrawlOptions, CrawlResult, PageReport, RunReport};
use crate::fetcher::{BatchRunner, HttpConfig, HttpSession, RequestStats};
use crate::scraper::{ContentExtractor, ExtractorConfig, SearchResultParser, UrlResolver};
use crate::session::SessionManager;
use crate::store::ArticleStore;

pub use config::CrawlerConfig;

/// Drives crawl jobs on a single control task. Concurrency only happens
/// inside the resolve and fetch batches, and login only ever runs between
/// them, since it needs `&mut self`.
pub struct CrawlPipeline {
    session: SessionManager,
    http: Arc<dyn HttpSession>,
    store: Arc<dyn ArticleStore + Send + Sync>,
    parser: SearchResultParser,
    resolver: Arc<UrlResolver>,
    extractor: Arc<ContentExtractor>,
    http_config: HttpConfig,
    config: CrawlerConfig,
}

impl CrawlPipeline {
    /// `http` must be the same session the [`SessionManager`] installs cookies into.
    pub fn new(
        session: SessionManager,
        http: Arc<dyn HttpSession>,
        store: Arc<dyn ArticleStore + Send + Sync>,
        http_config: HttpConfig,
        extractor_config: &ExtractorConfig,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            session,
            http,
            store,
            parser: SearchResultParser::new(http_config.base_url.clone()),
            resolver: Arc::new(UrlResolver::new()),
            extractor: Arc::new(ContentExtractor::new(extractor_config)),
            http_config,
            config,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager {
        &mut self.session
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn stats(&self) -> RequestStats {
        self.http.stats()
    }

    pub fn reset_stats(&self) {
        self.http.reset_stats()
    }

    /// Crawl one page of results for `keyword`. Never fails: problems end up
    /// in the returned [`CrawlResult`].
    pub async fn crawl_one(
        &mut self,
        keyword: &str,
        page: u32,
        options: &CrawlOptions,
    ) -> CrawlResult {
        let job = CrawlJob::new(keyword, page).with_time_range(options.time_range);
        info!("Crawling '{}' page {}", job.keyword, job.page);

        match self.run_job(&job, options).await {
            Ok(result) => {
                info!("'{}' page {}: {}", job.keyword, job.page, result.message);
                result
            }
            Err(e) => {
                error!("'{}' page {} failed: {}", job.keyword, job.page, e);
                CrawlResult::failed(e.to_string())
            }
        }
    }

    /// Crawl `pages` for every keyword in turn.
    ///
    /// Page failures are recorded and the loop moves on. The run halts once
    /// `max_consecutive_empty` pages in a row came back exhausted.
    pub async fn crawl_all(
        &mut self,
        keywords: &[String],
        options: &CrawlOptions,
        pages: Range<u32>,
    ) -> RunReport {
        let Some(first) = keywords.first() else {
            return RunReport::failed("No keywords to crawl");
        };

        self.session.set_keyword(first.as_str());
        if !self.session.login(false).await {
            return RunReport::failed("Login failed, nothing crawled");
        }

        let threshold = self.config.max_consecutive_empty.max(1);
        let mut report = RunReport::default();
        let mut consecutive_empty = 0;

        'keywords: for keyword in keywords {
            self.session.set_keyword(keyword.as_str());
            info!("Keyword '{}', pages {}..{}", keyword, pages.start, pages.end);

            for page in pages.clone() {
                let result = self.crawl_one(keyword, page, options).await;

                if result.exhausted {
                    consecutive_empty += 1;
                } else {
                    consecutive_empty = 0;
                }
                report.pages.push(PageReport {
                    keyword: keyword.clone(),
                    page,
                    result,
                });

                if consecutive_empty >= threshold {
                    warn!(
                        "{} exhausted page(s) in a row, stopping the run at '{}' page {}",
                        consecutive_empty, keyword, page
                    );
                    report.halted = true;
                    break 'keywords;
                }

                let pause = self.config.page_pause();
                debug!("Sleeping {:?} before next page", pause);
                tokio::time::sleep(pause).await;
            }
        }

        let failed = report.pages.iter().filter(|p| !p.result.success).count();
        report.success = report.pages.iter().any(|p| p.result.success);
        report.message = format!(
            "Crawled {} pages ({} failed), fetched {} articles{}",
            report.pages.len(),
            failed,
            report.fetched_count(),
            if report.halted { ", halted" } else { "" }
        );
        info!("{}", report.message);
        report
    }

    async fn run_job(&mut self, job: &CrawlJob, options: &CrawlOptions) -> Result<CrawlResult> {
        if !job.time_range.is_unbounded() {
            debug!("Time range {:?} is not applied to search results", job.time_range);
        }

        self.session.set_keyword(job.keyword.as_str());
        if !self.session.is_authenticated() && !self.session.login(false).await {
            return Err(CrawlError::Login("not logged in and login failed".into()));
        }

        let mut records = self.search(&job.keyword, job.page).await;

        if records.is_empty() {
            let cooldown = self.config.empty_cooldown();
            warn!(
                "No results for '{}' page {}, session may be dead; retrying login in {:?}",
                job.keyword, job.page, cooldown
            );
            tokio::time::sleep(cooldown).await;

            if !self.session.invalidate_and_retry().await {
                return Err(CrawlError::Login(
                    "re-login after empty search failed".into(),
                ));
            }

            records = self.search(&job.keyword, job.page).await;
            if records.is_empty() {
                return Ok(CrawlResult::exhausted(format!(
                    "No results for '{}' page {} after re-login",
                    job.keyword, job.page
                )));
            }
        }

        let found = records.len();

        if options.resolve_urls {
            records = self.resolve_all(records).await;

            if options.fetch_content {
                self.fetch_all(&mut records).await;
            }
        }

        let resolved = records.iter().filter(|r| r.resolved).count();
        let fetched = records.iter().filter(|r| r.content_fetched).count();
        Ok(CrawlResult::succeeded(
            format!("found {}, resolved {}, fetched {}", found, resolved, fetched),
            records,
        ))
    }

    /// Fetch and parse one listing page. Request failures give an empty list.
    async fn search(&self, keyword: &str, page: u32) -> Vec<ArticleRecord> {
        let timeout = self.http_config.search_timeout();

        if self.http_config.warmup {
            if let Err(e) = self.http.get(&self.http_config.home_url(), &[], timeout).await {
                debug!("Homepage visit failed: {}", e);
            }
            tokio::time::sleep(self.config.warmup_pause()).await;
        }

        let page = page.to_string();
        let params = [
            ("query", keyword),
            ("_sug_type_", ""),
            ("s_from", "input"),
            ("_sug_", "y"),
            ("type", "2"),
            ("page", page.as_str()),
            ("ie", "utf8"),
        ];

        match self.http.get(&self.http_config.search_url(), &params, timeout).await {
            Ok(response) => {
                let mut records = self.parser.parse(&response.body);
                for record in &mut records {
                    record.keyword = keyword.to_string();
                }
                info!("Search '{}' page {}: {} results", keyword, page, records.len());
                records
            }
            Err(e) => {
                error!("Search '{}' page {} failed: {}", keyword, page, e);
                Vec::new()
            }
        }
    }

    async fn resolve_all(&self, records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
        let http = self.http.clone();
        let resolver = self.resolver.clone();
        let timeout = self.http_config.resolve_timeout();
        let pause = self.config.resolve_pause();

        BatchRunner::new(self.config.resolve_concurrency)
            .run(records, move |mut record: ArticleRecord| {
                let http = http.clone();
                let resolver = resolver.clone();
                async move {
                    if record.indirect_url.is_empty() {
                        return record;
                    }
                    match http.get(&record.indirect_url, &[], timeout).await {
                        Ok(response) => match resolver.resolve(&response.body) {
                            Some(url) => record.mark_resolved(url),
                            None => debug!("No article link on redirect page for '{}'", record.title),
                        },
                        Err(e) => warn!("Failed to resolve '{}': {}", record.title, e),
                    }
                    tokio::time::sleep(pause).await;
                    record
                }
            })
            .await
    }

    /// Fetch every resolved record in place and store the ones that succeed.
    async fn fetch_all(&self, records: &mut [ArticleRecord]) {
        let batch: Vec<(usize, ArticleRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.resolved)
            .map(|(index, record)| (index, record.clone()))
            .collect();
        if batch.is_empty() {
            return;
        }

        let http = self.http.clone();
        let extractor = self.extractor.clone();
        let store = self.store.clone();
        let timeout = self.http_config.fetch_timeout();
        let pause = self.config.fetch_pause();

        let fetched = BatchRunner::new(self.config.fetch_concurrency)
            .run(batch, move |(index, mut record): (usize, ArticleRecord)| {
                let http = http.clone();
                let extractor = extractor.clone();
                let store = store.clone();
                async move {
                    match http.get(&record.resolved_url, &[], timeout).await {
                        Ok(response) => {
                            let body = extractor.extract(&response.body);
                            if body.is_empty() {
                                debug!("No text extracted from {}", record.resolved_url);
                            }
                            record.mark_fetched(body);
                            persist(store.as_ref(), &record);
                        }
                        Err(e) => warn!("Failed to fetch '{}': {}", record.title, e),
                    }
                    tokio::time::sleep(pause).await;
                    (index, record)
                }
            })
            .await;

        for (index, record) in fetched {
            records[index] = record;
        }
    }
}

/// Store errors are logged and never fail the record.
fn persist(store: &(dyn ArticleStore + Send + Sync), record: &ArticleRecord) {
    if !record.is_persistable() {
        debug!("Not saving unfetched '{}'", record.title);
        return;
    }
    match store.save(record) {
        Ok(true) => info!("Saved '{}'", record.title),
        Ok(false) => debug!("Already stored: '{}'", record.title),
        Err(e) => error!("Failed to save '{}': {}", record.title, e),
    }
}
