use std::ops::Range;

use crate::app::{AppContext, CrawlError, Result};
use crate::config::load_keywords;
use crate::domain::{CrawlOptions, CrawlResult};
use crate::store::ArticleStore;

/// Stage switches from config, narrowed by `--no-resolve` / `--no-content`.
pub fn crawl_options(ctx: &AppContext, no_resolve: bool, no_content: bool) -> CrawlOptions {
    CrawlOptions {
        resolve_urls: ctx.config.crawler.resolve_urls && !no_resolve,
        fetch_content: ctx.config.crawler.fetch_content && !no_content,
        ..Default::default()
    }
}

fn keywords(ctx: &AppContext) -> Result<Vec<String>> {
    load_keywords(&ctx.config.crawler.accounts_file).map_err(|e| CrawlError::Config(e.to_string()))
}

pub async fn crawl(ctx: &mut AppContext, pages: Range<u32>, options: CrawlOptions) -> Result<()> {
    let keywords = keywords(ctx)?;
    if keywords.is_empty() {
        println!(
            "No keywords in {}",
            ctx.config.crawler.accounts_file.display()
        );
        return Ok(());
    }

    println!(
        "Crawling {} keywords, pages {}..{}",
        keywords.len(),
        pages.start,
        pages.end
    );

    let report = ctx.pipeline.crawl_all(&keywords, &options, pages).await;

    for page in &report.pages {
        print_page(&page.keyword, page.page, &page.result);
    }
    println!("{}", report.message);
    print_request_stats(ctx);

    if !report.success {
        return Err(CrawlError::Other(report.message));
    }
    Ok(())
}

pub async fn crawl_page(
    ctx: &mut AppContext,
    keyword: &str,
    page: u32,
    options: CrawlOptions,
) -> Result<()> {
    let result = ctx.pipeline.crawl_one(keyword, page, &options).await;

    print_page(keyword, page, &result);
    for record in &result.records {
        let marker = if record.content_fetched {
            "+"
        } else if record.resolved {
            "~"
        } else {
            " "
        };
        println!(
            "  {} {} [{}] {}",
            marker,
            record.publish_time.as_deref().unwrap_or("                   "),
            record.display_source(),
            record.title
        );
    }
    print_request_stats(ctx);

    if !result.success {
        return Err(CrawlError::Other(result.message));
    }
    Ok(())
}

/// The login flow searches for a keyword to reach the login control; the
/// first configured one is used.
pub async fn login(ctx: &mut AppContext, force: bool) -> Result<()> {
    let keyword = keywords(ctx)?
        .into_iter()
        .next()
        .ok_or_else(|| CrawlError::Config("no keywords configured".into()))?;

    let session = ctx.pipeline.session_mut();
    session.set_keyword(keyword);

    if session.login(force).await {
        println!("Logged in, cookies saved to {}", session.state().cookie_path.display());
        Ok(())
    } else {
        Err(CrawlError::Login("QR code was not scanned in time".into()))
    }
}

pub fn list_articles(ctx: &AppContext, limit: usize) -> Result<()> {
    let records = ctx.store.recent(limit)?;

    if records.is_empty() {
        println!("No articles");
        return Ok(());
    }

    for record in records {
        let date = record
            .publish_time
            .as_deref()
            .and_then(|t| t.get(..10))
            .unwrap_or("          ");
        println!("{} {} [{}]", date, record.title, record.display_source());
        println!("  {}", record.resolved_url);
    }

    Ok(())
}

pub fn show_stats(ctx: &AppContext) -> Result<()> {
    println!("Stored articles: {}", ctx.store.count()?);
    println!(
        "Session: {}",
        if ctx.pipeline.session().is_authenticated() {
            "saved login"
        } else {
            "not logged in"
        }
    );
    print_request_stats(ctx);
    Ok(())
}

fn print_page(keyword: &str, page: u32, result: &CrawlResult) {
    let status = if result.exhausted {
        "EXHAUSTED"
    } else if result.success {
        "ok"
    } else {
        "FAILED"
    };
    println!("{} page {}: {} ({})", keyword, page, status, result.message);
}

fn print_request_stats(ctx: &AppContext) {
    let stats = ctx.pipeline.stats();
    println!(
        "Requests: {} total, {} ok, {} failed ({:.0}% success), {} bytes",
        stats.total,
        stats.succeeded,
        stats.failed,
        stats.success_rate() * 100.0,
        stats.bytes_received
    );
}
