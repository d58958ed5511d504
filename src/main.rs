use std::fs::OpenOptions;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wxcrawl::app::AppContext;
use wxcrawl::cli::{commands, Cli, Commands};
use wxcrawl::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing, mirrored to --log without colors
    let file_layer = match &cli.log {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(file_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.store.db_path = db;
    }
    if let Some(cookies) = cli.cookies {
        config.session.cookie_path = cookies;
    }
    if let Commands::Crawl {
        start_page,
        end_page,
        ..
    } = &cli.command
    {
        config.crawler.start_page = start_page.unwrap_or(config.crawler.start_page);
        config.crawler.end_page = end_page.unwrap_or(config.crawler.end_page);
    }

    let mut ctx = AppContext::new(config).await?;

    let outcome = match cli.command {
        Commands::Crawl {
            no_resolve,
            no_content,
            ..
        } => {
            let pages = ctx.config.crawler.pages();
            let options = commands::crawl_options(&ctx, no_resolve, no_content);
            commands::crawl(&mut ctx, pages, options).await
        }
        Commands::Page {
            keyword,
            page,
            no_resolve,
            no_content,
        } => {
            let options = commands::crawl_options(&ctx, no_resolve, no_content);
            commands::crawl_page(&mut ctx, &keyword, page, options).await
        }
        Commands::Login { force } => commands::login(&mut ctx, force).await,
        Commands::List { limit } => commands::list_articles(&ctx, limit),
        Commands::Stats => commands::show_stats(&ctx),
    };

    ctx.shutdown().await;
    outcome?;

    Ok(())
}
