pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wxcrawl")]
#[command(about = "Keyword crawler for WeChat articles via Sogou search", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/wxcrawl/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Article database path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Login cookie file path
    #[arg(long, global = true)]
    pub cookies: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(short, long, global = true)]
    pub log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl every keyword in the accounts file
    Crawl {
        /// First page to crawl
        #[arg(long)]
        start_page: Option<u32>,

        /// Page to stop before
        #[arg(long)]
        end_page: Option<u32>,

        /// Only search, don't resolve article links
        #[arg(long)]
        no_resolve: bool,

        /// Resolve links but don't fetch or store articles
        #[arg(long)]
        no_content: bool,
    },
    /// Crawl a single results page
    Page {
        /// Search keyword
        keyword: String,

        /// Page number
        page: u32,

        #[arg(long)]
        no_resolve: bool,

        #[arg(long)]
        no_content: bool,
    },
    /// Log in by scanning the QR code, saving the session cookies
    Login {
        /// Log in even if a saved session exists
        #[arg(short, long)]
        force: bool,
    },
    /// List recently stored articles
    List {
        /// Number of articles to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Show stored article and request counts
    Stats,
}
