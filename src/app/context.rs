use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::{HttpSession, ReqwestSession};
use crate::pipeline::CrawlPipeline;
use crate::session::{BrowserOptions, ChromeLoginBrowser, SessionManager};
use crate::store::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub http: Arc<ReqwestSession>,
    pub pipeline: CrawlPipeline,
}

impl AppContext {
    /// Open the store, build the HTTP session and restore any saved login.
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(&config.store.db_path)?);
        let http = Arc::new(ReqwestSession::new(&config.http)?);

        let browser = Arc::new(ChromeLoginBrowser::new(BrowserOptions {
            headless: config.session.headless,
            home_url: config.http.home_url(),
            user_agent: Some(config.http.user_agent.clone()),
            qr_wait: config.session.qr_wait(),
        }));

        let shared: Arc<dyn HttpSession> = http.clone();
        let mut session =
            SessionManager::new(shared.clone(), browser, config.session.clone(), String::new());
        session.load_persisted_session().await;

        let pipeline = CrawlPipeline::new(
            session,
            shared,
            store.clone(),
            config.http.clone(),
            &config.extractor,
            config.crawler.clone(),
        );

        Ok(Self {
            config,
            store,
            http,
            pipeline,
        })
    }

    pub async fn shutdown(&self) {
        self.pipeline.session().shutdown().await;
    }
}
