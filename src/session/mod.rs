//! Authenticated session lifecycle.
//!
//! [`SessionManager`] is the only writer of [`SessionState`]. It restores
//! cookies persisted by an earlier run, drives the QR-code login through a
//! [`LoginBrowser`], and tears the session down when the search engine
//! starts returning empty pages.
//!
//! ```text
//! Unauthenticated ──login──▶ Authenticating ──confirmed──▶ Authenticated
//!        ▲                         │                            │
//!        └────────timeout/error────┘◀──────empty search─────────┘
//! ```

pub mod browser;
pub mod config;
pub mod login;

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::app::{CrawlError, Result};
use crate::fetcher::{CookieJar, HttpSession, StoredCookie};

pub use browser::{BrowserOptions, ChromeLoginBrowser, LoginBrowser, LoginPage};
pub use config::SessionConfig;
pub use login::{is_auth_cookie, LoginPhase, LoginPoller};

/// Process-wide authentication state. The cookie store itself lives in the
/// shared [`HttpSession`].
#[derive(Debug, Clone)]
pub struct SessionState {
    pub authenticated: bool,
    /// Search term typed into the homepage to reach the login control.
    pub keyword: String,
    pub cookie_path: PathBuf,
}

pub struct SessionManager {
    state: SessionState,
    phase: LoginPhase,
    http: Arc<dyn HttpSession>,
    browser: Arc<dyn LoginBrowser>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        http: Arc<dyn HttpSession>,
        browser: Arc<dyn LoginBrowser>,
        config: SessionConfig,
        keyword: impl Into<String>,
    ) -> Self {
        let state = SessionState {
            authenticated: false,
            keyword: keyword.into(),
            cookie_path: config.cookie_path.clone(),
        };
        Self {
            state,
            phase: LoginPhase::Idle,
            http,
            browser,
            config,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.state.keyword = keyword.into();
    }

    /// Restore cookies saved by a previous login. Never fails: any problem,
    /// including a missing file, leaves the session unauthenticated.
    pub async fn load_persisted_session(&mut self) -> bool {
        let path = &self.state.cookie_path;
        match CookieJar::load(path) {
            Ok(jar) if !jar.is_empty() => {
                let count = jar.len();
                self.http.set_cookies(jar.cookies().to_vec()).await;
                self.state.authenticated = true;
                info!("Restored {} session cookies from {}", count, path.display());
                true
            }
            Ok(_) => {
                warn!("Cookie file {} is empty", path.display());
                self.state.authenticated = false;
                false
            }
            Err(e) => {
                match e {
                    CrawlError::Io(ref io) if io.kind() == ErrorKind::NotFound => {
                        debug!("No saved session at {}", path.display())
                    }
                    _ => warn!("Failed to load saved session: {}", e),
                }
                self.state.authenticated = false;
                false
            }
        }
    }

    /// Run the login handshake unless already authenticated (or `force`).
    ///
    /// Returns `false` on timeout or on any handshake failure; errors are
    /// logged, never propagated.
    pub async fn login(&mut self, force: bool) -> bool {
        if self.state.authenticated && !force {
            info!("Already authenticated");
            return true;
        }

        match self.handshake().await {
            Ok(true) => {
                info!("Login succeeded");
                true
            }
            Ok(false) => {
                error!(
                    "Login not confirmed within {:?}",
                    self.config.login_window()
                );
                false
            }
            Err(e) => {
                error!("Login handshake failed: {}", e);
                self.phase = LoginPhase::Idle;
                false
            }
        }
    }

    /// Drop the current session (cookie file, cookie store, flag) and log in
    /// again. Used once per empty search result.
    pub async fn invalidate_and_retry(&mut self) -> bool {
        self.invalidate().await;
        info!("Session invalidated, logging in again");
        self.login(true).await
    }

    pub async fn invalidate(&mut self) {
        let path = &self.state.cookie_path;
        match std::fs::remove_file(path) {
            Ok(()) => info!("Removed cookie file {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove cookie file {}: {}", path.display(), e),
        }
        self.http.clear_cookies().await;
        self.state.authenticated = false;
        self.phase = LoginPhase::Idle;
    }

    async fn handshake(&mut self) -> Result<bool> {
        self.phase = LoginPhase::AwaitingScan;

        let page = self.browser.open_login(&self.state.keyword).await?;
        info!(
            "Waiting up to {:?} for the login code to be scanned",
            self.config.login_window()
        );

        let poller = LoginPoller::new(
            &self.config.auth_cookie_markers,
            self.config.login_ticks,
            self.config.poll_interval(),
        );
        self.phase = poller.await_scan(page.as_ref()).await;

        if self.phase != LoginPhase::Confirmed {
            if let Err(e) = page.close().await {
                debug!("Failed to close login page: {}", e);
            }
            return Ok(false);
        }

        let cookies = page.cookies().await;
        if let Err(e) = page.close().await {
            debug!("Failed to close login page: {}", e);
        }

        self.install(cookies?).await;
        Ok(true)
    }

    /// Persist and install captured cookies. A failed write is logged; the
    /// in-memory session is still usable.
    async fn install(&mut self, cookies: Vec<StoredCookie>) {
        let jar = CookieJar::from_cookies(cookies);
        match jar.save(&self.state.cookie_path) {
            Ok(()) => info!(
                "Saved {} cookies to {}",
                jar.len(),
                self.state.cookie_path.display()
            ),
            Err(e) => error!("Failed to save login cookies: {}", e),
        }

        self.http.set_cookies(jar.cookies().to_vec()).await;
        self.state.authenticated = true;
    }

    /// Close the login browser.
    pub async fn shutdown(&self) {
        if let Err(e) = self.browser.shutdown().await {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::app::CrawlError;

    /// Scripted outcome of one `open_login` call.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Attempt {
        Confirm,
        Timeout,
        Fail,
    }

    /// Browser double that plays back a queue of login outcomes.
    pub struct FakeBrowser {
        attempts: Mutex<Vec<Attempt>>,
        pub opened: AtomicUsize,
        pub keywords: Mutex<Vec<String>>,
    }

    impl FakeBrowser {
        pub fn new(attempts: Vec<Attempt>) -> Self {
            Self {
                attempts: Mutex::new(attempts),
                opened: AtomicUsize::new(0),
                keywords: Mutex::new(Vec::new()),
            }
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LoginBrowser for FakeBrowser {
        async fn open_login(&self, keyword: &str) -> Result<Box<dyn LoginPage>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.keywords.lock().unwrap().push(keyword.to_string());
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                if attempts.is_empty() {
                    Attempt::Fail
                } else {
                    attempts.remove(0)
                }
            };
            match attempt {
                Attempt::Fail => Err(CrawlError::Browser("no browser".into())),
                Attempt::Confirm => Ok(Box::new(FakePage { confirmed: true })),
                Attempt::Timeout => Ok(Box::new(FakePage { confirmed: false })),
            }
        }
    }

    struct FakePage {
        confirmed: bool,
    }

    #[async_trait]
    impl LoginPage for FakePage {
        async fn cookies(&self) -> Result<Vec<StoredCookie>> {
            let mut cookies = vec![StoredCookie::new("ABTEST", "7", ".sogou.com")];
            if self.confirmed {
                cookies.push(StoredCookie::new("ppinf_login", "token", ".sogou.com"));
            }
            Ok(cookies)
        }

        async fn login_control_visible(&self) -> Result<bool> {
            Ok(!self.confirmed)
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    pub fn fast_config(cookie_path: PathBuf) -> SessionConfig {
        SessionConfig {
            cookie_path,
            login_ticks: 3,
            poll_interval_ms: 0,
            qr_wait_ms: 0,
            ..Default::default()
        }
    }
}
