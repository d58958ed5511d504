use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::app::{CrawlError, Result};
use crate::fetcher::StoredCookie;

/// Element that opens the login dialog on the results page.
const LOGIN_CONTROL: &str = "#top_login";

const QR_CODE_SELECTORS: &[&str] = &[
    "img.qrcode-img",
    "img[alt=\"二维码\"]",
    "div[class*=\"qrcode\"] img",
    "img[src*=\"qrcode\"]",
];

/// Browser surface used for the interactive login.
#[async_trait]
pub trait LoginBrowser: Send + Sync {
    /// Bring up the login code for a human to scan: open the homepage,
    /// search for `keyword` (the login trigger only exists on a results
    /// page) and click the login control.
    async fn open_login(&self, keyword: &str) -> Result<Box<dyn LoginPage>>;

    /// Release the underlying browser, if any.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// A page showing the login code, probed while waiting for the scan.
#[async_trait]
pub trait LoginPage: Send + Sync {
    async fn cookies(&self) -> Result<Vec<StoredCookie>>;

    async fn login_control_visible(&self) -> Result<bool>;

    async fn close(&self) -> Result<()>;
}

fn browser_err<E: Display>(context: &'static str) -> impl FnOnce(E) -> CrawlError {
    move |e| CrawlError::Browser(format!("{}: {}", context, e))
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub home_url: String,
    pub user_agent: Option<String>,
    pub qr_wait: Duration,
}

/// Chrome-driven login via chromiumoxide. The browser is launched on first use
/// and kept for later logins.
pub struct ChromeLoginBrowser {
    options: BrowserOptions,
    browser: Mutex<Option<Browser>>,
}

impl ChromeLoginBrowser {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            browser: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<Browser> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        if !self.options.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| CrawlError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            CrawlError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        info!("Login browser started");
        Ok(browser)
    }

    async fn open_page(&self) -> Result<Page> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let browser = guard
            .as_ref()
            .ok_or_else(|| CrawlError::Browser("browser unavailable".into()))?;

        browser
            .new_page(self.options.home_url.as_str())
            .await
            .map_err(browser_err("Failed to open homepage"))
    }

    async fn search(&self, page: &Page, keyword: &str) -> Result<()> {
        page.wait_for_navigation()
            .await
            .map_err(browser_err("Homepage navigation failed"))?;

        info!("Searching for '{}' to reach the login control", keyword);
        page.find_element("input[name=\"query\"]")
            .await
            .map_err(browser_err("Search box not found"))?
            .click()
            .await
            .map_err(browser_err("Failed to focus search box"))?
            .type_str(keyword)
            .await
            .map_err(browser_err("Failed to type keyword"))?;

        page.find_element("input[type=\"submit\"]")
            .await
            .map_err(browser_err("Search button not found"))?
            .click()
            .await
            .map_err(browser_err("Failed to submit search"))?;

        page.wait_for_navigation()
            .await
            .map_err(browser_err("Results navigation failed"))?;

        if let Ok(count) = page.find_element("div.mun").await {
            if let Ok(Some(text)) = count.inner_text().await {
                info!("Result count: {}", text.trim());
            }
        }

        Ok(())
    }

    async fn wait_for_qr_code(&self, page: &Page) -> bool {
        for selector in QR_CODE_SELECTORS {
            let found = tokio::time::timeout(self.options.qr_wait, async {
                loop {
                    if page.find_element(*selector).await.is_ok() {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
            })
            .await
            .is_ok();

            if found {
                return true;
            }
        }
        false
    }

    /// Search for `keyword`, open the login dialog and wait for the QR code.
    async fn prepare_login(&self, page: &Page, keyword: &str) -> Result<()> {
        if let Some(ref ua) = self.options.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(browser_err("Failed to set user agent"))?;
        }

        self.search(page, keyword).await?;

        match page.find_element(LOGIN_CONTROL).await {
            Ok(control) => {
                info!("Opening login dialog");
                control
                    .click()
                    .await
                    .map_err(browser_err("Failed to click login control"))?;
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(_) => warn!("Login control not found on results page"),
        }

        if self.wait_for_qr_code(page).await {
            info!("Scan the QR code in the browser window to log in");
        } else {
            info!("No QR code found; the login may need to be triggered by hand");
        }

        Ok(())
    }
}

#[async_trait]
impl LoginBrowser for ChromeLoginBrowser {
    async fn open_login(&self, keyword: &str) -> Result<Box<dyn LoginPage>> {
        let login = ChromeLoginPage {
            page: self.open_page().await?,
        };
        match self.prepare_login(&login.page, keyword).await {
            Ok(()) => Ok(Box::new(login)),
            Err(e) => Err(close_after_failure(&login, e).await),
        }
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(mut browser) = self.browser.lock().await.take() {
            browser
                .close()
                .await
                .map_err(browser_err("Failed to close browser"))?;
            let _ = browser.wait().await;
            info!("Login browser closed");
        }
        Ok(())
    }
}

/// Close a login page whose setup failed and hand back the setup error.
async fn close_after_failure(page: &dyn LoginPage, error: CrawlError) -> CrawlError {
    warn!("Login page setup failed: {}", error);
    if let Err(e) = page.close().await {
        warn!("{}", e);
    }
    error
}

struct ChromeLoginPage {
    page: Page,
}

#[async_trait]
impl LoginPage for ChromeLoginPage {
    async fn cookies(&self) -> Result<Vec<StoredCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(browser_err("Failed to read cookies"))?;

        Ok(cookies
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
            })
            .collect())
    }

    async fn login_control_visible(&self) -> Result<bool> {
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector('{LOGIN_CONTROL}');
                if (!el) return false;
                const style = window.getComputedStyle(el);
                if (style.visibility === 'hidden' || style.display === 'none') return false;
                const rect = el.getBoundingClientRect();
                return rect.width > 0 && rect.height > 0;
            }})()
            "#
        );

        self.page
            .evaluate(script)
            .await
            .map_err(browser_err("Visibility check failed"))?
            .into_value::<bool>()
            .map_err(|e| CrawlError::Browser(format!("Failed to parse visibility: {:?}", e)))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(browser_err("Failed to close page"))
    }
}
