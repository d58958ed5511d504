use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;
use url::Url;

use crate::app::{CrawlError, Result};
use crate::fetcher::config::HttpConfig;
use crate::fetcher::cookies::{SessionCookies, StoredCookie};
use crate::fetcher::stats::{RequestStats, StatsCounter};
use crate::fetcher::{HttpResponse, HttpSession};

/// reqwest-backed session with a fixed browser-like header set.
///
/// The client reads and updates cookies through [`SessionCookies`], which login
/// also installs into or clears.
pub struct ReqwestSession {
    client: Client,
    cookies: Arc<SessionCookies>,
    stats: StatsCounter,
}

impl ReqwestSession {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&config.home_url()) {
            headers.insert(REFERER, value);
        }
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));

        let cookies = Arc::new(SessionCookies::new());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            cookies,
            stats: StatsCounter::default(),
        })
    }

    async fn send(&self, url: Url, timeout: Duration) -> Result<HttpResponse> {
        let response = self.client.get(url.clone()).timeout(timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let mut url = Url::parse(url)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        self.stats.record_request();
        match self.send(url, timeout).await {
            Ok(response) => {
                self.stats.record_success(response.body.len());
                Ok(response)
            }
            Err(e) => {
                self.stats.record_failure();
                Err(e)
            }
        }
    }

    async fn cookies(&self) -> Vec<StoredCookie> {
        self.cookies.stored()
    }

    async fn set_cookies(&self, cookies: Vec<StoredCookie>) {
        self.cookies.install(cookies);
    }

    async fn clear_cookies(&self) {
        self.cookies.clear();
    }

    fn stats(&self) -> RequestStats {
        self.stats.snapshot()
    }

    fn reset_stats(&self) {
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cookie_operations() {
        let session = ReqwestSession::new(&HttpConfig::default()).unwrap();
        assert!(session.cookies().await.is_empty());

        session
            .set_cookies(vec![
                StoredCookie::new("SUID", "1", ".sogou.com"),
                StoredCookie::new("SNUID", "2", ".sogou.com"),
            ])
            .await;
        assert_eq!(session.cookies().await.len(), 2);

        session.clear_cookies().await;
        assert!(session.cookies().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_counts_nothing() {
        let session = ReqwestSession::new(&HttpConfig::default()).unwrap();
        let result = session.get("not a url", &[], Duration::from_secs(1)).await;
        assert!(matches!(result, Err(CrawlError::InvalidUrl(_))));
        assert_eq!(session.stats().total, 0);
    }

    #[tokio::test]
    async fn test_connection_failure_is_counted() {
        let session = ReqwestSession::new(&HttpConfig::default()).unwrap();
        // port 9 (discard) on localhost is expected to refuse connections
        let result = session
            .get("http://127.0.0.1:9/", &[("q", "x")], Duration::from_millis(500))
            .await;
        assert!(result.is_err());

        let stats = session.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.failed, 1);

        session.reset_stats();
        assert_eq!(session.stats(), RequestStats::default());
    }
}
