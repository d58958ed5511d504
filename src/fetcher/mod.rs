pub mod batch;
pub mod config;
pub mod cookies;
pub mod http_session;
pub mod stats;

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;

pub use batch::{BatchRunner, FETCH_WORKERS, RESOLVE_WORKERS};
pub use config::HttpConfig;
pub use cookies::{CookieJar, StoredCookie};
pub use http_session::ReqwestSession;
pub use stats::RequestStats;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Authenticated HTTP capability shared by search, resolve and fetch.
///
/// `get` fails on network errors and non-2xx statuses. The cookie methods
/// are how the login flow installs or drops a session.
#[async_trait]
pub trait HttpSession: Send + Sync {
    async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse>;

    async fn cookies(&self) -> Vec<StoredCookie>;

    /// Merge cookies into the store, replacing same-named ones.
    async fn set_cookies(&self, cookies: Vec<StoredCookie>);

    async fn clear_cookies(&self);

    fn stats(&self) -> RequestStats;

    fn reset_stats(&self);
}
