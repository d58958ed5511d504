use std::time::Duration;

use tracing::debug;

use crate::fetcher::StoredCookie;
use crate::session::browser::LoginPage;

/// Progress of one human-in-the-loop login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginPhase {
    /// No handshake running.
    #[default]
    Idle,
    /// Login code is on screen, polling for confirmation.
    AwaitingScan,
    Confirmed,
    TimedOut,
}

/// True when `name` contains one of `markers`, ignoring case.
pub fn is_auth_cookie(name: &str, markers: &[String]) -> bool {
    let name = name.to_ascii_lowercase();
    markers
        .iter()
        .any(|marker| name.contains(&marker.to_ascii_lowercase()))
}

/// Bounded polling loop driving [`LoginPhase`] from `AwaitingScan` to a
/// finished state.
pub struct LoginPoller<'a> {
    markers: &'a [String],
    ticks: u32,
    interval: Duration,
}

impl<'a> LoginPoller<'a> {
    pub fn new(markers: &'a [String], ticks: u32, interval: Duration) -> Self {
        Self {
            markers,
            ticks,
            interval,
        }
    }

    /// Poll `page` up to `ticks` times. Confirmed as soon as an auth cookie
    /// appears or the login control stops being visible; timed out otherwise.
    pub async fn await_scan(&self, page: &dyn LoginPage) -> LoginPhase {
        for tick in 0..self.ticks {
            if self.confirmed(page).await {
                debug!("Login confirmed after {} polls", tick + 1);
                return LoginPhase::Confirmed;
            }
            tokio::time::sleep(self.interval).await;
        }
        LoginPhase::TimedOut
    }

    async fn confirmed(&self, page: &dyn LoginPage) -> bool {
        match page.cookies().await {
            Ok(cookies) if self.has_auth_cookie(&cookies) => return true,
            Ok(_) => {}
            Err(e) => debug!("Could not read page cookies: {}", e),
        }

        // a probe error counts as "still visible"
        matches!(page.login_control_visible().await, Ok(false))
    }

    fn has_auth_cookie(&self, cookies: &[StoredCookie]) -> bool {
        cookies.iter().any(|c| is_auth_cookie(&c.name, self.markers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{CrawlError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn markers() -> Vec<String> {
        vec!["suid".into(), "login".into()]
    }

    /// Page that reports an auth cookie / hidden control from a given poll on.
    struct ScriptedPage {
        polls: AtomicU32,
        cookie_from: Option<u32>,
        hidden_from: Option<u32>,
        probe_fails: bool,
    }

    impl ScriptedPage {
        fn new(cookie_from: Option<u32>, hidden_from: Option<u32>) -> Self {
            Self {
                polls: AtomicU32::new(0),
                cookie_from,
                hidden_from,
                probe_fails: false,
            }
        }
    }

    #[async_trait]
    impl LoginPage for ScriptedPage {
        async fn cookies(&self) -> Result<Vec<StoredCookie>> {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst);
            if self.probe_fails {
                return Err(CrawlError::Browser("target closed".into()));
            }
            let mut cookies = vec![StoredCookie::new("ABTEST", "1", ".sogou.com")];
            if self.cookie_from.is_some_and(|from| poll >= from) {
                cookies.push(StoredCookie::new("SUID", "abc", ".sogou.com"));
            }
            Ok(cookies)
        }

        async fn login_control_visible(&self) -> Result<bool> {
            if self.probe_fails {
                return Err(CrawlError::Browser("target closed".into()));
            }
            let poll = self.polls.load(Ordering::SeqCst).saturating_sub(1);
            Ok(!self.hidden_from.is_some_and(|from| poll >= from))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_is_auth_cookie() {
        let markers = markers();
        assert!(is_auth_cookie("SUID", &markers));
        assert!(is_auth_cookie("ppinf_login_token", &markers));
        assert!(is_auth_cookie("SSUID", &markers));
        assert!(!is_auth_cookie("ABTEST", &markers));
        assert!(!is_auth_cookie("anything", &[]));
    }

    #[tokio::test]
    async fn test_confirmed_by_cookie() {
        let markers = markers();
        let page = ScriptedPage::new(Some(3), None);
        let phase = LoginPoller::new(&markers, 10, Duration::ZERO).await_scan(&page).await;
        assert_eq!(phase, LoginPhase::Confirmed);
        assert_eq!(page.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_confirmed_by_hidden_control() {
        let markers = markers();
        let page = ScriptedPage::new(None, Some(2));
        let phase = LoginPoller::new(&markers, 10, Duration::ZERO).await_scan(&page).await;
        assert_eq!(phase, LoginPhase::Confirmed);
        assert_eq!(page.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_after_ticks() {
        let markers = markers();
        let page = ScriptedPage::new(None, None);
        let phase = LoginPoller::new(&markers, 5, Duration::ZERO).await_scan(&page).await;
        assert_eq!(phase, LoginPhase::TimedOut);
        assert_eq!(page.polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_probe_errors_do_not_confirm() {
        let markers = markers();
        let mut page = ScriptedPage::new(None, None);
        page.probe_fails = true;
        let phase = LoginPoller::new(&markers, 3, Duration::ZERO).await_scan(&page).await;
        assert_eq!(phase, LoginPhase::TimedOut);
    }

    #[tokio::test]
    async fn test_zero_ticks_times_out_immediately() {
        let markers = markers();
        let page = ScriptedPage::new(Some(0), Some(0));
        let phase = LoginPoller::new(&markers, 0, Duration::ZERO).await_scan(&page).await;
        assert_eq!(phase, LoginPhase::TimedOut);
    }
}
