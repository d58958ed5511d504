use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the authenticated session and its login handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where captured login cookies are persisted
    pub cookie_path: PathBuf,

    /// Number of polls while waiting for the login code to be scanned (default: 60)
    pub login_ticks: u32,

    /// Delay between polls in milliseconds (default: 1000)
    pub poll_interval_ms: u64,

    /// Case-insensitive substrings identifying an authentication cookie
    pub auth_cookie_markers: Vec<String>,

    /// Run the login browser without a window (default: false, the code has to be scanned)
    pub headless: bool,

    /// How long to look for each QR code selector in milliseconds (default: 5000)
    pub qr_wait_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_path: default_cookie_path(),
            login_ticks: 60,
            poll_interval_ms: 1000,
            auth_cookie_markers: vec![
                "suid".to_string(),
                "sct".to_string(),
                "ssuid".to_string(),
                "login".to_string(),
            ],
            headless: false,
            qr_wait_ms: 5000,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn qr_wait(&self) -> Duration {
        Duration::from_millis(self.qr_wait_ms)
    }

    /// Upper bound on how long the handshake waits for a scan.
    pub fn login_window(&self) -> Duration {
        self.poll_interval() * self.login_ticks
    }
}

/// `<data dir>/wxcrawl/cookies.json`, or `cookies.json` in the working
/// directory when no data directory is known.
pub fn default_cookie_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("wxcrawl").join("cookies.json"))
        .unwrap_or_else(|| PathBuf::from("cookies.json"))
}
