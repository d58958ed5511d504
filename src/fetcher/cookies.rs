use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cookie_store::{CookieDomain, CookieStore, RawCookie};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::app::Result;

fn default_path() -> String {
    "/".to_string()
}

/// A cookie in the on-disk and browser-export format.
///
/// A leading dot on `domain` marks a domain cookie that is also sent to
/// subdomains. A bare host marks a host-only cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
}

impl StoredCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
        }
    }

    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    fn to_raw(&self) -> Option<(RawCookie<'static>, Url)> {
        let host = self.domain.trim_start_matches('.');
        let origin = Url::parse(&format!("https://{}/", host)).ok()?;
        let path = if self.path.is_empty() { default_path() } else { self.path.clone() };

        let mut builder = RawCookie::build((self.name.clone(), self.value.clone())).path(path);
        if self.domain.starts_with('.') {
            builder = builder.domain(host.to_string());
        }
        Some((builder.build(), origin))
    }
}

/// The persisted cookie file: a JSON array of [`StoredCookie`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieJar {
    cookies: Vec<StoredCookie>,
}

impl CookieJar {
    /// Later cookies replace earlier ones with the same name, domain and path.
    pub fn from_cookies(cookies: Vec<StoredCookie>) -> Self {
        let mut jar = Self::default();
        for cookie in cookies {
            match jar.cookies.iter_mut().find(|c| c.same_slot(&cookie)) {
                Some(existing) => *existing = cookie,
                None => jar.cookies.push(cookie),
            }
        }
        jar
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn cookies(&self) -> &[StoredCookie] {
        &self.cookies
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let cookies: Vec<StoredCookie> = serde_json::from_str(&content)?;
        Ok(Self::from_cookies(cookies))
    }

    /// Write the jar as JSON. The file is replaced atomically via a sibling temp file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.cookies)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Live cookies of an HTTP session, installed as reqwest's cookie provider.
///
/// Set-Cookie parsing, expiry and domain/path matching are RFC 6265 rules
/// from `cookie_store`. The lock is only held for the duration of a single
/// store or lookup.
#[derive(Debug, Default)]
pub struct SessionCookies {
    store: RwLock<CookieStore>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CookieStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CookieStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add cookies captured from the browser or loaded from disk.
    pub fn install(&self, cookies: Vec<StoredCookie>) {
        let mut store = self.write();
        for cookie in cookies {
            let Some((raw, origin)) = cookie.to_raw() else {
                debug!("Skipping cookie {} without a usable domain", cookie.name);
                continue;
            };
            if let Err(e) = store.insert_raw(&raw, &origin) {
                debug!("Skipping cookie {}: {}", cookie.name, e);
            }
        }
    }

    /// Unexpired cookies in the persisted format.
    pub fn stored(&self) -> Vec<StoredCookie> {
        self.read()
            .iter_unexpired()
            .map(|c| StoredCookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: match &c.domain {
                    CookieDomain::Suffix(d) => format!(".{}", d),
                    CookieDomain::HostOnly(d) => d.clone(),
                    CookieDomain::NotPresent | CookieDomain::Empty => String::new(),
                },
                path: String::from(&c.path),
            })
            .collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Apply `Set-Cookie` header values received in a response from `url`.
    pub fn store_set_cookies<'a>(&self, headers: impl Iterator<Item = &'a str>, url: &Url) {
        let parsed = headers.filter_map(|h| RawCookie::parse(h.to_string()).ok());
        self.write().store_response_cookies(parsed, url);
    }

    /// Value for a `Cookie` request header, if any cookie applies to `url`.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .read()
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

impl reqwest::cookie::CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.store_set_cookies(cookie_headers.filter_map(|v| v.to_str().ok()), url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}
