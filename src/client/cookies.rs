//! Cookie store shared by the session client and reqwest
//!
//! reqwest reads and writes [`CookieJar`] on every request it sends,
//! including each hop of a redirect chain followed by hand. Matching,
//! expiry and `Secure` handling come from `cookie_store`; the session file
//! only sees plain [`StoredCookie`] records.

use super::lock;
use cookie_store::{CookieStore, RawCookie};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use url::Url;

/// One cookie as written to the session file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,

    /// Host or parent domain; empty means the site host
    pub domain: String,

    pub path: String,
}

impl StoredCookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into().trim_start_matches('.').to_string(),
            path: if path.is_empty() { "/".to_string() } else { path },
        }
    }

    /// Rebuilds the cookie as if `host` had just sent it
    ///
    /// A domain equal to `host` stays host-only.
    fn to_raw(&self, host: &str) -> RawCookie<'static> {
        let mut raw = RawCookie::new(self.name.clone(), self.value.clone());
        raw.set_path(self.path.clone());
        if !self.domain.is_empty() && self.domain != host {
            raw.set_domain(self.domain.clone());
        }
        raw
    }
}

/// RFC 6265 cookie store behind a lock
#[derive(Default)]
pub struct CookieJar {
    store: Mutex<CookieStore>,
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.len())
            .finish()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a saved cookie as though `request_url` had set it
    ///
    /// Returns `false` when the cookie's domain cannot apply to that URL.
    pub fn insert(&self, cookie: &StoredCookie, request_url: &Url) -> bool {
        let host = request_url.host_str().unwrap_or_default();
        let raw = cookie.to_raw(host);
        match lock(&self.store).insert_raw(&raw, request_url) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(
                    "Skipping cookie {} for {}: {:?}",
                    cookie.name,
                    cookie.domain,
                    err
                );
                false
            }
        }
    }

    /// Unexpired cookies, sorted by domain, path and name
    pub fn snapshot(&self) -> Vec<StoredCookie> {
        let store = lock(&self.store);
        let mut cookies: Vec<StoredCookie> = store
            .iter_unexpired()
            .map(|cookie| {
                StoredCookie::new(
                    cookie.name(),
                    cookie.value(),
                    cookie.domain.as_cow().unwrap_or_default(),
                    String::from(&cookie.path),
                )
            })
            .collect();
        cookies.sort_by(|a, b| (&a.domain, &a.path, &a.name).cmp(&(&b.domain, &b.path, &b.name)));
        cookies
    }

    /// Value of the first unexpired cookie called `name`
    pub fn get(&self, name: &str) -> Option<String> {
        lock(&self.store)
            .iter_unexpired()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    /// `Cookie` header value for a request to `url`
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = lock(&self.store)
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    pub fn clear(&self) {
        lock(&self.store).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.store).iter_unexpired().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies = cookie_headers
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| RawCookie::parse(value.to_string()).ok());
        lock(&self.store).store_response_cookies(cookies, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}
