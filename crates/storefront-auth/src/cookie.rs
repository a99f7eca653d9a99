//! Cookie header codec and the `CookieJar` substrate
//!
//! Mirrors the `document.cookie` contract: reading yields every live
//! cookie as `name=value` pairs joined by `"; "`, writing applies one
//! Set-Cookie style directive at a time. A directive with `max-age=0`
//! (or negative) deletes the cookie.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Write/read access to the token cookies.
///
/// Synchronous on purpose: cookie access never suspends.
pub trait CookieJar: Send + Sync {
    /// All live cookies as `a=1; b=2`.
    fn cookie_header(&self) -> String;

    /// Apply a single directive such as `token=abc; path=/; max-age=120`.
    fn set_cookie(&self, directive: &str);
}

/// Find the value of the cookie called exactly `name` in a cookie header.
///
/// Pairs without `=` are skipped. `tokenX=1` does not match `token`.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_owned())
}

/// Directive for an auth cookie: `path=/; secure; samesite=strict` plus max-age.
pub fn auth_cookie_directive(name: &str, value: &str, max_age_secs: u64) -> String {
    format!("{name}={value}; path=/; max-age={max_age_secs}; secure; samesite=strict")
}

/// Directive that expires an auth cookie immediately.
pub fn expire_cookie_directive(name: &str) -> String {
    format!("{name}=; path=/; max-age=0; secure; samesite=strict")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

/// A cookie as held by `MemoryCookieJar`, attributes included.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub secure: bool,
    pub same_site: Option<SameSite>,
    /// Seconds from the write, as given in the directive.
    pub max_age: Option<i64>,
    expires_at: Option<Instant>,
}

impl StoredCookie {
    /// Parse a Set-Cookie style directive. Unknown attributes are ignored.
    fn parse(directive: &str) -> Option<Self> {
        let mut parts = directive.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = StoredCookie {
            name: name.to_owned(),
            value: value.trim().to_owned(),
            path: None,
            secure: false,
            same_site: None,
            max_age: None,
            expires_at: None,
        };

        for attribute in parts {
            let attribute = attribute.trim();
            let (key, val) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attribute, None),
            };
            match (key.to_ascii_lowercase().as_str(), val) {
                ("path", Some(v)) => cookie.path = Some(v.to_owned()),
                ("max-age", Some(v)) => cookie.max_age = v.parse().ok(),
                ("secure", _) => cookie.secure = true,
                ("samesite", Some(v)) => cookie.same_site = SameSite::parse(v),
                _ => {}
            }
        }

        cookie.expires_at = cookie
            .max_age
            .filter(|secs| *secs > 0)
            .map(|secs| Instant::now() + Duration::from_secs(secs as u64));
        Some(cookie)
    }

    fn is_deletion(&self) -> bool {
        matches!(self.max_age, Some(secs) if secs <= 0)
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process cookie jar. Cookies are keyed by name and path.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live cookie with its attributes.
    pub fn get(&self, name: &str) -> Option<StoredCookie> {
        let now = Instant::now();
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies
            .iter()
            .find(|c| c.name == name && c.is_live(now))
            .cloned()
    }

    /// Number of live cookies.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.iter().filter(|c| c.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookie_header(&self) -> String {
        let now = Instant::now();
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies
            .iter()
            .filter(|c| c.is_live(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, directive: &str) {
        let Some(cookie) = StoredCookie::parse(directive) else {
            warn!("ignoring malformed cookie directive");
            return;
        };

        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|c| !(c.name == cookie.name && c.path == cookie.path));
        if cookie.is_deletion() {
            debug!(cookie = %cookie.name, "cookie expired");
        } else {
            debug!(cookie = %cookie.name, max_age = ?cookie.max_age, "cookie set");
            cookies.push(cookie);
        }
    }
}
