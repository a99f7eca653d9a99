//! Credential store: cached profile plus the two token cookies
//!
//! Only reads, writes and clears. It never decides whether a session is
//! valid; that belongs to the session manager.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::constants::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, USER_CACHE_KEY};
use crate::cookie::{self, CookieJar};
use crate::error::{Error, Result};
use crate::profile::UserProfile;
use crate::storage::DurableStore;
use crate::token::{AccessToken, RefreshToken};

#[derive(Clone)]
pub struct CredentialStore {
    durable: Arc<dyn DurableStore>,
    cookies: Arc<dyn CookieJar>,
    cache_key: String,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn DurableStore>, cookies: Arc<dyn CookieJar>) -> Self {
        Self {
            durable,
            cookies,
            cache_key: USER_CACHE_KEY.to_owned(),
        }
    }

    /// Use a namespaced cache entry instead of `user`.
    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Cached profile, if present and well formed.
    ///
    /// A corrupt entry reads as absent; the next successful write replaces it.
    pub async fn read_cached_user(&self) -> Option<UserProfile> {
        let raw = match self.durable.get(&self.cache_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read cached user");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                let err = Error::CacheCorrupt(e.to_string());
                warn!(error = %err, key = %self.cache_key, "ignoring cached user");
                None
            }
        }
    }

    pub async fn write_cached_user(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(profile)
            .map_err(|e| Error::Storage(format!("serializing user profile: {e}")))?;
        self.durable.set(&self.cache_key, json).await
    }

    pub async fn clear_cached_user(&self) -> Result<()> {
        self.durable.remove(&self.cache_key).await
    }

    pub fn read_cookie(&self, name: &str) -> Option<String> {
        cookie::find_cookie(&self.cookies.cookie_header(), name)
    }

    /// The access token cookie, if set and non-empty.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.read_cookie(ACCESS_TOKEN_COOKIE)
            .map(AccessToken::new)
            .filter(|t| !t.is_blank())
    }

    /// The refresh token cookie, if set and non-empty.
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.read_cookie(REFRESH_TOKEN_COOKIE)
            .map(RefreshToken::new)
            .filter(|t| !t.is_blank())
    }

    pub fn write_access_token_cookie(&self, token: &AccessToken, ttl_secs: u64) {
        self.cookies.set_cookie(&cookie::auth_cookie_directive(
            ACCESS_TOKEN_COOKIE,
            token.expose(),
            ttl_secs,
        ));
        debug!(ttl_secs, "access token cookie written");
    }

    pub fn write_refresh_token_cookie(&self, token: &RefreshToken, ttl_secs: u64) {
        self.cookies.set_cookie(&cookie::auth_cookie_directive(
            REFRESH_TOKEN_COOKIE,
            token.expose(),
            ttl_secs,
        ));
        debug!(ttl_secs, "refresh token cookie written");
    }

    /// Expire both token cookies immediately.
    pub fn clear_auth_cookies(&self) {
        self.cookies
            .set_cookie(&cookie::expire_cookie_directive(ACCESS_TOKEN_COOKIE));
        self.cookies
            .set_cookie(&cookie::expire_cookie_directive(REFRESH_TOKEN_COOKIE));
        debug!("auth cookies cleared");
    }
}
