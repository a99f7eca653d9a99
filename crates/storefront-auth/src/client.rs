//! HTTP client for the backend's auth endpoints
//!
//! Three stateless calls:
//! 1. `GET /api/auth/me` resolves the profile behind an access token
//! 2. `POST /api/auth/refresh-token` exchanges a refresh token for a new access token
//! 3. `POST /api/auth/logout` tells the backend the session is over
//!
//! Failures are classified so the session manager can tell "the backend
//! said no" (`Unauthorized`, `RefreshRejected`) from "could not ask"
//! (`Transport`).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{CURRENT_USER_PATH, LOGOUT_PATH, REFRESH_TOKEN_PATH};
use crate::error::{Error, Result};
use crate::profile::{CurrentUserResponse, UserProfile};
use crate::token::{AccessToken, RefreshToken};

#[derive(Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    token: String,
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// `base_url` is the backend origin, e.g. `https://api.example.com`.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Resolve the profile for `token`.
    ///
    /// 401 means the token is expired or revoked. Every other failure,
    /// including a body that is not `{ "user": ... }`, is `Transport`.
    pub async fn fetch_current_user(&self, token: &AccessToken) -> Result<UserProfile> {
        if token.is_blank() {
            return Err(Error::MissingCredential("access token"));
        }

        let response = self
            .http
            .get(self.endpoint(CURRENT_USER_PATH))
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| Error::Transport(format!("current user request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));

            if status.as_u16() == 401 {
                return Err(Error::Unauthorized(format!(
                    "current user rejected ({status}): {body}"
                )));
            }

            return Err(Error::Transport(format!(
                "current user returned {status}: {body}"
            )));
        }

        let envelope = response
            .json::<CurrentUserResponse>()
            .await
            .map_err(|e| Error::Transport(format!("invalid current user response: {e}")))?;
        debug!(user_id = %envelope.user.id, "fetched current user");
        Ok(envelope.user)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// 401/403 means the refresh token is invalid, expired, or already used.
    pub async fn refresh_token(&self, refresh: &RefreshToken) -> Result<AccessToken> {
        if refresh.is_blank() {
            return Err(Error::MissingCredential("refresh token"));
        }

        let response = self
            .http
            .post(self.endpoint(REFRESH_TOKEN_PATH))
            .json(&RefreshRequest {
                refresh_token: refresh.expose(),
            })
            .send()
            .await
            .map_err(|e| Error::Transport(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(Error::RefreshRejected(format!(
                    "refresh token rejected ({status}): {body}"
                )));
            }

            return Err(Error::Transport(format!(
                "token refresh returned {status}: {body}"
            )));
        }

        let refreshed = response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| Error::Transport(format!("invalid refresh response: {e}")))?;

        let token = AccessToken::new(refreshed.token);
        if token.is_blank() {
            return Err(Error::Transport("refresh response carried an empty token".into()));
        }
        Ok(token)
    }

    /// Notify the backend of a logout.
    ///
    /// Without an access token there is nothing to revoke and no request is sent.
    pub async fn logout(&self, token: Option<&AccessToken>) -> Result<()> {
        let Some(token) = token.filter(|t| !t.is_blank()) else {
            debug!("no access token, skipping backend logout");
            return Ok(());
        };

        let response = self
            .http
            .post(self.endpoint(LOGOUT_PATH))
            .bearer_auth(token.expose())
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("logout request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(Error::Unauthorized(format!("logout rejected ({status})")));
        }
        if !status.is_success() {
            return Err(Error::Transport(format!("logout returned {status}")));
        }
        Ok(())
    }
}
