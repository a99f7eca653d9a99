//! Typed bearer credentials
//!
//! Both tokens wrap `common::SecretString`, so they never show up in
//! `Debug` output or log fields. An access token should be read from the
//! cookie jar for each request and dropped once the request is built.

use common::SecretString;

/// Short-lived bearer token sent as `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AccessToken(SecretString);

/// Longer-lived token used only to mint a new `AccessToken`.
#[derive(Debug, Clone)]
pub struct RefreshToken(SecretString);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose()
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_blank()
    }
}

impl RefreshToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose()
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_redact_in_debug() {
        let access = AccessToken::new("at_secret");
        let refresh = RefreshToken::new("rt_secret");
        assert!(!format!("{access:?}").contains("at_secret"));
        assert!(!format!("{refresh:?}").contains("rt_secret"));
        assert_eq!(access.expose(), "at_secret");
    }
}
