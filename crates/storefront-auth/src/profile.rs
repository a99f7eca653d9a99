//! Authenticated user profile

use serde::{Deserialize, Serialize};

/// The identity returned by `GET /api/auth/me`.
///
/// The backend serializes the identifier as `_id`; `id` is accepted on
/// input as well. Fields this crate does not model are kept in `extra`
/// so a cache round-trip reproduces the backend's object exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Envelope of the current-user response: `{ "user": {...} }`.
#[derive(Debug, Deserialize)]
pub(crate) struct CurrentUserResponse {
    pub user: UserProfile,
}
