//! Storefront session lifecycle
//!
//! `SessionManager` owns the current identity. It verifies the cached
//! profile against the backend, refreshes the access token when it is
//! rejected (at most one refresh in flight), and tears the session down
//! when the refresh token is missing or refused.
//!
//! The transitions themselves live in [`machine`] as a pure function so
//! they can be tested without a backend.

pub mod machine;
pub mod manager;
pub mod navigator;

#[cfg(test)]
mod test_support;

pub use machine::{RefreshFailure, SessionAction, SessionEvent, SessionState};
pub use manager::{SessionManager, SessionSettings, SessionSnapshot};
pub use navigator::{Navigator, RecordingNavigator, Route};
