//! Session lifecycle state machine
//!
//! Pure: receives events, returns (new_state, action). `SessionManager`
//! performs the I/O each action implies and feeds the outcome back in as
//! the next event.
//!
//! Transitions:
//! - any → Refreshing (access token expired or missing)
//! - any → Authenticated (profile verified against the backend, or injected after login)
//! - Refreshing → Refreshing + FetchUser (new access token minted)
//! - any → Anonymous + Teardown (re-fetch after a refresh failed)
//! - any → Refreshing (fetch-user came back 401)
//! - any → unchanged + ReportError (fetch-user hit a transport error)
//! - any → Anonymous + Teardown (refresh token missing or rejected)
//! - any → Anonymous (explicit clear)

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No trusted identity. A hydrated profile may be shown provisionally.
    Anonymous,
    /// Profile verified by a credential round-trip since the last teardown.
    Authenticated,
    /// Token exchange in flight.
    Refreshing,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
        }
    }
}

/// Why a refresh attempt ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No refresh token cookie
    MissingToken,
    /// Backend rejected the refresh token
    Rejected,
    /// Backend unreachable or answered garbage
    Transport,
}

impl RefreshFailure {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshFailure::MissingToken => "missing_refresh_token",
            RefreshFailure::Rejected => "refresh_rejected",
            RefreshFailure::Transport => "refresh_transport",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Access token missing, or the backend reported it expired
    TokenExpired,
    /// The backend returned a profile for the current access token
    UserVerified,
    /// Profile injected directly after login/signup
    UserInjected,
    /// Fetching the profile failed
    UserFetchFailed { unauthorized: bool },
    /// Refresh returned a new access token
    RefreshSucceeded,
    /// The profile fetch with the freshly minted token failed
    RefetchFailed,
    RefreshFailed(RefreshFailure),
    /// Explicit teardown requested
    Cleared,
}

/// What the manager should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Exchange the refresh token for a new access token
    RefreshToken,
    /// Re-fetch the profile with the freshly minted access token
    FetchUser,
    /// Clear user, cache and cookies, then redirect home
    Teardown,
    /// Log the failure and leave the session as it is
    ReportError,
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: SessionState, event: SessionEvent) -> (SessionState, SessionAction) {
    match (state, event) {
        (_, SessionEvent::TokenExpired) => (SessionState::Refreshing, SessionAction::RefreshToken),

        (_, SessionEvent::UserVerified | SessionEvent::UserInjected) => {
            (SessionState::Authenticated, SessionAction::None)
        }

        // --- Refreshing ---
        (SessionState::Refreshing, SessionEvent::RefreshSucceeded) => {
            (SessionState::Refreshing, SessionAction::FetchUser)
        }
        // The re-fetch after a refresh is the last chance; any failure ends the session.
        (_, SessionEvent::RefetchFailed) => (SessionState::Anonymous, SessionAction::Teardown),

        (_, SessionEvent::UserFetchFailed { unauthorized: true }) => {
            (SessionState::Refreshing, SessionAction::RefreshToken)
        }
        (state, SessionEvent::UserFetchFailed { unauthorized: false }) => {
            (state, SessionAction::ReportError)
        }

        (_, SessionEvent::RefreshFailed(_)) => (SessionState::Anonymous, SessionAction::Teardown),

        (_, SessionEvent::Cleared) => (SessionState::Anonymous, SessionAction::None),

        // A refresh result arriving outside Refreshing is stale: ignore it.
        (state, SessionEvent::RefreshSucceeded) => (state, SessionAction::None),
    }
}
