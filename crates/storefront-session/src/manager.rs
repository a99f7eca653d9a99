//! Session manager: owns the current identity and drives the state machine
//!
//! Every I/O step the machine asks for is performed here and its outcome
//! fed back as the next event. Observers read a [`SessionSnapshot`] through
//! a `watch` channel.
//!
//! Refresh is single-flight. Callers capture the refresh epoch before the
//! request that failed; when they reach the slot and the epoch has moved on,
//! another caller already refreshed and its outcome is reused instead of
//! spending the (single-use) refresh token a second time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use serde::Serialize;
use storefront_auth::{AccessToken, AuthClient, CredentialStore, Error as AuthError, UserProfile};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::machine::{self, RefreshFailure, SessionAction, SessionEvent, SessionState};
use crate::navigator::{Navigator, Route};

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub user: Option<UserProfile>,
}

impl SessionSnapshot {
    pub fn anonymous() -> Self {
        Self {
            state: SessionState::Anonymous,
            user: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated && self.user.is_some()
    }

    /// A profile is shown but has not been verified since the last teardown.
    pub fn is_provisional(&self) -> bool {
        self.user.is_some() && self.state != SessionState::Authenticated
    }

    /// The profile, only if it has been verified.
    pub fn verified_user(&self) -> Option<&UserProfile> {
        if self.state == SessionState::Authenticated {
            self.user.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// max-age of the access token cookie written after a refresh
    pub access_token_ttl_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: storefront_auth::DEFAULT_ACCESS_TOKEN_TTL_SECS,
        }
    }
}

#[derive(Debug, Default)]
struct RefreshSlot {
    epoch: u64,
    succeeded: bool,
}

enum UserUpdate {
    Keep,
    Set(UserProfile),
    Clear,
}

pub struct SessionManager {
    credentials: CredentialStore,
    client: AuthClient,
    navigator: Arc<dyn Navigator>,
    settings: SessionSettings,
    snapshot: watch::Sender<SessionSnapshot>,
    refresh_epoch: AtomicU64,
    refresh_slot: Mutex<RefreshSlot>,
    /// Bumped by every clear. Work started under an older generation must
    /// not write the session back.
    generation: AtomicU64,
}

impl SessionManager {
    pub fn new(
        credentials: CredentialStore,
        client: AuthClient,
        navigator: Arc<dyn Navigator>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            credentials,
            client,
            navigator,
            settings,
            snapshot: watch::Sender::new(SessionSnapshot::anonymous()),
            refresh_epoch: AtomicU64::new(0),
            refresh_slot: Mutex::new(RefreshSlot::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Show the cached profile provisionally. The state stays `Anonymous`
    /// until a credential round-trip confirms it.
    pub async fn hydrate(&self) -> Option<UserProfile> {
        let cached = self.credentials.read_cached_user().await;
        if let Some(user) = &cached {
            debug!(user_id = %user.id, "hydrated cached user");
            self.snapshot.send_if_modified(|snap| {
                if snap.user.is_some() {
                    return false;
                }
                snap.user = Some(user.clone());
                true
            });
        }
        cached
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.snapshot.borrow().user.clone()
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.credentials.access_token()
    }

    /// Completed refresh attempts so far. Capture before a request that
    /// may come back 401 and pass it to [`refresh_since`](Self::refresh_since).
    pub fn refresh_epoch(&self) -> u64 {
        self.refresh_epoch.load(Ordering::Acquire)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Verify the session against the backend.
    ///
    /// Returns whether a verified user is present afterwards. A missing or
    /// rejected access token goes through the refresh flow; a transport
    /// failure leaves the session as it was.
    #[instrument(skip_all)]
    pub async fn fetch_user_data(&self) -> bool {
        let epoch = self.refresh_epoch();
        let generation = self.generation();

        let Some(token) = self.credentials.access_token() else {
            debug!("no access token, treating as expired");
            return self.refresh_since(epoch).await;
        };

        let err = match self.client.fetch_current_user(&token).await {
            Ok(user) => {
                return self
                    .accept_user(user, SessionEvent::UserVerified, generation)
                    .await;
            }
            Err(e) => e,
        };

        let unauthorized = matches!(
            err,
            AuthError::Unauthorized(_) | AuthError::MissingCredential(_)
        );
        let event = SessionEvent::UserFetchFailed { unauthorized };

        // Refreshing is only committed by whoever holds the refresh slot.
        match machine::handle_event(self.state(), event).1 {
            SessionAction::RefreshToken => {
                debug!(error = %err, "access token rejected, refreshing");
                self.refresh_since(epoch).await
            }
            _ => {
                warn!(error = %err, "failed to fetch current user");
                self.transition(event, UserUpdate::Keep);
                false
            }
        }
    }

    /// Refresh after the backend reported the access token expired.
    pub async fn handle_token_expired(&self) -> bool {
        self.refresh_since(self.refresh_epoch()).await
    }

    /// Refresh unless an attempt completed after `observed_epoch`, in which
    /// case that attempt's outcome is returned.
    pub async fn refresh_since(&self, observed_epoch: u64) -> bool {
        let mut slot = self.refresh_slot.lock().await;
        if slot.epoch > observed_epoch {
            debug!(
                epoch = slot.epoch,
                succeeded = slot.succeeded,
                "joining completed refresh"
            );
            return slot.succeeded;
        }

        let succeeded = self.run_refresh().await;
        slot.epoch += 1;
        slot.succeeded = succeeded;
        self.refresh_epoch.store(slot.epoch, Ordering::Release);
        succeeded
    }

    async fn run_refresh(&self) -> bool {
        let generation = self.generation();
        let mut minted: Option<AccessToken> = None;
        let mut action = self.transition(SessionEvent::TokenExpired, UserUpdate::Keep);
        loop {
            let next = match action {
                SessionAction::RefreshToken => match self.exchange_refresh_token().await {
                    Ok(token) => {
                        let next = self.transition_from(
                            generation,
                            SessionEvent::RefreshSucceeded,
                            UserUpdate::Keep,
                        );
                        // Persist only while the refresh is still current.
                        if next == Some(SessionAction::FetchUser) {
                            self.credentials.write_access_token_cookie(
                                &token,
                                self.settings.access_token_ttl_secs,
                            );
                            minted = Some(token);
                        }
                        next
                    }
                    Err(failure) => {
                        counter!("session_refresh_total", "outcome" => failure.label())
                            .increment(1);
                        self.transition_from(
                            generation,
                            SessionEvent::RefreshFailed(failure),
                            UserUpdate::Keep,
                        )
                    }
                },
                SessionAction::FetchUser => match self.refetch_user(minted.take()).await {
                    Ok(user) => {
                        if !self
                            .accept_user(user, SessionEvent::UserVerified, generation)
                            .await
                        {
                            return false;
                        }
                        counter!("session_refresh_total", "outcome" => "success").increment(1);
                        info!("session refreshed");
                        return true;
                    }
                    Err(e) => {
                        warn!(error = %e, "profile fetch after refresh failed");
                        counter!("session_refresh_total", "outcome" => "refetch_failed")
                            .increment(1);
                        self.transition_from(
                            generation,
                            SessionEvent::RefetchFailed,
                            UserUpdate::Keep,
                        )
                    }
                },
                SessionAction::Teardown => {
                    self.teardown("unauthorized").await;
                    return false;
                }
                SessionAction::ReportError | SessionAction::None => {
                    return self.snapshot.borrow().is_authenticated();
                }
            };

            let Some(next) = next else {
                info!("session cleared during refresh, discarding result");
                counter!("session_refresh_total", "outcome" => "superseded").increment(1);
                return false;
            };
            action = next;
        }
    }

    /// Exchange the refresh cookie for a new access token. Nothing is stored.
    async fn exchange_refresh_token(&self) -> std::result::Result<AccessToken, RefreshFailure> {
        let Some(refresh) = self.credentials.refresh_token() else {
            debug!("no refresh token");
            return Err(RefreshFailure::MissingToken);
        };

        match self.client.refresh_token(&refresh).await {
            Ok(token) => {
                debug!("access token refreshed");
                Ok(token)
            }
            Err(AuthError::MissingCredential(_)) => Err(RefreshFailure::MissingToken),
            Err(e) if e.is_auth_rejection() => {
                warn!(error = %e, "refresh token rejected");
                Err(RefreshFailure::Rejected)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                Err(RefreshFailure::Transport)
            }
        }
    }

    async fn refetch_user(
        &self,
        token: Option<AccessToken>,
    ) -> storefront_auth::Result<UserProfile> {
        let token = token.ok_or(AuthError::MissingCredential("access token"))?;
        self.client.fetch_current_user(&token).await
    }

    /// Install a profile obtained elsewhere (login, signup).
    pub async fn set_user(&self, profile: UserProfile) {
        let generation = self.generation();
        self.accept_user(profile, SessionEvent::UserInjected, generation)
            .await;
    }

    /// Forget the user: in-memory, cached and cookies. Does not navigate.
    pub async fn clear_user(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.transition(SessionEvent::Cleared, UserUpdate::Clear);
        if let Err(e) = self.credentials.clear_cached_user().await {
            warn!(error = %e, "failed to clear cached user");
        }
        self.credentials.clear_auth_cookies();
    }

    /// Tear the session down and send the user home.
    pub async fn handle_unauthorized(&self) {
        self.teardown("unauthorized").await;
    }

    /// Tell the backend, then tear down regardless of its answer.
    #[instrument(skip_all)]
    pub async fn logout_user(&self) {
        let token = self.credentials.access_token();
        if let Err(e) = self.client.logout(token.as_ref()).await {
            warn!(error = %e, "backend logout failed, clearing local session anyway");
        }
        self.teardown("logout").await;
    }

    async fn teardown(&self, reason: &'static str) {
        counter!("session_teardown_total", "reason" => reason).increment(1);
        info!(reason, "tearing down session");
        self.clear_user().await;
        self.navigator.navigate(Route::Home);
    }

    /// Install `user` unless the session was cleared since `generation`.
    async fn accept_user(&self, user: UserProfile, event: SessionEvent, generation: u64) -> bool {
        if self
            .transition_from(generation, event, UserUpdate::Set(user.clone()))
            .is_none()
        {
            debug!(user_id = %user.id, "session cleared meanwhile, discarding profile");
            return false;
        }

        if let Err(e) = self.credentials.write_cached_user(&user).await {
            warn!(error = %e, "failed to cache user");
        }
        // A clear that raced the write may have run its removal first.
        if self.generation() != generation {
            if let Err(e) = self.credentials.clear_cached_user().await {
                warn!(error = %e, "failed to clear cached user");
            }
            return false;
        }
        true
    }

    fn transition(&self, event: SessionEvent, update: UserUpdate) -> SessionAction {
        let mut action = SessionAction::None;
        self.snapshot.send_modify(|snap| {
            action = apply(snap, event, update);
        });
        action
    }

    /// Like `transition`, but a no-op returning `None` once the session has
    /// been cleared after `generation` was read.
    fn transition_from(
        &self,
        generation: u64,
        event: SessionEvent,
        update: UserUpdate,
    ) -> Option<SessionAction> {
        let mut action = None;
        self.snapshot.send_if_modified(|snap| {
            if self.generation() != generation {
                return false;
            }
            action = Some(apply(snap, event, update));
            true
        });
        action
    }
}

fn apply(snap: &mut SessionSnapshot, event: SessionEvent, update: UserUpdate) -> SessionAction {
    let (next, action) = machine::handle_event(snap.state, event);
    if next != snap.state {
        debug!(
            from = snap.state.label(),
            to = next.label(),
            ?event,
            "session transition"
        );
    }
    snap.state = next;
    match update {
        UserUpdate::Keep => {}
        UserUpdate::Set(user) => snap.user = Some(user),
        UserUpdate::Clear => snap.user = None,
    }
    action
}
