//! Storefront authentication primitives
//!
//! Everything the session manager needs below the state machine:
//! the user profile model, typed bearer tokens, the two persistence
//! substrates (a durable key/value store for the cached profile and a
//! cookie jar for the tokens), and the HTTP client for the backend's
//! auth endpoints. Nothing in this crate holds session state.
//!
//! Credential flow:
//! 1. Login completes elsewhere and the backend sets `token` + `refreshToken`
//! 2. `AuthClient::fetch_current_user()` resolves the profile from `token`
//! 3. Profile cached via `CredentialStore::write_cached_user()`
//! 4. On 401, `AuthClient::refresh_token()` mints a new access token
//! 5. New token written via `CredentialStore::write_access_token_cookie()`
//! 6. Teardown via `CredentialStore::clear_auth_cookies()` + `clear_cached_user()`

pub mod client;
pub mod constants;
pub mod cookie;
pub mod credentials;
pub mod error;
pub mod profile;
pub mod storage;
pub mod token;

pub use client::AuthClient;
pub use constants::*;
pub use cookie::{CookieJar, MemoryCookieJar, SameSite, StoredCookie};
pub use credentials::CredentialStore;
pub use error::{Error, Result};
pub use profile::UserProfile;
pub use storage::{DurableStore, FileStore, MemoryStore};
pub use token::{AccessToken, RefreshToken};
