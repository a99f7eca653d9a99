//! Backend paths, cookie names, and default lifetimes
//!
//! Paths are relative to the configured backend base URL.

/// Current-user lookup (Bearer access token)
pub const CURRENT_USER_PATH: &str = "/api/auth/me";

/// Refresh-token exchange (no Authorization header)
pub const REFRESH_TOKEN_PATH: &str = "/api/auth/refresh-token";

/// Backend logout notification (Bearer access token)
pub const LOGOUT_PATH: &str = "/api/auth/logout";

/// Cookie holding the short-lived access token
pub const ACCESS_TOKEN_COOKIE: &str = "token";

/// Cookie holding the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Durable cache entry holding the serialized profile
pub const USER_CACHE_KEY: &str = "user";

/// Access-token cookie max-age written after a refresh (2 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 120;

/// Refresh-token cookie max-age (7 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
