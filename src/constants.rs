//! Shared constants used across the application.

/// Posts shown per list on a profile page, and the page size used while
/// collecting them.
pub const PROFILE_POSTS_PER_PAGE: usize = 10;

/// A viewer counts towards a profile's view counter at most once per hour.
pub const PROFILE_VIEW_WINDOW_MS: i64 = 3_600_000;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Session cookie lifetime in seconds (30 days).
pub const SESSION_MAX_AGE_SECS: i64 = 2_592_000;

/// SQLite pool size. A profile request reads up to three privilege sets and
/// two post lists at once; more connections only queue on the write lock.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits for the SQLite lock. Index updates touch several
/// keys without a transaction, so a short wait would drop some of them.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 10;
