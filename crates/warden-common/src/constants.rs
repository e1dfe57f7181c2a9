//! Shared constants for Warden components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Warden HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8888";

/// Challenge validity in seconds: a Pending challenge older than this
/// is treated as Expired
pub const CHALLENGE_TTL_SECS: u64 = 60;

/// Number of display slots in one challenge
pub const ICON_SLOTS: usize = 5;

/// Number of distinct icons shown in one challenge
pub const DISTINCT_ICONS: usize = 3;

/// Fixed byte length of every rendered icon image; all icons of a
/// challenge are padded to this size so none is distinguishable by
/// content length
pub const ICON_IMAGE_BYTES: usize = 512;

/// Interval between expiry sweeps of the in-memory store (seconds)
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// Form key the HTTP layer binds login challenges to
pub const LOGIN_FORM_KEY: &str = "login";

/// Session cookie name
pub const SESSION_COOKIE: &str = "warden_sid";

/// Credential submissions a client may attempt before the form locks
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Client-side hard timeout while polling for a verification result (seconds)
pub const CLIENT_POLL_TIMEOUT_SECS: u64 = 6;

/// Client-side polling interval (milliseconds)
pub const CLIENT_POLL_INTERVAL_MS: u64 = 500;

/// Store key prefixes
pub mod store_keys {
    /// Challenge state: challenge:{session_id}:{form_key}
    pub const CHALLENGE_PREFIX: &str = "challenge:";
}

/// HTTP header names
pub mod headers {
    /// AJAX marker header; required on POST actions, forbidden on the
    /// GET image endpoint
    pub const X_REQUESTED_WITH: &str = "X-Requested-With";

    /// Expected value of the AJAX marker header
    pub const XML_HTTP_REQUEST: &str = "XMLHttpRequest";
}
