//! Client-visible session cookie boundary.
//!
//! The lifecycle never reads the cookie — the caller extracts the
//! candidate id from the request and passes it to `read`. The sink only
//! pushes mutations outward: a fresh id after regeneration, or an
//! immediate expiry after destruction and on every failure path.

use crate::config::CookieConfig;
use parking_lot::Mutex;

/// Pushes session-cookie mutations toward the client response.
pub trait CookieSink: Send + Sync {
    /// Bind the session cookie to `sid` with the configured attributes.
    fn set_session_cookie(&self, sid: &str, cookie: &CookieConfig);

    /// Expire the session cookie immediately.
    fn clear_session_cookie(&self, cookie: &CookieConfig);
}

// ── Header-emitting sink ────────────────────────────────────────────

/// Queues RFC 6265 `Set-Cookie` header values for the HTTP layer to
/// drain into the response.
#[derive(Debug, Default)]
pub struct HeaderSink {
    headers: Mutex<Vec<String>>,
}

impl HeaderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued `Set-Cookie` value, oldest first.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut self.headers.lock())
    }
}

impl CookieSink for HeaderSink {
    fn set_session_cookie(&self, sid: &str, cookie: &CookieConfig) {
        self.headers
            .lock()
            .push(format_set_cookie(cookie, sid, cookie.lifetime_secs));
    }

    fn clear_session_cookie(&self, cookie: &CookieConfig) {
        // Max-Age=0 plus an Expires in the past covers clients that
        // only honor one of the two.
        let mut header = format_set_cookie(cookie, "", 0);
        header.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        self.headers.lock().push(header);
    }
}

fn format_set_cookie(cookie: &CookieConfig, value: &str, lifetime_secs: i64) -> String {
    let mut header = format!("{}={value}", cookie.name);
    if value.is_empty() {
        header.push_str("; Max-Age=0");
    } else if lifetime_secs > 0 {
        header.push_str(&format!("; Max-Age={lifetime_secs}"));
    }
    header.push_str(&format!("; Path={}", cookie.path));
    if !cookie.domain.is_empty() {
        header.push_str(&format!("; Domain={}", cookie.domain));
    }
    if cookie.secure {
        header.push_str("; Secure");
    }
    if cookie.http_only {
        header.push_str("; HttpOnly");
    }
    header
}

// ── No-op sink ──────────────────────────────────────────────────────

/// Explicit no-op sink for callers with no client to talk to (batch
/// jobs, tests of the storage layer alone).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self
    }
}

impl CookieSink for NullSink {
    fn set_session_cookie(&self, _sid: &str, _cookie: &CookieConfig) {}

    fn clear_session_cookie(&self, _cookie: &CookieConfig) {}
}
