use thiserror::Error;

// ── Error types ─────────────────────────────────────────────────────

/// Failure surfaced by the relational backend: connection loss,
/// constraint violation, lock-wait timeout. Wraps the driver error.
#[derive(Debug, Error)]
#[error("session backend error: {source}")]
pub struct BackendError {
    #[from]
    source: anyhow::Error,
}

impl BackendError {
    /// Borrow the underlying driver error chain.
    pub fn source_chain(&self) -> &anyhow::Error {
        &self.source
    }
}

/// Everything the session lifecycle can fail with.
///
/// A `Backend` error means the current request's session is gone: the
/// transaction was rolled back and the client cookie cleared before
/// this was returned. The caller must treat it as "no session available
/// this request", not as "session empty".
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// write/destroy was handed an id that is neither the one supplied
    /// to read nor the one produced by regeneration.
    #[error("session id {supplied:?} does not match the active session {active:?}")]
    IdMismatch { supplied: String, active: String },

    /// write was called before any read opened a session cycle.
    #[error("no session cycle is open; call read first")]
    NotOpen,
}
