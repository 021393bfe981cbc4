#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

//! SQL-backed session lifecycle with exclusive per-request locking.
//!
//! A request cycle is read → write → close: `read` opens a transaction
//! and locks the session row, `write` upserts the opaque payload with a
//! refreshed expiry, `close` commits and releases the lock. Two
//! requests racing on the same session id are totally ordered by lock
//! acquisition — correctness holds across processes sharing the
//! backend, with no in-process coordination.
//!
//! Unknown and expired ids regenerate transparently: the caller gets an
//! empty payload while the lifecycle mints an unpredictable replacement
//! id, swaps the client cookie, and locks a fresh row. Expired rows are
//! swept in bulk by the next `close` after `gc` arms the deferred flag.
//!
//! ```no_run
//! use sessionlock::{HeaderSink, SessionConfig, SessionLifecycle, SqliteStore};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::default();
//! let store = SqliteStore::open(
//!     std::path::Path::new("sessions.db"),
//!     &config.table,
//!     config.busy_timeout_ms,
//! )?;
//! let mut session = SessionLifecycle::new(
//!     Box::new(store),
//!     Box::new(HeaderSink::new()),
//!     config,
//! );
//!
//! session.open("", "");
//! let payload = session.read("id-from-request-cookie").await?;
//! session.write("id-from-request-cookie", b"new state").await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod cookie;
pub mod error;
pub mod lifecycle;
pub mod sid;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CookieConfig, SessionConfig, TableConfig};
pub use cookie::{CookieSink, HeaderSink, NullSink};
pub use error::{BackendError, SessionError};
pub use lifecycle::{Phase, SessionLifecycle};
pub use store::{Isolation, SessionRow, SessionStore, SqliteStore, create_store};
