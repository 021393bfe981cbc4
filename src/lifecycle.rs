//! The session lifecycle state machine.
//!
//! One instance serves one request at a time. A cycle is
//! read → (write)* → close: read opens a transaction and takes the
//! exclusive lock on the session row, write upserts the payload inside
//! that transaction, close commits and releases the lock. Mutual
//! exclusion across processes comes entirely from the backend lock —
//! there is no in-process synchronization to coordinate two lifecycles.
//!
//! When read finds no live row (unknown or expired id) it regenerates:
//! a fresh unpredictable id, cookie swap, and a locked empty row, all
//! transparent to the caller.

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::cookie::CookieSink;
use crate::error::{BackendError, SessionError};
use crate::sid;
use crate::store::{Isolation, SessionStore};
use std::sync::Arc;

/// Where the lifecycle sits in the read-to-close window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Opened,
    /// Holding the lock on a pre-existing live row.
    LockedExisting,
    /// Holding the lock on a row created by regeneration.
    LockedNew,
    Closed,
    Destroyed,
}

pub struct SessionLifecycle {
    store: Box<dyn SessionStore>,
    cookies: Box<dyn CookieSink>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    phase: Phase,
    /// Id the caller presented to read, unchanged for the whole cycle.
    supplied_sid: Option<String>,
    /// Current id; diverges from `supplied_sid` after regeneration.
    active_sid: Option<String>,
    /// Armed by gc, consumed by the next successful close.
    collect_garbage: bool,
}

impl SessionLifecycle {
    pub fn new(
        store: Box<dyn SessionStore>,
        cookies: Box<dyn CookieSink>,
        config: SessionConfig,
    ) -> Self {
        Self::with_clock(store, cookies, Arc::new(SystemClock), config)
    }

    /// Build with an explicit clock so tests can step time.
    pub fn with_clock(
        store: Box<dyn SessionStore>,
        cookies: Box<dyn CookieSink>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            cookies,
            clock,
            config,
            phase: Phase::Idle,
            supplied_sid: None,
            active_sid: None,
            collect_garbage: false,
        }
    }

    /// The id all in-cycle operations act on. After regeneration this
    /// is the replacement id, which the HTTP layer needs to echo back.
    pub fn active_sid(&self) -> Option<&str> {
        self.active_sid.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Session-handler contract entry point. Performs no I/O; the real
    /// work happens in read.
    pub fn open(&mut self, _save_path: &str, _name: &str) -> bool {
        self.phase = Phase::Opened;
        true
    }

    /// Begin a cycle for the candidate id (possibly empty, unknown, or
    /// expired) and return its payload under the exclusive lock.
    ///
    /// A live row returns exactly its last-written data. Anything else
    /// triggers regeneration and returns an empty payload. Either way
    /// the transaction stays open until close.
    pub async fn read(&mut self, sid: &str) -> Result<Vec<u8>, SessionError> {
        self.supplied_sid = Some(sid.to_owned());
        self.active_sid = Some(sid.to_owned());
        match self.read_inner(sid).await {
            Ok(data) => Ok(data),
            Err(err) => {
                self.abort().await;
                Err(err.into())
            }
        }
    }

    async fn read_inner(&mut self, sid: &str) -> Result<Vec<u8>, BackendError> {
        self.store.begin(Isolation::ReadCommitted).await?;

        if let Some(row) = self.store.lock_for_update(sid).await? {
            if row.expiry > self.clock.now() {
                self.phase = Phase::LockedExisting;
                return Ok(row.data);
            }
        }

        // No such session, or expired: replace it under the same
        // transaction so the new row is locked like an existing one.
        self.regenerate().await?;
        Ok(Vec::new())
    }

    /// Regeneration protocol: fresh unpredictable id, cookie swap, and
    /// a locked empty row. A colliding insert propagates as a backend
    /// error; no retry.
    async fn regenerate(&mut self) -> Result<(), BackendError> {
        let fresh = sid::generate();
        tracing::debug!("session missing or expired; issuing replacement id");

        // Expire the old cookie even if the old id never existed, so no
        // stale cookie lingers on the client.
        self.cookies.clear_session_cookie(&self.config.cookie);
        self.cookies.set_session_cookie(&fresh, &self.config.cookie);

        let expiry = self.clock.now() + self.config.ttl_secs;
        self.store.insert(&fresh, expiry, &[]).await?;

        self.active_sid = Some(fresh);
        self.phase = Phase::LockedNew;
        Ok(())
    }

    /// Upsert the payload for the active session inside the still-open
    /// transaction, refreshing its expiry to now + TTL.
    ///
    /// The sid parameter keeps the session-handler contract shape; the
    /// lifecycle's own remembered id is authoritative, since
    /// regeneration may have replaced the one the caller still holds.
    pub async fn write(&mut self, sid: &str, data: &[u8]) -> Result<(), SessionError> {
        let active = self.require_cycle_id(sid)?;
        match self.write_inner(&active, data).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.abort().await;
                Err(err.into())
            }
        }
    }

    async fn write_inner(&mut self, sid: &str, data: &[u8]) -> Result<(), BackendError> {
        let expiry = self.clock.now() + self.config.ttl_secs;
        self.store.upsert(sid, expiry, data).await
    }

    /// Commit the cycle, releasing the row lock; then, if gc armed one,
    /// run the deferred expiry sweep.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        match self.close_inner().await {
            Ok(()) => {
                self.phase = Phase::Closed;
                Ok(())
            }
            Err(err) => {
                self.abort().await;
                Err(err.into())
            }
        }
    }

    async fn close_inner(&mut self) -> Result<(), BackendError> {
        if self.store.in_transaction() {
            self.store.commit().await?;
        }
        if self.collect_garbage {
            let removed = self.store.delete_expired_before(self.clock.now()).await?;
            tracing::debug!(removed, "swept expired sessions");
            // Only a completed sweep disarms the flag; a failed one
            // leaves it set so a later close retries.
            self.collect_garbage = false;
        }
        Ok(())
    }

    /// Delete the active session's row and expire the client cookie.
    ///
    /// Needs no prior read. Destroying an id with no row (or with no
    /// cycle open at all) is a benign no-op: the cookie is still
    /// cleared and success reported.
    pub async fn destroy(&mut self, sid: &str) -> Result<(), SessionError> {
        if self.active_sid.is_none() {
            self.cookies.clear_session_cookie(&self.config.cookie);
            self.phase = Phase::Destroyed;
            return Ok(());
        }
        let active = self.require_cycle_id(sid)?;
        match self.store.delete_by_sid(&active).await {
            Ok(removed) => {
                tracing::debug!(removed, "destroyed session");
                self.cookies.clear_session_cookie(&self.config.cookie);
                self.supplied_sid = None;
                self.active_sid = None;
                self.phase = Phase::Destroyed;
                Ok(())
            }
            Err(err) => {
                self.abort().await;
                Err(err.into())
            }
        }
    }

    /// Arm the deferred collection flag; the next close performs the
    /// sweep. Always succeeds.
    ///
    /// The max-age parameter is part of the session-handler contract
    /// but does not bound the sweep: TTL is baked into each row's
    /// stored expiry at write time, and the sweep removes exactly the
    /// rows with `expiry < now`.
    pub fn gc(&mut self, _max_age_secs: i64) -> bool {
        self.collect_garbage = true;
        true
    }

    /// Resolve the id an in-cycle operation acts on.
    ///
    /// Accepts the id supplied to read (the one the caller still holds
    /// even after regeneration) or the active id itself; anything else
    /// is a caller bug surfaced as an explicit mismatch.
    fn require_cycle_id(&self, sid: &str) -> Result<String, SessionError> {
        let Some(active) = self.active_sid.as_deref() else {
            return Err(SessionError::NotOpen);
        };
        if sid != active && Some(sid) != self.supplied_sid.as_deref() {
            return Err(SessionError::IdMismatch {
                supplied: sid.to_owned(),
                active: active.to_owned(),
            });
        }
        Ok(active.to_owned())
    }

    /// Standard failure path: roll back any open transaction, expire
    /// the client cookie so no identifier with undefined row state is
    /// presented again, and leave the session unusable for this
    /// request.
    async fn abort(&mut self) {
        if self.store.in_transaction() {
            if let Err(err) = self.store.rollback().await {
                tracing::warn!("rollback failed during session abort: {err}");
            }
        }
        self.cookies.clear_session_cookie(&self.config.cookie);
        self.supplied_sid = None;
        self.active_sid = None;
        self.phase = Phase::Idle;
    }
}
