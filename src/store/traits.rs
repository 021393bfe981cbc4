use crate::error::BackendError;
use async_trait::async_trait;

/// Isolation requested when a session cycle begins.
///
/// Read-committed is the floor the lifecycle needs: uncommitted writes
/// from other cycles must stay invisible while the row lock serializes
/// access to one sid. A backend may run stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadCommitted,
    Serializable,
}

/// A session row fetched under the exclusive lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    /// Absolute expiry, epoch seconds.
    pub expiry: i64,
    /// Opaque payload; empty for a freshly created session.
    pub data: Vec<u8>,
}

/// Transactional façade over the relational backend holding session rows.
///
/// One instance is exclusively owned by one in-flight request cycle;
/// the open transaction (and with it the lock taken by
/// `lock_for_update`) lives on the instance's connection until `commit`
/// or `rollback`. Dropping the instance mid-cycle discards the open
/// transaction. No operation retries internally; every failure is a
/// [`BackendError`] carrying the driver error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Whether a transaction is currently open on this store.
    fn in_transaction(&self) -> bool;

    /// Begin a transaction at (at least) the requested isolation.
    async fn begin(&self, isolation: Isolation) -> Result<(), BackendError>;

    /// Commit the open transaction, releasing the lock.
    async fn commit(&self) -> Result<(), BackendError>;

    /// Roll back the open transaction, releasing the lock.
    async fn rollback(&self) -> Result<(), BackendError>;

    /// Lock the row for `sid` exclusively and fetch it if present.
    ///
    /// "select … for update" semantics: blocks until the lock is
    /// available or the backend's lock-wait timeout fires.
    async fn lock_for_update(&self, sid: &str) -> Result<Option<SessionRow>, BackendError>;

    /// Insert a fresh row; a key collision is an error, not an update.
    async fn insert(&self, sid: &str, expiry: i64, data: &[u8]) -> Result<(), BackendError>;

    /// Insert or, on key conflict, update expiry and data in place.
    async fn upsert(&self, sid: &str, expiry: i64, data: &[u8]) -> Result<(), BackendError>;

    /// Delete the row for `sid`. Zero rows affected is success.
    async fn delete_by_sid(&self, sid: &str) -> Result<usize, BackendError>;

    /// Delete every row with `expiry < now`. Returns rows removed.
    async fn delete_expired_before(&self, now: i64) -> Result<usize, BackendError>;

    /// Cheap liveness probe.
    async fn health_check(&self) -> bool;
}
