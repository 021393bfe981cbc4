pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStore;
pub use traits::{Isolation, SessionRow, SessionStore};

use crate::config::SessionConfig;
use std::path::Path;

/// Factory: build the configured store backend.
///
/// Only "sqlite" ships. Alternative backing stores are out of scope by
/// design; the trait seam is where a per-row-locking backend would go.
pub fn create_store(config: &SessionConfig, path: &Path) -> anyhow::Result<Box<dyn SessionStore>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Box::new(SqliteStore::open(
            path,
            &config.table,
            config.busy_timeout_ms,
        )?)),
        other => anyhow::bail!("unknown session store backend '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn factory_sqlite() {
        let tmp = TempDir::new().unwrap();
        let cfg = SessionConfig::default();
        let store = create_store(&cfg, &tmp.path().join("s.db")).unwrap();
        assert_eq!(store.name(), "sqlite");
    }

    #[test]
    fn factory_unknown_backend_errors() {
        let tmp = TempDir::new().unwrap();
        let cfg = SessionConfig {
            backend: "redis".into(),
            ..SessionConfig::default()
        };
        assert!(create_store(&cfg, &tmp.path().join("s.db")).is_err());
    }
}
