use serde::{Deserialize, Serialize};

// ── Session configuration ───────────────────────────────────────────

/// Static configuration for the session store and lifecycle.
///
/// Deserializable from TOML; every field has a default so an empty
/// table is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Store backend. Only "sqlite" ships; the trait seam exists for
    /// backends with real per-row locks.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Seconds a session row stays live after its last write.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    /// How long a contender waits on the backend lock before the wait
    /// surfaces as a backend error, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub cookie: CookieConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            ttl_secs: default_ttl_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
            table: TableConfig::default(),
            cookie: CookieConfig::default(),
        }
    }
}

fn default_backend() -> String {
    "sqlite".into()
}
fn default_ttl_secs() -> i64 {
    1440
}
fn default_busy_timeout_ms() -> u64 {
    5000
}

// ── Table naming ────────────────────────────────────────────────────

/// Table and column names for the backing sessions table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_sid_column")]
    pub sid_column: String,
    #[serde(default = "default_expiry_column")]
    pub expiry_column: String,
    #[serde(default = "default_data_column")]
    pub data_column: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            sid_column: default_sid_column(),
            expiry_column: default_expiry_column(),
            data_column: default_data_column(),
        }
    }
}

impl TableConfig {
    /// Reject names that cannot be spliced into SQL as identifiers.
    ///
    /// These come from static configuration, not request input, but the
    /// store still refuses anything outside `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn validate(&self) -> anyhow::Result<()> {
        for name in [
            &self.table,
            &self.sid_column,
            &self.expiry_column,
            &self.data_column,
        ] {
            if !is_sql_identifier(name) {
                anyhow::bail!("invalid SQL identifier in table config: {name:?}");
            }
        }
        Ok(())
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_table() -> String {
    "sessions".into()
}
fn default_sid_column() -> String {
    "sid".into()
}
fn default_expiry_column() -> String {
    "expiry".into()
}
fn default_data_column() -> String {
    "data".into()
}

// ── Cookie attributes ───────────────────────────────────────────────

/// Attributes stamped onto the client-visible session id cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    /// Max-Age in seconds; 0 means a session cookie (no Max-Age).
    #[serde(default)]
    pub lifetime_secs: i64,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Empty string omits the Domain attribute.
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default = "default_http_only")]
    pub http_only: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            lifetime_secs: 0,
            path: default_cookie_path(),
            domain: String::new(),
            secure: false,
            http_only: default_http_only(),
        }
    }
}

fn default_cookie_name() -> String {
    "session".into()
}
fn default_cookie_path() -> String {
    "/".into()
}
fn default_http_only() -> bool {
    true
}
