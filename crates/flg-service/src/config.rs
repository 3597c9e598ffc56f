//! Service configuration.

use std::str::FromStr;

use flg_ledger::{LedgerConfig, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use flg_store::{StoreConfig, DEFAULT_MAX_ATTEMPTS};

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// In-process store. Data is lost on restart.
    #[default]
    Memory,

    /// Persistent `RocksDB` store under `data_dir`.
    RocksDb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/flg").
    pub data_dir: String,

    /// Store backend (default: memory).
    pub store_backend: StoreBackend,

    /// HS256 secret shared with the identity provider.
    ///
    /// Without it every bearer token is rejected.
    pub auth_jwt_secret: Option<String>,

    /// Expected JWT audience (default: "flg").
    pub auth_audience: String,

    /// Default history page size.
    pub history_limit: usize,

    /// Attempts per store transaction before giving up.
    pub txn_max_attempts: u32,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            store_backend: std::env::var("STORE_BACKEND")
                .ok()
                .and_then(|s| {
                    s.parse()
                        .map_err(|e| tracing::warn!(error = %e, "Ignoring STORE_BACKEND"))
                        .ok()
                })
                .unwrap_or(defaults.store_backend),
            auth_jwt_secret: std::env::var("AUTH_JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or(defaults.auth_audience),
            history_limit: parse_env("HISTORY_LIMIT").unwrap_or(defaults.history_limit),
            txn_max_attempts: parse_env("TXN_MAX_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.txn_max_attempts),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: parse_env("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parse_env("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Ledger settings derived from this configuration.
    #[must_use]
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            history_limit: self.history_limit.min(MAX_HISTORY_LIMIT),
            max_history_limit: MAX_HISTORY_LIMIT,
        }
    }

    /// Store settings derived from this configuration.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_attempts: self.txn_max_attempts,
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/flg".into(),
            store_backend: StoreBackend::Memory,
            auth_jwt_secret: None,
            auth_audience: "flg".into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            txn_max_attempts: DEFAULT_MAX_ATTEMPTS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
