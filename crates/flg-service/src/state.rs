//! Application state.

use std::sync::Arc;

use flg_ledger::{HistoryReader, Ledger, ProfileStore};
use flg_store::{DocumentStore, MemoryStore, StoreError};

use crate::auth::TokenVerifier;
use crate::config::{ServiceConfig, StoreBackend};

/// Application state shared across handlers.
pub struct AppState {
    /// Balance mutations.
    pub ledger: Ledger,

    /// Transaction history.
    pub history: HistoryReader,

    /// Profiles and account opening.
    pub profiles: ProfileStore,

    /// Bearer token verifier, absent when no secret is configured.
    pub verifier: Option<TokenVerifier>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over an opened store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        let verifier = config
            .auth_jwt_secret
            .as_deref()
            .map(|secret| TokenVerifier::new(secret, &config.auth_audience));

        if verifier.is_none() {
            tracing::warn!("AUTH_JWT_SECRET not set - all bearer tokens will be rejected");
        }

        Self {
            ledger: Ledger::new(Arc::clone(&store)),
            history: HistoryReader::new(Arc::clone(&store), config.ledger_config()),
            profiles: ProfileStore::new(store),
            verifier,
            config,
        }
    }
}

/// Open the store selected by the configuration.
///
/// # Errors
///
/// Returns an error if the `RocksDB` store cannot be opened, or was
/// requested in a build without the `rocksdb-backend` feature.
pub fn open_store(config: &ServiceConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store - data is lost on restart");
            Ok(Arc::new(MemoryStore::with_config(config.store_config())))
        }
        StoreBackend::RocksDb => open_rocks(config),
    }
}

#[cfg(feature = "rocksdb-backend")]
fn open_rocks(config: &ServiceConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = flg_store::RocksStore::open_with_config(&config.data_dir, config.store_config())?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_rocks(_config: &ServiceConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    Err(StoreError::Unavailable(
        "built without the rocksdb-backend feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_uses_configured_attempts() {
        let config = ServiceConfig {
            txn_max_attempts: 7,
            ..ServiceConfig::default()
        };

        let store = open_store(&config).unwrap();

        assert_eq!(store.max_attempts(), 7);
    }

    #[cfg(not(feature = "rocksdb-backend"))]
    #[test]
    fn rocksdb_requires_feature() {
        let config = ServiceConfig {
            store_backend: StoreBackend::RocksDb,
            ..ServiceConfig::default()
        };

        assert!(matches!(
            open_store(&config),
            Err(StoreError::Unavailable(_))
        ));
    }
}
