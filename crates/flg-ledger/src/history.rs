//! Transaction history.

use std::cmp::Reverse;
use std::sync::Arc;

use flg_core::{CreditTransaction, Identity, LedgerError, Result, UserId};
use flg_store::DocumentStore;

use crate::config::LedgerConfig;

/// A page of a user's history, newest first.
///
/// A store failure does not fail the read: `transactions` is empty and
/// `error` says why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    /// Records sorted by `created_at` descending.
    pub transactions: Vec<CreditTransaction>,

    /// Set when the history could not be loaded.
    pub error: Option<LedgerError>,
}

impl History {
    /// Whether the page is empty because the store failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Read-only view over a user's transaction records.
pub struct HistoryReader {
    store: Arc<dyn DocumentStore>,
    config: LedgerConfig,
}

impl HistoryReader {
    /// Create a reader over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Most recent records using the configured page size.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotAuthenticated` without an identity.
    pub async fn recent(&self, identity: &Identity) -> Result<History> {
        self.list_recent(identity, self.config.history_limit).await
    }

    /// Up to `limit` most recent records of the caller.
    ///
    /// `limit` is capped at `LedgerConfig::max_history_limit`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotAuthenticated` without an identity. Store
    /// failures are reported through [`History::error`].
    pub async fn list_recent(&self, identity: &Identity, limit: usize) -> Result<History> {
        let user_id = identity.user_id().ok_or(LedgerError::NotAuthenticated)?.clone();
        let limit = self.config.clamp_limit(limit);
        if limit == 0 {
            return Ok(History::default());
        }

        let store = Arc::clone(&self.store);
        let fetched = tokio::task::spawn_blocking({
            let user_id = user_id.clone();
            move || store.list_transactions_by_owner(&user_id, limit)
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|res| res.map_err(|e| e.to_string()));

        match fetched {
            Ok(mut transactions) => {
                sort_recent_first(&mut transactions);
                transactions.truncate(limit);
                Ok(History {
                    transactions,
                    error: None,
                })
            }
            Err(reason) => Ok(degraded(&user_id, reason)),
        }
    }
}

fn degraded(user_id: &UserId, reason: String) -> History {
    tracing::warn!(user_id = %user_id, error = %reason, "Transaction history unavailable");
    History {
        transactions: Vec::new(),
        error: Some(LedgerError::HistoryUnavailable(reason)),
    }
}

/// Sort records newest first, breaking timestamp ties by id.
pub fn sort_recent_first(transactions: &mut [CreditTransaction]) {
    transactions.sort_by_key(|tx| Reverse((tx.created_at, tx.id)));
}
