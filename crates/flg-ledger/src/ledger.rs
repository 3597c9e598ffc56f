//! The credit ledger.
//!
//! `Ledger` is the only component that changes balances. Every mutation
//! runs as one store transaction that reads the balance, writes the new
//! value and appends the matching transaction record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use flg_core::{
    validate_amount, CreditAccount, CreditPackage, CreditTransaction, Identity, LedgerError,
    Result, TransactionType, UserId,
};
use flg_store::{run_transaction, DocumentStore, TxError};

/// Outcome of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Balance after the mutation.
    pub balance: i64,

    /// The transaction record written with it.
    pub transaction: CreditTransaction,
}

/// The credit ledger.
///
/// Holds an injected store handle and a per-instance cache of the newest
/// balance seen for each user. The cache only feeds the fail-fast check in
/// [`Ledger::spend`]; it is never trusted for correctness.
pub struct Ledger {
    store: Arc<dyn DocumentStore>,
    cache: RwLock<HashMap<UserId, CachedBalance>>,
}

/// A balance together with the `updated_at` of the document it was read from.
#[derive(Debug, Clone, Copy)]
struct CachedBalance {
    balance: i64,
    as_of: DateTime<Utc>,
}

/// What one mutation attempt saw, committed or not.
struct Applied {
    outcome: Result<Receipt>,
    observed_at: Option<DateTime<Utc>>,
}

impl Ledger {
    /// Create a ledger over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Return the caller's balance, creating a zero balance if none exists.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotAuthenticated` without an identity.
    /// - `LedgerError::LedgerUnavailable` if the store fails.
    pub async fn get_or_create_balance(&self, identity: &Identity) -> Result<CreditAccount> {
        let user_id = identity.user_id().ok_or(LedgerError::NotAuthenticated)?.clone();

        let account = self
            .blocking({
                let user_id = user_id.clone();
                move |store| get_or_create(store, &user_id)
            })
            .await?;

        self.remember(&user_id, account.balance, account.updated_at)
            .await;
        Ok(account)
    }

    /// Add `amount` credits to the caller's balance.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotAuthenticated` without an identity.
    /// - `LedgerError::InvalidAmount` if `amount <= 0`.
    /// - `LedgerError::LedgerUnavailable` if the store fails; the purchase
    ///   may or may not have been applied.
    pub async fn purchase(
        &self,
        identity: &Identity,
        amount: i64,
        description: impl Into<String>,
    ) -> Result<Receipt> {
        let user_id = identity.user_id().ok_or(LedgerError::NotAuthenticated)?;
        validate_amount(amount)?;

        self.mutate(user_id, TransactionType::Purchase, amount, description.into())
            .await
    }

    /// Buy a catalogue package.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::purchase`].
    pub async fn purchase_package(
        &self,
        identity: &Identity,
        package: &CreditPackage,
    ) -> Result<Receipt> {
        self.purchase(identity, package.credits, package.description())
            .await
    }

    /// Remove `amount` credits from the caller's balance.
    ///
    /// A cached balance below `amount` fails fast without a store round
    /// trip. The check inside the transaction is the authoritative one.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotAuthenticated` without an identity.
    /// - `LedgerError::InvalidAmount` if `amount <= 0`.
    /// - `LedgerError::InsufficientCredits` if the balance is too low.
    /// - `LedgerError::LedgerUnavailable` if the store fails; the spend may
    ///   or may not have been applied.
    pub async fn spend(
        &self,
        identity: &Identity,
        amount: i64,
        description: impl Into<String>,
    ) -> Result<Receipt> {
        let user_id = identity.user_id().ok_or(LedgerError::NotAuthenticated)?;
        validate_amount(amount)?;

        if let Some(cached) = self.cached_balance(user_id).await {
            if cached < amount {
                tracing::debug!(user_id = %user_id, cached, amount, "spend rejected by cached balance");
                return Err(LedgerError::InsufficientCredits {
                    balance: cached,
                    required: amount,
                });
            }
        }

        self.mutate(user_id, TransactionType::Spend, amount, description.into())
            .await
    }

    /// The newest balance this ledger observed for `user_id`, if any.
    pub async fn cached_balance(&self, user_id: &UserId) -> Option<i64> {
        self.cache
            .read()
            .await
            .get(user_id)
            .map(|cached| cached.balance)
    }

    async fn mutate(
        &self,
        user_id: &UserId,
        kind: TransactionType,
        amount: i64,
        description: String,
    ) -> Result<Receipt> {
        let Applied {
            outcome,
            observed_at,
        } = match self
            .blocking({
                let user_id = user_id.clone();
                move |store| Ok(apply(store, &user_id, kind, amount, &description))
            })
            .await
        {
            Ok(applied) => applied,
            Err(err) => Applied {
                outcome: Err(err),
                observed_at: None,
            },
        };

        match &outcome {
            Ok(receipt) => {
                tracing::info!(
                    user_id = %user_id,
                    kind = kind.as_str(),
                    amount,
                    balance = receipt.balance,
                    transaction_id = %receipt.transaction.id,
                    "Ledger mutation committed"
                );
                self.remember(user_id, receipt.balance, receipt.transaction.created_at)
                    .await;
            }
            Err(LedgerError::InsufficientCredits { balance, required }) => {
                tracing::info!(
                    user_id = %user_id,
                    balance,
                    required,
                    "Spend rejected: insufficient credits"
                );
                if let Some(as_of) = observed_at {
                    self.remember(user_id, *balance, as_of).await;
                }
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    kind = kind.as_str(),
                    amount,
                    error = %err,
                    "Ledger mutation failed"
                );
            }
        }

        outcome
    }

    /// Cache `balance` unless a newer observation is already cached.
    ///
    /// Concurrent calls for one user can finish out of order; comparing
    /// `updated_at` keeps a late writer from restoring an older balance.
    async fn remember(&self, user_id: &UserId, balance: i64, as_of: DateTime<Utc>) {
        let mut cache = self.cache.write().await;
        match cache.get(user_id) {
            Some(cached) if cached.as_of > as_of => {}
            _ => {
                cache.insert(user_id.clone(), CachedBalance { balance, as_of });
            }
        }
    }

    /// Run a store call on the blocking pool.
    ///
    /// The task is not cancelled if the returned future is dropped, so a
    /// transaction that commits stays committed.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| LedgerError::LedgerUnavailable(format!("ledger task failed: {e}")))?
    }
}

fn get_or_create(store: &dyn DocumentStore, user_id: &UserId) -> Result<CreditAccount> {
    run_transaction(store, |txn| {
        if let Some(existing) = txn.get_balance(user_id)? {
            return Ok(existing);
        }
        let account = CreditAccount::new(user_id.clone());
        txn.put_balance(&account)?;
        Ok::<_, TxError<LedgerError>>(account)
    })
    .map_err(into_ledger_error)
}

fn apply(
    store: &dyn DocumentStore,
    user_id: &UserId,
    kind: TransactionType,
    amount: i64,
    description: &str,
) -> Applied {
    let mut observed_at = None;

    let outcome = run_transaction(store, |txn| {
        let existing = txn.get_balance(user_id)?;
        // Never step behind the stored timestamp, so `updated_at` orders commits.
        let now = existing
            .as_ref()
            .map_or_else(Utc::now, |account| Utc::now().max(account.updated_at));
        let mut account =
            existing.unwrap_or_else(|| CreditAccount::new_at(user_id.clone(), now));
        observed_at = Some(account.updated_at);

        let balance = match kind {
            TransactionType::Purchase => account.credit(amount, now),
            TransactionType::Spend => account.debit(amount, now),
        }
        .map_err(TxError::Aborted)?;

        let transaction =
            CreditTransaction::new(user_id.clone(), kind, amount, description.to_string(), now);

        txn.put_balance(&account)?;
        txn.insert_transaction(&transaction)?;

        Ok(Receipt {
            balance,
            transaction,
        })
    })
    .map_err(into_ledger_error);

    Applied {
        outcome,
        observed_at,
    }
}

fn into_ledger_error(err: TxError<LedgerError>) -> LedgerError {
    match err {
        TxError::Aborted(err) => err,
        TxError::Store(err) => LedgerError::LedgerUnavailable(err.to_string()),
    }
}
