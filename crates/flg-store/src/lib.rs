//! Transactional document store for the FLG credit ledger.
//!
//! The ledger consumes a key-document store that supports atomic
//! read-modify-write across several documents. This crate defines that
//! contract and ships two implementations:
//!
//! - [`MemoryStore`]: in-process store with optimistic concurrency control,
//!   used by tests and single-node deployments.
//! - `RocksStore` (feature `rocksdb-backend`): persistent store on a `RocksDB`
//!   `OptimisticTransactionDB`.
//!
//! # Collections
//!
//! - `balances`: one [`CreditAccount`] per user
//! - `transactions`: append-only [`CreditTransaction`] records
//! - `profiles`: one [`Profile`] per user
//! - `usernames`: username to owner index
//!
//! # Transactions
//!
//! Transactions are optimistic. Reads are tracked and commit fails with
//! [`StoreError::Conflict`] if a document read by the transaction changed in
//! the meantime. [`run_transaction`] re-runs the whole body on conflict, up
//! to the store's configured attempt ceiling.
//!
//! # Example
//!
//! ```
//! use flg_store::{run_transaction, MemoryStore, StoreError, TxError};
//! use flg_core::{CreditAccount, UserId};
//!
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//!
//! let balance = run_transaction(&store, |txn| {
//!     let mut account = txn
//!         .get_balance(&user_id)?
//!         .unwrap_or_else(|| CreditAccount::new(user_id.clone()));
//!     account.balance += 10;
//!     txn.put_balance(&account)?;
//!     Ok::<_, TxError<StoreError>>(account.balance)
//! })
//! .unwrap();
//!
//! assert_eq!(balance, 10);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use flg_core::{CreditAccount, CreditTransaction, Profile, UserId};

/// Default number of attempts before a conflicting transaction is given up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of attempts for one transaction.
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// The storage trait defining all database operations.
///
/// Plain reads outside a transaction see the latest committed state. All
/// writes go through a [`StoreTransaction`].
pub trait DocumentStore: Send + Sync {
    /// Begin a new transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;

    /// Maximum number of attempts [`run_transaction`] makes.
    fn max_attempts(&self) -> u32;

    /// Get a balance document by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balance(&self, user_id: &UserId) -> Result<Option<CreditAccount>>;

    /// Get a profile by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>>;

    /// List up to `limit` transactions owned by a user.
    ///
    /// No ordering is guaranteed; callers sort the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_owner(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>>;
}

/// An open optimistic transaction.
///
/// Dropping a transaction without calling [`StoreTransaction::commit`]
/// discards its writes.
pub trait StoreTransaction {
    /// Read a balance document, tracking it for conflict detection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balance(&mut self, user_id: &UserId) -> Result<Option<CreditAccount>>;

    /// Write a balance document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_balance(&mut self, account: &CreditAccount) -> Result<()>;

    /// Append a transaction record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn insert_transaction(&mut self, transaction: &CreditTransaction) -> Result<()>;

    /// Read a profile, tracking it for conflict detection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile(&mut self, user_id: &UserId) -> Result<Option<Profile>>;

    /// Write a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_profile(&mut self, profile: &Profile) -> Result<()>;

    /// Look up the owner of a username, tracking it for conflict detection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_username_owner(&mut self, username: &str) -> Result<Option<UserId>>;

    /// Claim a username for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_username(&mut self, username: &str, owner: &UserId) -> Result<()>;

    /// Release a username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_username(&mut self, username: &str) -> Result<()>;

    /// Commit all writes atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a tracked document changed since it
    /// was read, or another error if the database operation fails.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Failure of a transaction body run by [`run_transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxError<E> {
    /// The store failed. Conflicts are retried, everything else is returned.
    Store(StoreError),

    /// The body chose to abort with a domain error. Never retried.
    Aborted(E),
}

impl<E> From<StoreError> for TxError<E> {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Run `body` inside a transaction and commit it.
///
/// The body is re-run from scratch, in a fresh transaction, whenever the
/// store reports a conflict. After [`DocumentStore::max_attempts`] conflicts
/// the call fails with [`StoreError::RetriesExhausted`].
///
/// # Errors
///
/// Returns `TxError::Aborted` if the body aborts, or `TxError::Store` for
/// non-conflict store failures and exhausted retries.
pub fn run_transaction<T, E, F>(
    store: &(impl DocumentStore + ?Sized),
    mut body: F,
) -> std::result::Result<T, TxError<E>>
where
    F: FnMut(&mut dyn StoreTransaction) -> std::result::Result<T, TxError<E>>,
{
    let max_attempts = store.max_attempts().max(1);

    for attempt in 1..=max_attempts {
        let mut txn = store.begin()?;

        let value = match body(&mut *txn) {
            Ok(value) => value,
            Err(TxError::Store(StoreError::Conflict)) => {
                tracing::debug!(attempt, "transaction read conflict, retrying");
                continue;
            }
            Err(err) => return Err(err),
        };

        match txn.commit() {
            Ok(()) => return Ok(value),
            Err(StoreError::Conflict) => {
                tracing::debug!(attempt, "transaction commit conflict, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::warn!(attempts = max_attempts, "transaction retries exhausted");
    Err(StoreError::RetriesExhausted {
        attempts: max_attempts,
    }
    .into())
}
