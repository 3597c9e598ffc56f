//! `RocksDB` storage implementation.
//!
//! `RocksStore` runs on an `OptimisticTransactionDB`: reads inside a
//! transaction use `get_for_update` so that a concurrent write to the same
//! key makes the commit fail with `Busy`, which is reported as
//! [`StoreError::Conflict`].

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode, MultiThreaded,
    OptimisticTransactionDB, Options, Transaction,
};

use flg_core::{CreditAccount, CreditTransaction, Profile, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{DocumentStore, StoreConfig, StoreTransaction};

type Db = OptimisticTransactionDB<MultiThreaded>;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<Db>,
    config: StoreConfig,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open or create a database with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, path, cf_descriptors).map_err(db_error)?;

        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn get_doc<T: serde::de::DeserializeOwned>(&self, name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(db_error)?
            .map(|data| deserialize(&data))
            .transpose()
    }
}

impl DocumentStore for RocksStore {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(RocksTransaction {
            store: self,
            txn: self.db.transaction(),
        }))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn get_balance(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        self.get_doc(cf::BALANCES, &keys::balance_key(user_id))
    }

    fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        self.get_doc(cf::PROFILES, &keys::profile_key(user_id))
    }

    fn list_transactions_by_owner(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);
        let upper = keys::user_transactions_upper_bound(user_id);

        // Walk the index backwards from the highest ULID so only `limit`
        // keys are read.
        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&upper, Direction::Reverse));

        let mut transactions = Vec::with_capacity(limit);
        for item in iter.take(limit) {
            let (key, _) = item.map_err(db_error)?;

            if !key.starts_with(&prefix) {
                break;
            }

            let id = keys::extract_transaction_id_from_user_key(&key)
                .ok_or_else(|| StoreError::Database("malformed transaction index key".into()))?;
            if let Some(tx) = self.get_doc(cf::TRANSACTIONS, &keys::transaction_key(&id))? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }
}

/// An optimistic `RocksDB` transaction.
struct RocksTransaction<'a> {
    store: &'a RocksStore,
    txn: Transaction<'a, Db>,
}

impl RocksTransaction<'_> {
    fn get_tracked<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.store.cf(name)?;
        self.txn
            .get_for_update_cf(&cf, key, true)
            .map_err(db_error)?
            .map(|data| deserialize(&data))
            .transpose()
    }

    fn put<T: serde::Serialize>(&self, name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.store.cf(name)?;
        let value = serialize(value)?;
        self.txn.put_cf(&cf, key, value).map_err(db_error)
    }
}

impl StoreTransaction for RocksTransaction<'_> {
    fn get_balance(&mut self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        self.get_tracked(cf::BALANCES, &keys::balance_key(user_id))
    }

    fn put_balance(&mut self, account: &CreditAccount) -> Result<()> {
        self.put(cf::BALANCES, &keys::balance_key(&account.user_id), account)
    }

    fn insert_transaction(&mut self, transaction: &CreditTransaction) -> Result<()> {
        self.put(
            cf::TRANSACTIONS,
            &keys::transaction_key(&transaction.id),
            transaction,
        )?;

        let cf_by_user = self.store.cf(cf::TRANSACTIONS_BY_USER)?;
        let index_key = keys::user_transaction_key(&transaction.user_id, &transaction.id);
        self.txn
            .put_cf(&cf_by_user, index_key, [])
            .map_err(db_error)
    }

    fn get_profile(&mut self, user_id: &UserId) -> Result<Option<Profile>> {
        self.get_tracked(cf::PROFILES, &keys::profile_key(user_id))
    }

    fn put_profile(&mut self, profile: &Profile) -> Result<()> {
        self.put(cf::PROFILES, &keys::profile_key(&profile.user_id), profile)
    }

    fn get_username_owner(&mut self, username: &str) -> Result<Option<UserId>> {
        self.get_tracked(cf::USERNAMES, &keys::username_key(username))
    }

    fn put_username(&mut self, username: &str, owner: &UserId) -> Result<()> {
        self.put(cf::USERNAMES, &keys::username_key(username), owner)
    }

    fn delete_username(&mut self, username: &str) -> Result<()> {
        let cf = self.store.cf(cf::USERNAMES)?;
        self.txn
            .delete_cf(&cf, keys::username_key(username))
            .map_err(db_error)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.txn.commit().map_err(db_error)
    }
}

/// Map a `RocksDB` error, reporting optimistic write conflicts as `Conflict`.
fn db_error(err: rocksdb::Error) -> StoreError {
    match err.kind() {
        ErrorKind::Busy | ErrorKind::TryAgain => StoreError::Conflict,
        _ => StoreError::Database(err.to_string()),
    }
}

/// Serialize a value using CBOR.
fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
}
