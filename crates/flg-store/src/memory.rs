//! In-memory storage implementation.
//!
//! `MemoryStore` keeps every collection behind one mutex and implements
//! optimistic transactions with per-document version counters: a
//! transaction remembers the version of each document it reads and commit
//! fails with [`StoreError::Conflict`] if any of them moved.
//!
//! The store also counts accesses and supports fault injection, which the
//! ledger tests use to observe "no store access" and "store unreachable".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use flg_core::{CreditAccount, CreditTransaction, Profile, UserId};

use crate::error::{Result, StoreError};
use crate::{DocumentStore, StoreConfig, StoreTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DocKey {
    Balance(UserId),
    Profile(UserId),
    Username(String),
}

#[derive(Debug, Default)]
struct State {
    balances: HashMap<UserId, CreditAccount>,
    profiles: HashMap<UserId, Profile>,
    usernames: HashMap<String, UserId>,
    // Commit order, not sorted by timestamp.
    transactions: Vec<CreditTransaction>,
    versions: HashMap<DocKey, u64>,
}

impl State {
    fn version(&self, key: &DocKey) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: DocKey) {
        *self.versions.entry(key).or_insert(0) += 1;
    }
}

/// In-memory document store with optimistic transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    config: StoreConfig,
    accesses: AtomicUsize,
    forced_conflicts: AtomicU32,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Number of store accesses so far (reads, transaction starts,
    /// transactional reads and commits).
    #[must_use]
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    /// Make the next `count` commits fail with [`StoreError::Conflict`].
    pub fn fail_next_commits(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Simulate the store becoming unreachable (or reachable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn touch(&self) -> Result<()> {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DocumentStore for MemoryStore {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        self.touch()?;
        Ok(Box::new(MemoryTransaction {
            store: self,
            reads: HashMap::new(),
            balances: HashMap::new(),
            profiles: HashMap::new(),
            usernames: HashMap::new(),
            transactions: Vec::new(),
        }))
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn get_balance(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        self.touch()?;
        Ok(self.lock()?.balances.get(user_id).cloned())
    }

    fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        self.touch()?;
        Ok(self.lock()?.profiles.get(user_id).cloned())
    }

    fn list_transactions_by_owner(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>> {
        self.touch()?;
        let state = self.lock()?;

        // The most recently committed `limit` records, left in commit order.
        let mut owned: Vec<_> = state
            .transactions
            .iter()
            .rev()
            .filter(|tx| &tx.user_id == user_id)
            .take(limit)
            .cloned()
            .collect();
        owned.reverse();

        Ok(owned)
    }
}

/// A transaction against a [`MemoryStore`].
///
/// Writes are staged locally and become visible only on commit. Reads see
/// the transaction's own staged writes first.
struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    reads: HashMap<DocKey, u64>,
    balances: HashMap<UserId, CreditAccount>,
    profiles: HashMap<UserId, Profile>,
    usernames: HashMap<String, Option<UserId>>,
    transactions: Vec<CreditTransaction>,
}

impl MemoryTransaction<'_> {
    fn read<T>(&mut self, key: DocKey, get: impl FnOnce(&State) -> Option<T>) -> Result<Option<T>> {
        self.store.touch()?;
        let state = self.store.lock()?;
        let version = state.version(&key);
        let value = get(&state);
        drop(state);

        self.reads.entry(key).or_insert(version);
        Ok(value)
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn get_balance(&mut self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        if let Some(staged) = self.balances.get(user_id) {
            return Ok(Some(staged.clone()));
        }
        self.read(DocKey::Balance(user_id.clone()), |state| {
            state.balances.get(user_id).cloned()
        })
    }

    fn put_balance(&mut self, account: &CreditAccount) -> Result<()> {
        self.balances
            .insert(account.user_id.clone(), account.clone());
        Ok(())
    }

    fn insert_transaction(&mut self, transaction: &CreditTransaction) -> Result<()> {
        self.transactions.push(transaction.clone());
        Ok(())
    }

    fn get_profile(&mut self, user_id: &UserId) -> Result<Option<Profile>> {
        if let Some(staged) = self.profiles.get(user_id) {
            return Ok(Some(staged.clone()));
        }
        self.read(DocKey::Profile(user_id.clone()), |state| {
            state.profiles.get(user_id).cloned()
        })
    }

    fn put_profile(&mut self, profile: &Profile) -> Result<()> {
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    fn get_username_owner(&mut self, username: &str) -> Result<Option<UserId>> {
        if let Some(staged) = self.usernames.get(username) {
            return Ok(staged.clone());
        }
        self.read(DocKey::Username(username.to_string()), |state| {
            state.usernames.get(username).cloned()
        })
    }

    fn put_username(&mut self, username: &str, owner: &UserId) -> Result<()> {
        self.usernames
            .insert(username.to_string(), Some(owner.clone()));
        Ok(())
    }

    fn delete_username(&mut self, username: &str) -> Result<()> {
        self.usernames.insert(username.to_string(), None);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.store.touch()?;

        if this.store.take_forced_conflict() {
            return Err(StoreError::Conflict);
        }

        let mut state = this.store.lock()?;

        if this
            .reads
            .iter()
            .any(|(key, version)| state.version(key) != *version)
        {
            return Err(StoreError::Conflict);
        }

        for (user_id, account) in this.balances {
            state.bump(DocKey::Balance(user_id.clone()));
            state.balances.insert(user_id, account);
        }
        for (user_id, profile) in this.profiles {
            state.bump(DocKey::Profile(user_id.clone()));
            state.profiles.insert(user_id, profile);
        }
        for (username, owner) in this.usernames {
            state.bump(DocKey::Username(username.clone()));
            match owner {
                Some(owner) => state.usernames.insert(username, owner),
                None => state.usernames.remove(&username),
            };
        }
        state.transactions.extend(this.transactions);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{run_transaction, TxError};
    use chrono::Utc;

    fn funded(store: &MemoryStore, balance: i64) -> UserId {
        let user_id = UserId::generate();
        let mut account = CreditAccount::new(user_id.clone());
        account.balance = balance;
        let mut txn = store.begin().unwrap();
        txn.put_balance(&account).unwrap();
        txn.commit().unwrap();
        user_id
    }

    #[test]
    fn writes_invisible_until_commit() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        let mut txn = store.begin().unwrap();
        txn.put_balance(&CreditAccount::new(user_id.clone()))
            .unwrap();
        assert!(txn.get_balance(&user_id).unwrap().is_some());
        assert!(store.get_balance(&user_id).unwrap().is_none());

        txn.commit().unwrap();
        assert!(store.get_balance(&user_id).unwrap().is_some());
    }

    #[test]
    fn dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        {
            let mut txn = store.begin().unwrap();
            txn.put_balance(&CreditAccount::new(user_id.clone()))
                .unwrap();
            txn.insert_transaction(&CreditTransaction::purchase(
                user_id.clone(),
                10,
                "pack".into(),
                Utc::now(),
            ))
            .unwrap();
        }

        assert!(store.get_balance(&user_id).unwrap().is_none());
        assert!(store
            .list_transactions_by_owner(&user_id, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn concurrent_read_modify_write_conflicts() {
        let store = MemoryStore::new();
        let user_id = funded(&store, 100);

        let mut first = store.begin().unwrap();
        let mut second = store.begin().unwrap();

        let mut a = first.get_balance(&user_id).unwrap().unwrap();
        let mut b = second.get_balance(&user_id).unwrap().unwrap();
        a.balance -= 60;
        b.balance -= 60;
        first.put_balance(&a).unwrap();
        second.put_balance(&b).unwrap();

        first.commit().unwrap();
        assert_eq!(second.commit(), Err(StoreError::Conflict));
        assert_eq!(store.get_balance(&user_id).unwrap().unwrap().balance, 40);
    }

    #[test]
    fn absent_document_read_is_tracked() {
        let store = MemoryStore::new();
        let user_id = UserId::generate();

        let mut txn = store.begin().unwrap();
        assert!(txn.get_balance(&user_id).unwrap().is_none());

        // Another writer creates the document first.
        let mut other = store.begin().unwrap();
        other
            .put_balance(&CreditAccount::new(user_id.clone()))
            .unwrap();
        other.commit().unwrap();

        txn.put_balance(&CreditAccount::new(user_id.clone()))
            .unwrap();
        assert_eq!(txn.commit(), Err(StoreError::Conflict));
    }

    #[test]
    fn racing_writer_forces_rerun_of_body() {
        let store = MemoryStore::new();
        let user_id = funded(&store, 100);
        let mut attempts = 0;

        let result = run_transaction(&store, |txn| {
            attempts += 1;
            let mut account = txn.get_balance(&user_id)?.unwrap();

            if attempts == 1 {
                // A competing spend commits between our read and our commit.
                let mut racer = store.begin()?;
                let mut theirs = racer.get_balance(&user_id)?.unwrap();
                theirs.balance -= 60;
                racer.put_balance(&theirs)?;
                racer.commit()?;
            }

            if account.balance < 60 {
                return Err(TxError::Aborted(account.balance));
            }
            account.balance -= 60;
            txn.put_balance(&account)?;
            Ok(account.balance)
        });

        assert_eq!(attempts, 2);
        assert_eq!(result, Err(TxError::Aborted(40)));
        assert_eq!(store.get_balance(&user_id).unwrap().unwrap().balance, 40);
    }

    #[test]
    fn username_index_claim_and_release() {
        let store = MemoryStore::new();
        let owner = UserId::generate();

        let mut txn = store.begin().unwrap();
        txn.put_username("romain", &owner).unwrap();
        txn.commit().unwrap();

        let mut txn = store.begin().unwrap();
        assert_eq!(txn.get_username_owner("romain").unwrap(), Some(owner));
        txn.delete_username("romain").unwrap();
        assert_eq!(txn.get_username_owner("romain").unwrap(), None);
        txn.commit().unwrap();

        let mut txn = store.begin().unwrap();
        assert_eq!(txn.get_username_owner("romain").unwrap(), None);
    }

    #[test]
    fn listing_filters_by_owner_and_limit() {
        let store = MemoryStore::new();
        let alice = UserId::generate();
        let bob = UserId::generate();

        let mut txn = store.begin().unwrap();
        for i in 0..5 {
            txn.insert_transaction(&CreditTransaction::purchase(
                alice.clone(),
                i + 1,
                format!("alice {i}"),
                Utc::now(),
            ))
            .unwrap();
        }
        txn.insert_transaction(&CreditTransaction::purchase(
            bob.clone(),
            1,
            "bob".into(),
            Utc::now(),
        ))
        .unwrap();
        txn.commit().unwrap();

        let listed = store.list_transactions_by_owner(&alice, 3).unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|tx| tx.user_id == alice));
        assert_eq!(store.list_transactions_by_owner(&bob, 10).unwrap().len(), 1);
    }

    #[test]
    fn access_counter_and_fault_injection() {
        let store = MemoryStore::new();
        assert_eq!(store.accesses(), 0);

        store.get_balance(&UserId::generate()).unwrap();
        assert_eq!(store.accesses(), 1);

        store.set_unavailable(true);
        assert!(matches!(
            store.get_balance(&UserId::generate()),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.begin().is_err());

        store.set_unavailable(false);
        assert!(store.begin().is_ok());
    }
}
