//! Collection names and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Balance documents, keyed by `user_id`.
    pub const BALANCES: &str = "balances";

    /// Transaction records, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by owner, keyed by `len(user_id) || user_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Profile documents, keyed by `user_id`.
    pub const PROFILES: &str = "profiles";

    /// Username index, keyed by username, value is the owning `user_id`.
    pub const USERNAMES: &str = "usernames";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BALANCES,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::PROFILES,
        cf::USERNAMES,
    ]
}
