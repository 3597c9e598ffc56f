//! Key encoding utilities.
//!
//! User ids are variable-length, so index keys carry a one-byte length
//! prefix to keep one user's prefix from matching another user's keys.

use flg_core::{TransactionId, UserId, MAX_USER_ID_LEN};

// A user id must fit in the one-byte length prefix.
const _: () = assert!(MAX_USER_ID_LEN <= u8::MAX as usize);

/// Create a balance key from a user ID.
#[must_use]
pub fn balance_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a profile key from a user ID.
#[must_use]
pub fn profile_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a username index key.
#[must_use]
pub fn username_key(username: &str) -> Vec<u8> {
    username.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a prefix for iterating all transactions of a user.
///
/// Format: `len (1 byte) || user_id`
#[must_use]
pub fn user_transactions_prefix(user_id: &UserId) -> Vec<u8> {
    let bytes = user_id.as_bytes();
    let mut key = Vec::with_capacity(1 + bytes.len() + 16);
    #[allow(clippy::cast_possible_truncation)]
    key.push(bytes.len() as u8);
    key.extend_from_slice(bytes);
    key
}

/// Create a user-transaction index key.
///
/// Format: `len (1 byte) || user_id || transaction_id (16 bytes)`
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = user_transactions_prefix(user_id);
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create the highest possible index key for a user.
///
/// Seeking here in reverse lands on the user's newest transaction.
#[must_use]
pub fn user_transactions_upper_bound(user_id: &UserId) -> Vec<u8> {
    let mut key = user_transactions_prefix(user_id);
    key.extend_from_slice(&[0xFF; 16]);
    key
}

/// Extract the transaction ID from a user-transaction index key.
///
/// Returns `None` if the key is shorter than its encoded length says.
#[must_use]
pub fn extract_transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let user_len = usize::from(*key.first()?);
    let start = 1 + user_len;
    let bytes: [u8; 16] = key.get(start..start + 16)?.try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}
