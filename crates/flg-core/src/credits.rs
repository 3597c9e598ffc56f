//! Credit transaction records.
//!
//! Every successful balance change appends exactly one record. Records are
//! immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// A credit transaction representing a balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Signed delta in credits. Positive = purchase, negative = spend.
    pub amount: i64,

    /// Type of transaction.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    /// Human-readable description.
    pub description: String,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Create a new purchase transaction.
    #[must_use]
    pub fn purchase(
        user_id: UserId,
        amount: i64,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            TransactionType::Purchase,
            amount,
            description,
            created_at,
        )
    }

    /// Create a new spend transaction (deduction).
    #[must_use]
    pub fn spend(
        user_id: UserId,
        amount: i64,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            TransactionType::Spend,
            amount,
            description,
            created_at,
        )
    }

    /// Create a transaction of the given type for an unsigned `amount`.
    ///
    /// The sign of the stored delta is derived from `transaction_type`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        transaction_type: TransactionType,
        amount: i64,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount: transaction_type.signed(amount),
            transaction_type,
            description,
            created_at,
        }
    }
}

/// Type of credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// User purchased credits.
    Purchase,

    /// Credits spent.
    Spend,
}

impl TransactionType {
    /// Check if this transaction type adds credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Purchase)
    }

    /// Check if this transaction type removes credits.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Spend)
    }

    /// Apply this type's sign to an unsigned amount.
    #[must_use]
    pub const fn signed(&self, amount: i64) -> i64 {
        match self {
            Self::Purchase => amount.abs(),
            Self::Spend => -amount.abs(),
        }
    }

    /// The wire name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Spend => "spend",
        }
    }
}
