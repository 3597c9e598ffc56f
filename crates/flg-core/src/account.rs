//! Account balance document.
//!
//! A `CreditAccount` holds the authoritative credit balance of one user.
//! The balance is only ever changed inside a store transaction, through
//! [`CreditAccount::credit`] and [`CreditAccount::debit`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, UserId};

/// Balance given to a freshly created account.
pub const INITIAL_BALANCE: i64 = 0;

/// The credit balance of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    /// The owning user.
    pub user_id: UserId,

    /// Current balance in credits. Never negative once committed.
    pub balance: i64,

    /// When the balance document was created.
    pub created_at: DateTime<Utc>,

    /// When the balance was last changed.
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self::new_at(user_id, Utc::now())
    }

    /// Create a new account with zero balance and the given creation time.
    #[must_use]
    pub fn new_at(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: INITIAL_BALANCE,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account has sufficient credits for a deduction.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Add `amount` credits and return the new balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount` if `amount` is not positive or
    /// the new balance would overflow.
    pub fn credit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<i64, LedgerError> {
        crate::validate_amount(amount)?;
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount { amount })?;
        self.balance = balance;
        self.updated_at = now;
        Ok(balance)
    }

    /// Remove `amount` credits and return the new balance.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `amount` is not positive.
    /// - `LedgerError::InsufficientCredits` if the balance is lower than
    ///   `amount`; the account is left untouched.
    pub fn debit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<i64, LedgerError> {
        crate::validate_amount(amount)?;
        if !self.has_sufficient_credits(amount) {
            return Err(LedgerError::InsufficientCredits {
                balance: self.balance,
                required: amount,
            });
        }
        self.balance -= amount;
        self.updated_at = now;
        Ok(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_has_zero_balance() {
        let account = CreditAccount::new(UserId::generate());
        assert_eq!(account.balance, 0);
        assert_eq!(account.created_at, account.updated_at);
    }

    #[test]
    fn account_sufficient_credits() {
        let mut account = CreditAccount::new(UserId::generate());
        account.balance = 1000;

        assert!(account.has_sufficient_credits(500));
        assert!(account.has_sufficient_credits(1000));
        assert!(!account.has_sufficient_credits(1001));
    }

    #[test]
    fn credit_then_debit() {
        let mut account = CreditAccount::new(UserId::generate());
        let later = account.created_at + chrono::Duration::seconds(5);

        assert_eq!(account.credit(100, later).unwrap(), 100);
        assert_eq!(account.debit(30, later).unwrap(), 70);
        assert_eq!(account.updated_at, later);
    }

    #[test]
    fn debit_beyond_balance_leaves_account_untouched() {
        let mut account = CreditAccount::new(UserId::generate());
        account.balance = 50;
        let before = account.clone();

        let err = account.debit(60, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientCredits {
                balance: 50,
                required: 60
            }
        ));
        assert_eq!(account, before);
    }

    #[test]
    fn credit_rejects_overflow() {
        let mut account = CreditAccount::new(UserId::generate());
        account.balance = i64::MAX - 1;

        let err = account.credit(2, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { amount: 2 }));
        assert_eq!(account.balance, i64::MAX - 1);
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let mut account = CreditAccount::new(UserId::generate());
        assert!(account.credit(0, Utc::now()).is_err());
        assert!(account.debit(-5, Utc::now()).is_err());
    }
}
