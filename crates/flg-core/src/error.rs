//! Error types for ledger and profile operations.

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in credit ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The amount is not a positive credit count, or would overflow.
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: i64,
    },

    /// Insufficient credits for the operation.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Balance observed when the check failed.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// No authenticated identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The store was unreachable or the transaction gave up.
    ///
    /// The mutation may or may not have been applied; callers should
    /// re-read the balance before retrying.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Transaction history could not be read.
    #[error("history unavailable: {0}")]
    HistoryUnavailable(String),
}

impl LedgerError {
    /// Whether the outcome of the failed call is unknown.
    #[must_use]
    pub const fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_))
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LedgerUnavailable(_) | Self::HistoryUnavailable(_)
        )
    }
}

/// Errors that can occur in profile operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// No authenticated identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A profile already exists for this user.
    #[error("profile already exists: {user_id}")]
    ProfileExists {
        /// The user that already has a profile.
        user_id: String,
    },

    /// No profile for this user.
    #[error("profile not found: {user_id}")]
    ProfileNotFound {
        /// The user without a profile.
        user_id: String,
    },

    /// The username belongs to another user.
    #[error("username already taken: {username}")]
    UsernameTaken {
        /// The requested username.
        username: String,
    },

    /// Invalid profile input.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// The store was unreachable or the transaction gave up.
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

/// Reject non-positive credit amounts.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` if `amount <= 0`.
pub fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive() {
        assert!(validate_amount(1).is_ok());
        assert_eq!(
            validate_amount(0),
            Err(LedgerError::InvalidAmount { amount: 0 })
        );
        assert_eq!(
            validate_amount(-10),
            Err(LedgerError::InvalidAmount { amount: -10 })
        );
    }

    #[test]
    fn only_unavailable_is_ambiguous() {
        assert!(LedgerError::LedgerUnavailable("timeout".into()).is_outcome_unknown());
        assert!(!LedgerError::NotAuthenticated.is_outcome_unknown());
        assert!(!LedgerError::InsufficientCredits {
            balance: 1,
            required: 2
        }
        .is_retryable());
    }
}
