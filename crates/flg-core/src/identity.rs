//! Caller identity as resolved by the external identity provider.

use crate::UserId;

/// The identity on whose behalf an operation runs.
///
/// Ledger and profile operations require [`Identity::User`]; an anonymous
/// caller is rejected before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// No authenticated session.
    #[default]
    Anonymous,

    /// An authenticated user.
    User(UserId),
}

impl Identity {
    /// Return the user id if the caller is authenticated.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(user_id) => Some(user_id),
        }
    }

    /// Check whether the caller is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl From<UserId> for Identity {
    fn from(user_id: UserId) -> Self {
        Self::User(user_id)
    }
}

impl From<Option<UserId>> for Identity {
    fn from(user_id: Option<UserId>) -> Self {
        user_id.map_or(Self::Anonymous, Self::User)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_user() {
        let identity = Identity::default();
        assert!(!identity.is_authenticated());
        assert!(identity.user_id().is_none());
    }

    #[test]
    fn user_identity_exposes_id() {
        let user_id = UserId::generate();
        let identity = Identity::from(user_id.clone());
        assert!(identity.is_authenticated());
        assert_eq!(identity.user_id(), Some(&user_id));
    }
}
