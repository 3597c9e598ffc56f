//! Ledger configuration.

/// Default number of history entries shown to a user.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Upper bound on a single history read.
///
/// History is sorted client-side after an unordered fetch, so the fetch size
/// must stay bounded.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Configuration for the ledger components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Page size used when the caller does not ask for one.
    pub history_limit: usize,

    /// Hard cap applied to every history read.
    pub max_history_limit: usize,
}

impl LedgerConfig {
    /// Clamp a requested history size to the configured cap.
    #[must_use]
    pub fn clamp_limit(&self, requested: usize) -> usize {
        requested.min(self.max_history_limit)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_history_limit: MAX_HISTORY_LIMIT,
        }
    }
}
