//! Credit ledger, transaction history and profile store for FLG.
//!
//! All three components are built over an injected
//! [`flg_store::DocumentStore`] handle:
//!
//! - [`Ledger`]: the only writer of balances. Every purchase or spend
//!   updates the balance and appends its transaction record in one store
//!   transaction.
//! - [`HistoryReader`]: newest-first listing of a user's records.
//! - [`ProfileStore`]: profiles, unique usernames and account opening.
//!
//! Store calls run on tokio's blocking pool. A dropped future does not
//! cancel a transaction that is already running.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use flg_core::{Identity, UserId};
//! use flg_ledger::Ledger;
//! use flg_store::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> flg_core::Result<()> {
//! let ledger = Ledger::new(Arc::new(MemoryStore::new()));
//! let me = Identity::User(UserId::generate());
//!
//! ledger.purchase(&me, 100, "Welcome pack").await?;
//! let receipt = ledger.spend(&me, 30, "Guided session").await?;
//! assert_eq!(receipt.balance, 70);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod history;
pub mod ledger;
pub mod profiles;

pub use config::{LedgerConfig, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use history::{sort_recent_first, History, HistoryReader};
pub use ledger::{Ledger, Receipt};
pub use profiles::{OpenedAccount, ProfileStore};
