//! Core types for the FLG credit ledger.
//!
//! This crate provides the domain types shared by the store, the ledger and
//! the HTTP service:
//!
//! - **Identifiers**: `UserId`, `TransactionId`
//! - **Identity**: `Identity`
//! - **Balances**: `CreditAccount`
//! - **Transactions**: `CreditTransaction`, `TransactionType`
//! - **Profiles**: `Profile`, `NewProfile`, `ProfileUpdate`
//! - **Packages**: `CreditPackage`
//!
//! # Credits
//!
//! Credits are whole units stored as `i64`. A committed balance is never
//! negative; every change is paired with one append-only
//! `CreditTransaction` whose `amount` is the signed delta.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod credits;
pub mod error;
pub mod identity;
pub mod ids;
pub mod packages;
pub mod profile;

pub use account::{CreditAccount, INITIAL_BALANCE};
pub use credits::{CreditTransaction, TransactionType};
pub use error::{validate_amount, LedgerError, ProfileError, Result};
pub use identity::Identity;
pub use ids::{IdError, TransactionId, UserId, MAX_USER_ID_LEN};
pub use packages::CreditPackage;
pub use profile::{NewProfile, Profile, ProfileUpdate, MAX_USERNAME_LEN};
