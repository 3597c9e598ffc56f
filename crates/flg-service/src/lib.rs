//! FLG HTTP API Service.
//!
//! This crate exposes the credit ledger and profile store over HTTP:
//!
//! - Account opening and profiles
//! - Credit balance and transaction history
//! - Package catalogue, purchases and spends
//!
//! # Authentication
//!
//! End-user requests carry an HS256 JWT issued by the identity provider.
//! The `sub` claim is the user id and the audience must match
//! `AUTH_AUDIENCE`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Axum handlers all return Result
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ServiceConfig, StoreBackend};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{open_store, AppState};
