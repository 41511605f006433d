//! Debit Card API Library
//!
//! Re-exports modules for integration testing and the binaries.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod policy;
pub mod state;
pub mod store;
pub mod validation;

pub use config::Config;
pub use domain::{Amount, AmountError, Currency};
pub use error::{AppError, AppResult};
pub use state::AppState;
