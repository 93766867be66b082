//! Shared types and models for the Stock Ledger platform
//!
//! This crate contains the domain models, date handling and the pure daily
//! reconciliation math shared between the backend and the browser (via WASM).

pub mod models;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use models::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
