//! Domain models for the Stock Ledger platform

mod item;
mod stock;
mod transaction;
mod user;

pub use item::*;
pub use stock::*;
pub use transaction::*;
pub use user::*;
