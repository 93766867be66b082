//! HTTP request handlers

pub mod health;
pub mod item;
pub mod report;
pub mod stock;

pub use health::*;
pub use item::*;
pub use report::*;
pub use stock::*;
