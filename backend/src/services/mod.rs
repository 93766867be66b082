//! Business logic services for the Stock Ledger platform

pub mod cascade;
pub mod clock;
pub mod identity;
pub mod item;
pub mod locks;
pub mod report;
pub mod stock;
pub mod store;

pub use cascade::{CascadeReport, CascadeService};
pub use clock::{Clock, FixedClock, LocalClock};
pub use identity::{IdentityProvider, PgIdentityProvider};
pub use item::ItemService;
pub use locks::OrganizationLocks;
pub use report::{DailyReport, ReportService};
pub use stock::StockService;
pub use store::{PgStockStore, StockStore};
