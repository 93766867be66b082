//! Tracked item models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An item tracked in the daily stock ledger.
///
/// The prices here are only defaults; authoritative per-day prices live on
/// opening stock and restocking rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Items without a branch are shared by every branch of the organization
    pub branch_id: Option<Uuid>,
    pub name: String,
    /// Unit of measure (kg, litre, piece, ...)
    pub unit: String,
    pub low_stock_threshold: Decimal,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
}

impl Item {
    /// Whether the item is tracked in a branch-restricted view
    pub fn visible_in_branch(&self, branch_id: Option<Uuid>) -> bool {
        match (self.branch_id, branch_id) {
            (None, _) | (_, None) => true,
            (Some(own), Some(requested)) => own == requested,
        }
    }

    pub fn is_low_stock(&self, quantity: Decimal) -> bool {
        self.low_stock_threshold > Decimal::ZERO && quantity <= self.low_stock_threshold
    }
}
