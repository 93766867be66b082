//! Opening and closing stock ledger rows

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Natural key shared by opening and closing stock rows.
/// At most one row of each kind exists per key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StockKey {
    pub item_id: Uuid,
    pub date: NaiveDate,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
}

/// Quantity on hand at the start of a date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OpeningStock {
    pub id: Uuid,
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    /// Entered by an operator rather than carried from the previous day
    pub is_manual: bool,
    pub notes: Option<String>,
}

impl OpeningStock {
    pub fn key(&self) -> StockKey {
        StockKey {
            item_id: self.item_id,
            date: self.date,
            organization_id: self.organization_id,
            branch_id: self.branch_id,
        }
    }
}

/// Quantity on hand at the end of a date. Always formula-derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ClosingStock {
    pub id: Uuid,
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

impl ClosingStock {
    pub fn key(&self) -> StockKey {
        StockKey {
            item_id: self.item_id,
            date: self.date,
            organization_id: self.organization_id,
            branch_id: self.branch_id,
        }
    }
}

/// Values written by an opening stock upsert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningStockUpsert {
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub is_manual: bool,
    pub notes: Option<String>,
}

impl OpeningStockUpsert {
    pub fn key(&self) -> StockKey {
        StockKey {
            item_id: self.item_id,
            date: self.date,
            organization_id: self.organization_id,
            branch_id: self.branch_id,
        }
    }
}

/// Values written by a closing stock upsert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosingStockUpsert {
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub notes: Option<String>,
}

impl ClosingStockUpsert {
    pub fn key(&self) -> StockKey {
        StockKey {
            item_id: self.item_id,
            date: self.date,
            organization_id: self.organization_id,
            branch_id: self.branch_id,
        }
    }
}
