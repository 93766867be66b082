//! Append-only stock movement logs
//!
//! These rows are read-only inputs to the reconciliation engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Common view of a branch-owned movement row
pub trait StockMovement {
    fn item_id(&self) -> Uuid;
    fn branch_id(&self) -> Option<Uuid>;
    fn quantity(&self) -> Decimal;
}

/// Stock received from a supplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Restocking {
    pub id: Uuid,
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
}

/// A recorded sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: Uuid,
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
}

/// Stock written off as waste or spoilage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WasteSpoilage {
    pub id: Uuid,
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

/// Stock moved between two branches of the same organization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BranchTransfer {
    pub id: Uuid,
    pub item_id: Uuid,
    pub organization_id: Uuid,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub date: NaiveDate,
    pub quantity: Decimal,
}

macro_rules! impl_stock_movement {
    ($($ty:ty),+) => {
        $(
            impl StockMovement for $ty {
                fn item_id(&self) -> Uuid {
                    self.item_id
                }

                fn branch_id(&self) -> Option<Uuid> {
                    self.branch_id
                }

                fn quantity(&self) -> Decimal {
                    self.quantity
                }
            }
        )+
    };
}

impl_stock_movement!(Restocking, Sale, WasteSpoilage);
