//! Daily stock reconciliation math
//!
//! Pure functions over already-fetched ledger rows. The backend fetches the
//! rows for a scope and date and hands them to [`DailyLedger::build_report`];
//! the cascade reuses [`DayActivity::totals_for`] and [`closing_stock`] to
//! roll one day forward.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    BranchTransfer, ClosingStock, Item, OpeningStock, Restocking, Sale, StockMovement,
    WasteSpoilage,
};

/// Where a day's opening stock value came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpeningStockSource {
    /// Previous day's closing stock
    PreviousClosingStock,
    /// Opening stock row recorded for the day itself
    ManualEntry,
    Zero,
}

impl OpeningStockSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpeningStockSource::PreviousClosingStock => "previous_closing_stock",
            OpeningStockSource::ManualEntry => "manual_entry",
            OpeningStockSource::Zero => "zero",
        }
    }
}

/// Resolved opening stock for one item and day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningResolution {
    pub quantity: Decimal,
    pub source: OpeningStockSource,
}

/// Pick the opening stock for a day.
///
/// Yesterday's close always wins, then the day's own opening row, then zero.
/// The item's static quantity is never consulted.
pub fn resolve_opening_stock(
    previous_closing: Option<Decimal>,
    recorded_opening: Option<Decimal>,
) -> OpeningResolution {
    match (previous_closing, recorded_opening) {
        (Some(quantity), _) => OpeningResolution {
            quantity,
            source: OpeningStockSource::PreviousClosingStock,
        },
        (None, Some(quantity)) => OpeningResolution {
            quantity,
            source: OpeningStockSource::ManualEntry,
        },
        (None, None) => OpeningResolution {
            quantity: Decimal::ZERO,
            source: OpeningStockSource::Zero,
        },
    }
}

/// Per-item transaction totals for one day
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionTotals {
    pub restocking: Decimal,
    pub transfers_in: Decimal,
    pub transfers_out: Decimal,
    pub sales: Decimal,
    pub waste: Decimal,
}

impl TransactionTotals {
    /// Whether any stock moved
    pub fn has_activity(&self) -> bool {
        [
            self.restocking,
            self.transfers_in,
            self.transfers_out,
            self.sales,
            self.waste,
        ]
        .iter()
        .any(|q| !q.is_zero())
    }
}

/// `max(0, opening + restocking + transfers_in - sales - waste - transfers_out)`
///
/// Negative inventory is not modelled; overselling floors at zero here and is
/// rejected earlier, when the sale is entered.
pub fn closing_stock(opening: Decimal, totals: &TransactionTotals) -> Decimal {
    let closing = opening + totals.restocking + totals.transfers_in
        - totals.sales
        - totals.waste
        - totals.transfers_out;
    closing.max(Decimal::ZERO)
}

fn sum_for<T: StockMovement>(rows: &[T], item_id: Uuid, branch_id: Option<Uuid>) -> Decimal {
    rows.iter()
        .filter(|row| row.item_id() == item_id)
        .filter(|row| branch_id.map_or(true, |b| row.branch_id() == Some(b)))
        .map(|row| row.quantity())
        .sum()
}

/// Transaction rows for one day, already restricted to an organization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayActivity {
    pub sales: Vec<Sale>,
    pub restockings: Vec<Restocking>,
    pub waste: Vec<WasteSpoilage>,
    pub transfers: Vec<BranchTransfer>,
}

impl DayActivity {
    /// Totals for an item in one branch, or across every branch when
    /// `branch_id` is `None`.
    ///
    /// Organization-wide, every transfer is both an outgoing and an incoming
    /// movement inside the organization, so transfers net to zero.
    pub fn totals_for(&self, item_id: Uuid, branch_id: Option<Uuid>) -> TransactionTotals {
        let item_transfers = self.transfers.iter().filter(|t| t.item_id == item_id);
        let (transfers_in, transfers_out) = match branch_id {
            Some(branch) => item_transfers.fold((Decimal::ZERO, Decimal::ZERO), |(i, o), t| {
                (
                    if t.to_branch_id == branch { i + t.quantity } else { i },
                    if t.from_branch_id == branch { o + t.quantity } else { o },
                )
            }),
            None => {
                let total: Decimal = item_transfers.map(|t| t.quantity).sum();
                (total, total)
            }
        };

        TransactionTotals {
            restocking: sum_for(&self.restockings, item_id, branch_id),
            transfers_in,
            transfers_out,
            sales: sum_for(&self.sales, item_id, branch_id),
            waste: sum_for(&self.waste, item_id, branch_id),
        }
    }

    /// Totals for the rows stored under exactly `branch_id`.
    ///
    /// Unlike [`DayActivity::totals_for`], `None` selects only rows that have
    /// no branch. Transfers always name two branches, so they never land in
    /// the unbranched bucket.
    pub fn bucket_totals(&self, item_id: Uuid, branch_id: Option<Uuid>) -> TransactionTotals {
        match branch_id {
            Some(_) => self.totals_for(item_id, branch_id),
            None => TransactionTotals {
                restocking: unbranched_sum(&self.restockings, item_id),
                sales: unbranched_sum(&self.sales, item_id),
                waste: unbranched_sum(&self.waste, item_id),
                ..Default::default()
            },
        }
    }

    /// Whether any transaction row has no branch
    pub fn has_unbranched_rows(&self) -> bool {
        self.sales.iter().any(|r| r.branch_id.is_none())
            || self.restockings.iter().any(|r| r.branch_id.is_none())
            || self.waste.iter().any(|r| r.branch_id.is_none())
    }
}

fn unbranched_sum<T: StockMovement>(rows: &[T], item_id: Uuid) -> Decimal {
    rows.iter()
        .filter(|row| row.item_id() == item_id && row.branch_id().is_none())
        .map(|row| row.quantity())
        .sum()
}

/// One row of the daily report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReportRow {
    pub item_id: Uuid,
    pub name: String,
    pub unit: String,
    pub opening_stock: Decimal,
    pub opening_stock_source: OpeningStockSource,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub total_restocking: Decimal,
    pub total_transfers_in: Decimal,
    pub total_transfers_out: Decimal,
    pub total_sales: Decimal,
    pub total_waste: Decimal,
    pub closing_stock: Decimal,
    /// An opening stock row exists for the day
    pub has_opening_record: bool,
    /// A closing stock row exists for the day
    pub has_closing_record: bool,
    pub is_low_stock: bool,
}

impl DailyReportRow {
    pub fn totals(&self) -> TransactionTotals {
        TransactionTotals {
            restocking: self.total_restocking,
            transfers_in: self.total_transfers_in,
            transfers_out: self.total_transfers_out,
            sales: self.total_sales,
            waste: self.total_waste,
        }
    }
}

/// Every row needed to reconcile one day for one scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLedger {
    pub date: NaiveDate,
    pub branch_id: Option<Uuid>,
    pub items: Vec<Item>,
    pub opening_stock: Vec<OpeningStock>,
    pub closing_stock: Vec<ClosingStock>,
    pub previous_closing_stock: Vec<ClosingStock>,
    /// Opening rows of the previous day, the price source when yesterday's
    /// close carries into a day with no opening row
    #[serde(default)]
    pub previous_opening_stock: Vec<OpeningStock>,
    pub activity: DayActivity,
}

impl DailyLedger {
    fn in_branch(&self, branch_id: Option<Uuid>) -> bool {
        self.branch_id.map_or(true, |b| branch_id == Some(b))
    }

    /// Only the rows stored without a branch.
    ///
    /// Reporting this view with `branch_id: None` reconciles the unbranched
    /// bucket of an organization that also has branch rows.
    pub fn unbranched(&self) -> DailyLedger {
        DailyLedger {
            date: self.date,
            branch_id: None,
            items: self.items.clone(),
            opening_stock: unbranched_rows(&self.opening_stock, |o| o.branch_id),
            closing_stock: unbranched_rows(&self.closing_stock, |c| c.branch_id),
            previous_closing_stock: unbranched_rows(&self.previous_closing_stock, |c| c.branch_id),
            previous_opening_stock: unbranched_rows(&self.previous_opening_stock, |o| o.branch_id),
            activity: DayActivity {
                sales: unbranched_rows(&self.activity.sales, |r| r.branch_id),
                restockings: unbranched_rows(&self.activity.restockings, |r| r.branch_id),
                waste: unbranched_rows(&self.activity.waste, |r| r.branch_id),
                transfers: Vec::new(),
            },
        }
    }

    /// Whether any stock or transaction row has no branch
    pub fn has_unbranched_rows(&self) -> bool {
        self.opening_stock.iter().any(|o| o.branch_id.is_none())
            || self.closing_stock.iter().any(|c| c.branch_id.is_none())
            || self.previous_closing_stock.iter().any(|c| c.branch_id.is_none())
            || self.activity.has_unbranched_rows()
    }

    /// Sum of matching rows, `None` when there are no rows at all
    fn recorded_quantity(
        &self,
        rows: impl Iterator<Item = (Uuid, Option<Uuid>, Decimal)>,
        item_id: Uuid,
    ) -> Option<Decimal> {
        rows.filter(|(item, branch, _)| *item == item_id && self.in_branch(*branch))
            .map(|(_, _, quantity)| quantity)
            .fold(None, |acc, q| Some(acc.unwrap_or(Decimal::ZERO) + q))
    }

    /// Compute the report row for every tracked item.
    ///
    /// Closing stock is always recomputed; stored closing rows only feed the
    /// `has_closing_record` flag.
    pub fn build_report(&self) -> Vec<DailyReportRow> {
        self.items
            .iter()
            .filter(|item| item.visible_in_branch(self.branch_id))
            .map(|item| self.report_row(item))
            .collect()
    }

    fn report_row(&self, item: &Item) -> DailyReportRow {
        let previous_closing = self.recorded_quantity(
            self.previous_closing_stock
                .iter()
                .map(|c| (c.item_id, c.branch_id, c.quantity)),
            item.id,
        );
        let recorded_opening = self.recorded_quantity(
            self.opening_stock
                .iter()
                .map(|o| (o.item_id, o.branch_id, o.quantity)),
            item.id,
        );
        let has_closing_record = self
            .closing_stock
            .iter()
            .any(|c| c.item_id == item.id && self.in_branch(c.branch_id));

        let opening = resolve_opening_stock(previous_closing, recorded_opening);
        let totals = self.activity.totals_for(item.id, self.branch_id);
        let closing = closing_stock(opening.quantity, &totals);

        // Prices recorded on the day win. A carried-over close keeps the
        // previous day's recorded prices; item defaults come last.
        let price_rows: Vec<&OpeningStock> = match opening.source {
            OpeningStockSource::PreviousClosingStock => [
                self.opening_row(&self.opening_stock, item.id),
                self.opening_row(&self.previous_opening_stock, item.id),
            ]
            .into_iter()
            .flatten()
            .collect(),
            _ => self
                .opening_row(&self.opening_stock, item.id)
                .into_iter()
                .collect(),
        };
        let cost_price = price_rows
            .iter()
            .find_map(|o| o.cost_price)
            .or(Some(item.cost_price));
        let selling_price = price_rows
            .iter()
            .find_map(|o| o.selling_price)
            .or(Some(item.selling_price));

        DailyReportRow {
            item_id: item.id,
            name: item.name.clone(),
            unit: item.unit.clone(),
            opening_stock: opening.quantity,
            opening_stock_source: opening.source,
            cost_price,
            selling_price,
            total_restocking: totals.restocking,
            total_transfers_in: totals.transfers_in,
            total_transfers_out: totals.transfers_out,
            total_sales: totals.sales,
            total_waste: totals.waste,
            closing_stock: closing,
            has_opening_record: recorded_opening.is_some(),
            has_closing_record,
            is_low_stock: item.is_low_stock(closing),
        }
    }

    fn opening_row<'a>(&self, rows: &'a [OpeningStock], item_id: Uuid) -> Option<&'a OpeningStock> {
        rows.iter()
            .find(|o| o.item_id == item_id && self.in_branch(o.branch_id))
    }
}

fn unbranched_rows<T: Clone>(rows: &[T], branch_of: impl Fn(&T) -> Option<Uuid>) -> Vec<T> {
    rows.iter().filter(|row| branch_of(row).is_none()).cloned().collect()
}
