//! Daily report calculation
//!
//! Closing stock on a report is always computed from the previous day's
//! close, the day's transactions and the day's own opening row. Stored
//! closing rows are never read back as the answer.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    format_date, parse_ledger_date, previous_day, DailyLedger, DailyReportRow, OpeningStockUpsert,
    Scope, StockKey,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::clock::Clock;
use crate::services::store::StockStore;

/// Report for one date and scope
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub items: Vec<DailyReportRow>,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn StockStore>,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(store: Arc<dyn StockStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Compute the daily report for a caller-supplied date.
    ///
    /// Viewing today also records today's opening stock for items whose
    /// opening was carried over from yesterday's close.
    pub async fn daily_report(&self, date_input: &str, scope: Scope) -> AppResult<DailyReport> {
        let today = self.clock.today();
        let date = parse_ledger_date(date_input, today)?;

        let ledger = self.load_ledger(scope, date).await?;
        let report = DailyReport {
            date,
            organization_id: scope.organization_id,
            branch_id: scope.branch_id,
            items: ledger.build_report(),
        };

        if date == today {
            match self.carry_forward_opening(&ledger).await {
                Ok(0) => {}
                Ok(created) => {
                    tracing::info!(%scope, created, "Recorded today's opening stock")
                }
                Err(err) => {
                    tracing::warn!(%scope, error = %err, "Failed to record today's opening stock")
                }
            }
        }

        Ok(report)
    }

    /// Fetch every row the calculation for `date` needs
    pub async fn load_ledger(&self, scope: Scope, date: NaiveDate) -> AppResult<DailyLedger> {
        let previous = previous_day(date)?;

        let items = self.store.list_items(&scope).await?;
        let opening_stock = self.store.opening_stock(&scope, date).await?;
        let closing_stock = self.store.closing_stock(&scope, date).await?;
        let previous_closing_stock = self.store.closing_stock(&scope, previous).await?;
        let previous_opening_stock = self.store.opening_stock(&scope, previous).await?;
        let activity = self.store.day_activity(&scope, date).await?;

        tracing::debug!(
            %scope,
            date = %format_date(date),
            items = items.len(),
            sales = activity.sales.len(),
            restockings = activity.restockings.len(),
            waste = activity.waste.len(),
            transfers = activity.transfers.len(),
            "Loaded daily ledger"
        );

        Ok(DailyLedger {
            date,
            branch_id: scope.branch_id,
            items,
            opening_stock,
            closing_stock,
            previous_closing_stock,
            previous_opening_stock,
            activity,
        })
    }

    /// Write an opening row for every previous close that has none on
    /// `ledger.date`. Returns the number of rows written.
    async fn carry_forward_opening(&self, ledger: &DailyLedger) -> AppResult<usize> {
        let recorded: HashSet<StockKey> = ledger.opening_stock.iter().map(|o| o.key()).collect();
        let missing: Vec<_> = ledger
            .previous_closing_stock
            .iter()
            .filter(|c| {
                let key = StockKey {
                    date: ledger.date,
                    ..c.key()
                };
                !recorded.contains(&key)
            })
            .collect();

        if missing.is_empty() {
            return Ok(0);
        }

        let previous = previous_day(ledger.date)?;
        let rows: Vec<OpeningStockUpsert> = missing
            .into_iter()
            .filter_map(|closing| {
                let item = ledger.items.iter().find(|i| i.id == closing.item_id)?;
                let prior = ledger
                    .previous_opening_stock
                    .iter()
                    .find(|o| o.key() == closing.key());
                Some(OpeningStockUpsert {
                    item_id: closing.item_id,
                    organization_id: closing.organization_id,
                    branch_id: closing.branch_id,
                    date: ledger.date,
                    quantity: closing.quantity,
                    cost_price: prior.and_then(|o| o.cost_price).or(Some(item.cost_price)),
                    selling_price: prior
                        .and_then(|o| o.selling_price)
                        .or(Some(item.selling_price)),
                    is_manual: false,
                    notes: Some(format!(
                        "Carried forward from closing stock of {}",
                        format_date(previous)
                    )),
                })
            })
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }

        self.store.upsert_opening_stock(&rows).await?;
        Ok(rows.len())
    }
}
