//! Stock write operations: closing stock recalculation and opening stock
//! backfill. Both run under the organization's write lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    format_date, parse_ledger_date, Actor, ClosingStockUpsert, DailyLedger, OpeningStockSource,
    OpeningStockUpsert, Scope,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::cascade::{CascadeReport, CascadeService};
use crate::services::clock::Clock;
use crate::services::locks::OrganizationLocks;
use crate::services::report::ReportService;
use crate::services::store::StockStore;

#[derive(Debug, Deserialize)]
pub struct RecalculateClosingInput {
    pub date: String,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RecalculationResult {
    pub date: NaiveDate,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub closing_stock: Vec<ClosingStockUpsert>,
    /// Present when the date lies before today
    pub cascade: Option<CascadeReport>,
}

/// Manual opening stock entry
#[derive(Debug, Deserialize, Validate)]
pub struct OpeningStockInput {
    pub item_id: Uuid,
    pub date: String,
    pub branch_id: Option<Uuid>,
    #[validate(custom = "shared::validate_non_negative")]
    pub quantity: Decimal,
    #[validate(custom = "shared::validate_non_negative")]
    pub cost_price: Option<Decimal>,
    #[validate(custom = "shared::validate_non_negative")]
    pub selling_price: Option<Decimal>,
    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn StockStore>,
    clock: Arc<dyn Clock>,
    locks: OrganizationLocks,
    max_cascade_days: u32,
}

impl StockService {
    pub fn new(
        store: Arc<dyn StockStore>,
        clock: Arc<dyn Clock>,
        locks: OrganizationLocks,
        max_cascade_days: u32,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            max_cascade_days,
        }
    }

    fn reports(&self) -> ReportService {
        ReportService::new(self.store.clone(), self.clock.clone())
    }

    fn cascades(&self) -> CascadeService {
        CascadeService::new(
            self.store.clone(),
            self.clock.clone(),
            self.locks.clone(),
            self.max_cascade_days,
        )
    }

    /// Store the computed closing stock for a date, then cascade it forward
    /// when the date is in the past
    pub async fn recalculate_closing_stock(
        &self,
        actor: &Actor,
        input: RecalculateClosingInput,
    ) -> AppResult<RecalculationResult> {
        if !actor.role.can_modify_stock() {
            return Err(AppError::InsufficientPermissions);
        }
        let scope = actor.effective_scope(input.branch_id)?;
        let today = self.clock.today();
        let date = parse_ledger_date(&input.date, today)?;

        let _guard = self.locks.acquire(scope.organization_id).await;

        let ledger = self.reports().load_ledger(scope, date).await?;
        let rows = closing_rows_for(&ledger, scope);
        self.store.upsert_closing_stock(&rows).await?;

        tracing::info!(
            %scope,
            date = %format_date(date),
            rows = rows.len(),
            "Closing stock recalculated"
        );

        let cascade = if date < today {
            Some(self.cascades().run_locked(date, scope).await?)
        } else {
            None
        };

        Ok(RecalculationResult {
            date,
            organization_id: scope.organization_id,
            branch_id: scope.branch_id,
            closing_stock: rows,
            cascade,
        })
    }

    /// Record or correct an opening stock row by hand
    pub async fn record_opening_stock(
        &self,
        actor: &Actor,
        input: OpeningStockInput,
    ) -> AppResult<OpeningStockUpsert> {
        if !actor.role.can_modify_stock() {
            return Err(AppError::InsufficientPermissions);
        }
        input.validate()?;

        let scope = actor.effective_scope(input.branch_id)?;
        let date = parse_ledger_date(&input.date, self.clock.today())?;

        let item = self
            .store
            .find_item(scope.organization_id, input.item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))?;
        if !item.visible_in_branch(scope.branch_id) {
            return Err(AppError::NotFound("Item".to_string()));
        }

        let _guard = self.locks.acquire(scope.organization_id).await;

        let row = OpeningStockUpsert {
            item_id: item.id,
            organization_id: scope.organization_id,
            branch_id: scope.branch_id,
            date,
            quantity: input.quantity,
            cost_price: input.cost_price,
            selling_price: input.selling_price,
            is_manual: true,
            notes: input.notes,
        };
        self.store
            .upsert_opening_stock(std::slice::from_ref(&row))
            .await?;

        tracing::info!(
            %scope,
            item_id = %item.id,
            date = %format_date(date),
            quantity = %row.quantity,
            "Manual opening stock recorded"
        );

        Ok(row)
    }
}

/// Closing stock rows to store for a day.
///
/// Organization-wide, rows are computed per branch seen in the day's data so
/// each stored row keeps its own branch. Rows recorded without a branch form
/// their own bucket and are stored without a branch. Items with no activity
/// and no stock history on the day are left out.
pub fn closing_rows_for(ledger: &DailyLedger, scope: Scope) -> Vec<ClosingStockUpsert> {
    let views: Vec<DailyLedger> = match scope.branch_id {
        Some(branch) => vec![DailyLedger {
            branch_id: Some(branch),
            ..ledger.clone()
        }],
        None => {
            let seen = branches_in(ledger);
            let mut views: Vec<DailyLedger> = seen
                .into_iter()
                .map(|branch| DailyLedger {
                    branch_id: Some(branch),
                    ..ledger.clone()
                })
                .collect();
            if views.is_empty() || ledger.has_unbranched_rows() {
                views.push(ledger.unbranched());
            }
            views
        }
    };

    views
        .iter()
        .flat_map(|view| {
            let branch_id = view.branch_id;
            view.build_report()
                .into_iter()
                .filter(|row| {
                    row.totals().has_activity()
                        || row.has_opening_record
                        || row.has_closing_record
                        || row.opening_stock_source != OpeningStockSource::Zero
                })
                .map(move |row| ClosingStockUpsert {
                    item_id: row.item_id,
                    organization_id: scope.organization_id,
                    branch_id,
                    date: ledger.date,
                    quantity: row.closing_stock,
                    notes: Some("Recalculated from daily transactions".to_string()),
                })
        })
        .collect()
}

/// Every branch referenced by the day's rows, in a stable order
fn branches_in(ledger: &DailyLedger) -> BTreeSet<Uuid> {
    let activity = &ledger.activity;
    ledger
        .items
        .iter()
        .map(|i| i.branch_id)
        .chain(ledger.opening_stock.iter().map(|o| o.branch_id))
        .chain(ledger.closing_stock.iter().map(|c| c.branch_id))
        .chain(ledger.previous_closing_stock.iter().map(|c| c.branch_id))
        .chain(activity.sales.iter().map(|s| s.branch_id))
        .chain(activity.restockings.iter().map(|r| r.branch_id))
        .chain(activity.waste.iter().map(|w| w.branch_id))
        .flatten()
        .chain(
            activity
                .transfers
                .iter()
                .flat_map(|t| [t.from_branch_id, t.to_branch_id]),
        )
        .collect()
}
