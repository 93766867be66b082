//! Cascade updater
//!
//! After a historical closing stock changes, every later day's opening and
//! closing stock is rewritten so that each day opens with the previous day's
//! close. The walk runs one day at a time from the start date up to today.
//!
//! Prices on existing opening rows are never touched. A new opening row takes
//! its prices from the previous day's opening row for the same item.
//!
//! An opening row entered by hand ends the walk for its item and branch: the
//! row and every later day of that item are left as they are.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    closing_stock, format_date, next_day, parse_ledger_date, Actor, ClosingStockUpsert,
    DateRange, OpeningStock, OpeningStockUpsert, Scope, StockKey,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::clock::Clock;
use crate::services::locks::OrganizationLocks;
use crate::services::store::StockStore;

/// Outcome of a completed cascade
#[derive(Debug, Clone, Serialize)]
pub struct CascadeReport {
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    /// Days whose closing stock is propagated. The last one is the day
    /// before today, so today's opening and closing stock are rewritten too.
    pub range: DateRange,
    pub days_updated: usize,
    pub days_skipped: usize,
    /// One line per updated day
    pub updates: Vec<String>,
    /// Item and branch pairs whose walk stopped at a manually entered
    /// opening row
    pub manual_stops: usize,
}

/// What happened to a single day
enum DayOutcome {
    Updated(String),
    /// Nothing to carry from the source day
    Skipped,
}

#[derive(Clone)]
pub struct CascadeService {
    store: Arc<dyn StockStore>,
    clock: Arc<dyn Clock>,
    locks: OrganizationLocks,
    max_cascade_days: u32,
}

impl CascadeService {
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

    /// Propagate closing stock forward from `start_input` through today
    pub async fn cascade(
        &self,
        start_input: &str,
        actor: &Actor,
        requested_branch: Option<Uuid>,
    ) -> AppResult<CascadeReport> {
        if !actor.role.can_modify_stock() {
            return Err(AppError::InsufficientPermissions);
        }
        let scope = actor.effective_scope(requested_branch)?;
        let start = parse_ledger_date(start_input, self.clock.today())?;

        let _guard = self.locks.acquire(scope.organization_id).await;
        self.run_locked(start, scope).await
    }

    /// Run the cascade. The caller must hold the organization's lock.
    pub(crate) async fn run_locked(&self, start: NaiveDate, scope: Scope) -> AppResult<CascadeReport> {
        let today = self.clock.today();
        let range = DateRange {
            start,
            end: today.pred_opt().unwrap_or(today),
        };

        let days = range.days();
        if days > i64::from(self.max_cascade_days) {
            return Err(AppError::CascadeLimitExceeded {
                days,
                max_days: self.max_cascade_days,
            });
        }

        tracing::info!(
            %scope,
            start = %format_date(start),
            today = %format_date(today),
            days,
            "Starting stock cascade"
        );

        let mut updates = Vec::new();
        let mut days_skipped = 0;
        let mut stopped = HashSet::new();
        let mut current = start;

        while current < today {
            let next = next_day(current)?;

            match self.roll_forward(scope, current, next, &mut stopped).await {
                Ok(DayOutcome::Updated(summary)) => {
                    tracing::debug!(%scope, date = %format_date(next), "{}", summary);
                    updates.push(summary);
                }
                Ok(DayOutcome::Skipped) => {
                    tracing::debug!(
                        %scope,
                        date = %format_date(current),
                        "Nothing to carry forward, skipping day"
                    );
                    days_skipped += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        %scope,
                        failed_date = %format_date(next),
                        completed = updates.len(),
                        error = %err,
                        "Stock cascade interrupted"
                    );
                    return Err(AppError::CascadeInterrupted {
                        failed_date: next,
                        updates,
                        message: err.to_string(),
                    });
                }
            }

            current = next;
        }

        tracing::info!(
            %scope,
            days_updated = updates.len(),
            days_skipped,
            manual_stops = stopped.len(),
            "Stock cascade completed"
        );

        Ok(CascadeReport {
            organization_id: scope.organization_id,
            branch_id: scope.branch_id,
            range,
            days_updated: updates.len(),
            days_skipped,
            updates,
            manual_stops: stopped.len(),
        })
    }

    /// Carry `current`'s closing stock into `next`'s opening stock and
    /// recompute `next`'s closing stock.
    ///
    /// `stopped` holds the item and branch pairs that already met a manual
    /// opening row; they are not written again.
    async fn roll_forward(
        &self,
        scope: Scope,
        current: NaiveDate,
        next: NaiveDate,
        stopped: &mut HashSet<(Uuid, Option<Uuid>)>,
    ) -> AppResult<DayOutcome> {
        let closing_rows = self.store.closing_stock(&scope, current).await?;
        if closing_rows.is_empty() {
            return Ok(DayOutcome::Skipped);
        }

        let items: HashSet<Uuid> = self
            .store
            .list_items(&scope)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();
        let current_opening = self.store.opening_stock(&scope, current).await?;
        let next_opening = self.store.opening_stock(&scope, next).await?;
        let activity = self.store.day_activity(&scope, next).await?;

        let current_by_key: HashMap<StockKey, &OpeningStock> =
            current_opening.iter().map(|o| (o.key(), o)).collect();
        let next_by_key: HashMap<StockKey, &OpeningStock> =
            next_opening.iter().map(|o| (o.key(), o)).collect();

        let source = format_date(current);
        let mut opening_rows = Vec::new();
        let mut closing_updates = Vec::new();
        let mut created = 0;
        let mut changed = 0;
        let mut kept_manual = 0;

        for closing in closing_rows.iter().filter(|c| items.contains(&c.item_id)) {
            let chain = (closing.item_id, closing.branch_id);
            if stopped.contains(&chain) {
                continue;
            }
            let key = StockKey {
                date: next,
                ..closing.key()
            };
            let quantity = closing.quantity;

            let (cost_price, selling_price, notes) = match next_by_key.get(&key) {
                Some(existing) if existing.is_manual => {
                    tracing::debug!(
                        %scope,
                        item_id = %closing.item_id,
                        date = %format_date(next),
                        "Manual opening stock reached, stopping item"
                    );
                    stopped.insert(chain);
                    kept_manual += 1;
                    continue;
                }
                Some(existing) => {
                    let notes = if existing.quantity != quantity {
                        changed += 1;
                        format!(
                            "Cascaded from closing stock of {}: {} (was {})",
                            source, quantity, existing.quantity
                        )
                    } else {
                        format!("Cascaded from closing stock of {}: {}", source, quantity)
                    };
                    (existing.cost_price, existing.selling_price, notes)
                }
                None => {
                    created += 1;
                    let prior = current_by_key.get(&closing.key());
                    (
                        prior.and_then(|o| o.cost_price),
                        prior.and_then(|o| o.selling_price),
                        format!("Cascaded from closing stock of {}: {}", source, quantity),
                    )
                }
            };

            opening_rows.push(OpeningStockUpsert {
                item_id: closing.item_id,
                organization_id: closing.organization_id,
                branch_id: closing.branch_id,
                date: next,
                quantity,
                cost_price,
                selling_price,
                is_manual: false,
                notes: Some(notes),
            });

            let totals = activity.bucket_totals(closing.item_id, closing.branch_id);
            closing_updates.push(ClosingStockUpsert {
                item_id: closing.item_id,
                organization_id: closing.organization_id,
                branch_id: closing.branch_id,
                date: next,
                quantity: closing_stock(quantity, &totals),
                notes: Some(format!("Recalculated by cascade from {}", source)),
            });
        }

        if opening_rows.is_empty() && kept_manual == 0 {
            return Ok(DayOutcome::Skipped);
        }
        if !opening_rows.is_empty() {
            self.store.upsert_opening_stock(&opening_rows).await?;
            self.store.upsert_closing_stock(&closing_updates).await?;
        }

        let mut summary = format!(
            "{}: opening stock set for {} items ({} created, {} changed), closing stock recalculated",
            format_date(next),
            opening_rows.len(),
            created,
            changed
        );
        if kept_manual > 0 {
            summary.push_str(&format!(
                "; kept {} manually entered opening stock rows",
                kept_manual
            ));
        }
        Ok(DayOutcome::Updated(summary))
    }
}
