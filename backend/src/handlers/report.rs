//! HTTP handlers for daily stock reports

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::DailyReport;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Defaults to today
    pub date: Option<String>,
    pub branch_id: Option<Uuid>,
}

/// Get the daily stock report for a date
pub async fn get_daily_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<DailyReport>> {
    let actor = state.actor(&current_user.0).await?;
    let scope = actor.effective_scope(query.branch_id)?;
    let date = query
        .date
        .unwrap_or_else(|| shared::format_date(state.clock.today()));

    let report = state.report_service().daily_report(&date, scope).await?;
    Ok(Json(report))
}
