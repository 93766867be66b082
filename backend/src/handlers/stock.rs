//! HTTP handlers for stock recalculation, cascades and opening stock entry

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::OpeningStockUpsert;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::cascade::CascadeReport;
use crate::services::stock::{OpeningStockInput, RecalculateClosingInput, RecalculationResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CascadeInput {
    pub start_date: String,
    pub branch_id: Option<Uuid>,
}

/// Recalculate and store closing stock for a date
pub async fn recalculate_closing_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecalculateClosingInput>,
) -> AppResult<Json<RecalculationResult>> {
    let actor = state.actor(&current_user.0).await?;
    let result = state
        .stock_service()
        .recalculate_closing_stock(&actor, input)
        .await?;
    Ok(Json(result))
}

/// Propagate closing stock forward from a start date
pub async fn cascade_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CascadeInput>,
) -> AppResult<Json<CascadeReport>> {
    let actor = state.actor(&current_user.0).await?;
    let report = state
        .cascade_service()
        .cascade(&input.start_date, &actor, input.branch_id)
        .await?;
    Ok(Json(report))
}

/// Record opening stock by hand
pub async fn record_opening_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<OpeningStockInput>,
) -> AppResult<Json<OpeningStockUpsert>> {
    let actor = state.actor(&current_user.0).await?;
    let row = state
        .stock_service()
        .record_opening_stock(&actor, input)
        .await?;
    Ok(Json(row))
}
