//! HTTP handlers for item management

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Delete an item without sales or stock history
pub async fn delete_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let actor = state.actor(&current_user.0).await?;
    state.item_service().delete_item(&actor, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
