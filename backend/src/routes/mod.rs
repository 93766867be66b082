//! Route definitions for the Stock Ledger Platform

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - daily reports
        .nest("/reports", report_routes(state.clone()))
        // Protected routes - stock reconciliation
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - item management
        .nest("/items", item_routes(state))
}

/// Report routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/daily", get(handlers::get_daily_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock reconciliation routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/closing/recalculate",
            post(handlers::recalculate_closing_stock),
        )
        .route("/cascade", post(handlers::cascade_stock))
        .route("/opening", put(handlers::record_opening_stock))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Item routes (protected)
fn item_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:item_id", delete(handlers::delete_item))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
