//! Stock Ledger Platform - Backend
//!
//! Daily stock reconciliation for multi-branch restaurants: computes each
//! day's opening and closing stock from the transaction logs and keeps later
//! days consistent when history is corrected.

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::Actor;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::{
    CascadeService, Clock, IdentityProvider, ItemService, OrganizationLocks, ReportService,
    StockService, StockStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn StockStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
    pub locks: OrganizationLocks,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn StockStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            identity,
            clock,
            locks: OrganizationLocks::new(),
        }
    }

    /// Resolve the organization, branch and role of an authenticated user
    pub async fn actor(&self, user: &AuthUser) -> AppResult<Actor> {
        self.identity.resolve(user.user_id).await
    }

    pub fn report_service(&self) -> ReportService {
        ReportService::new(self.store.clone(), self.clock.clone())
    }

    pub fn cascade_service(&self) -> CascadeService {
        CascadeService::new(
            self.store.clone(),
            self.clock.clone(),
            self.locks.clone(),
            self.config.reconciliation.max_cascade_days,
        )
    }

    pub fn stock_service(&self) -> StockService {
        StockService::new(
            self.store.clone(),
            self.clock.clone(),
            self.locks.clone(),
            self.config.reconciliation.max_cascade_days,
        )
    }

    pub fn item_service(&self) -> ItemService {
        ItemService::new(self.store.clone())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Stock Ledger API v1.0"
}
