//! Resolve authenticated users to their organization, branch and role

use async_trait::async_trait;
use shared::Actor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the profile of an authenticated user
    async fn resolve(&self, user_id: Uuid) -> AppResult<Actor>;
}

/// Profiles stored alongside the ledger tables
#[derive(Clone)]
pub struct PgIdentityProvider {
    db: PgPool,
}

impl PgIdentityProvider {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn resolve(&self, user_id: Uuid) -> AppResult<Actor> {
        sqlx::query_as::<_, Actor>(
            r#"
            SELECT user_id, organization_id, branch_id, role
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("No profile found for this account".to_string()))
    }
}
