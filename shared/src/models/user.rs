//! Actor and role models

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::Scope;

/// Roles within an organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "user_role", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Tenant-wide administrator, may act on any branch or the whole organization
    Admin,
    BranchManager,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::BranchManager => "branch_manager",
            Role::Staff => "staff",
        }
    }

    /// Pinned roles always act on their own branch
    pub fn is_branch_pinned(&self) -> bool {
        !matches!(self, Role::Admin)
    }

    /// Recalculation, cascades and backfills
    pub fn can_modify_stock(&self) -> bool {
        matches!(self, Role::Admin | Role::BranchManager)
    }
}

/// Identity as resolved by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Actor {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("{role} account is not assigned to a branch")]
    MissingBranch { role: &'static str },
}

impl Actor {
    /// Resolve the scope this actor operates in.
    ///
    /// Branch-pinned actors are forced to their own branch regardless of the
    /// requested one; admins get the requested branch or the whole organization.
    pub fn effective_scope(&self, requested_branch: Option<Uuid>) -> Result<Scope, ScopeError> {
        if self.role.is_branch_pinned() {
            let branch_id = self.branch_id.ok_or(ScopeError::MissingBranch {
                role: self.role.as_str(),
            })?;
            return Ok(Scope::for_branch(self.organization_id, branch_id));
        }

        Ok(Scope {
            organization_id: self.organization_id,
            branch_id: requested_branch,
        })
    }
}
