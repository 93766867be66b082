//! Common types used across the platform

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The (organization, branch) pair restricting which rows a computation may
/// read or write. `branch_id = None` means every branch of the organization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Scope {
    pub organization_id: Uuid,
    pub branch_id: Option<Uuid>,
}

impl Scope {
    pub fn organization_wide(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            branch_id: None,
        }
    }

    pub fn for_branch(organization_id: Uuid, branch_id: Uuid) -> Self {
        Self {
            organization_id,
            branch_id: Some(branch_id),
        }
    }

    /// Whether a row owned by `branch_id` is visible in this scope
    pub fn includes_branch(&self, branch_id: Option<Uuid>) -> bool {
        match self.branch_id {
            Some(scoped) => branch_id == Some(scoped),
            None => true,
        }
    }

    pub fn is_organization_wide(&self) -> bool {
        self.branch_id.is_none()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch_id {
            Some(branch_id) => write!(f, "{}/{}", self.organization_id, branch_id),
            None => write!(f, "{}/*", self.organization_id),
        }
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl DateRange {
    /// Number of calendar days covered, zero when `end` precedes `start`
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(-1) + 1
    }
}
