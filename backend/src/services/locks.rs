//! Per-organization write locks
//!
//! Recalculations, cascades and backfills of one organization run one at a
//! time so two cascades never interleave their day-by-day writes. Later
//! callers wait for the lock rather than being rejected.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct OrganizationLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl OrganizationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to an organization's ledger
    pub async fn acquire(&self, organization_id: Uuid) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await
        let lock = self
            .locks
            .entry(organization_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.lock_owned().await
    }
}
