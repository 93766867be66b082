//! Item lifecycle rules

use std::sync::Arc;

use shared::Actor;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::store::StockStore;

#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn StockStore>,
}

impl ItemService {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    /// Delete an item that has never been sold or counted.
    ///
    /// Items referenced by sales or by opening or closing stock are kept so
    /// historical reports stay reproducible.
    pub async fn delete_item(&self, actor: &Actor, item_id: Uuid) -> AppResult<()> {
        if !actor.role.can_modify_stock() {
            return Err(AppError::InsufficientPermissions);
        }

        let item = self
            .store
            .find_item(actor.organization_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        if actor.role.is_branch_pinned() && !item.visible_in_branch(actor.branch_id) {
            return Err(AppError::Forbidden(
                "Item belongs to another branch".to_string(),
            ));
        }

        if self
            .store
            .item_has_history(actor.organization_id, item_id)
            .await?
        {
            return Err(AppError::Conflict {
                resource: "item".to_string(),
                message: format!(
                    "{} has sales or stock history and cannot be deleted",
                    item.name
                ),
            });
        }

        if !self.store.delete_item(actor.organization_id, item_id).await? {
            return Err(AppError::NotFound("Item".to_string()));
        }

        tracing::info!(item_id = %item_id, organization_id = %actor.organization_id, "Item deleted");
        Ok(())
    }
}
