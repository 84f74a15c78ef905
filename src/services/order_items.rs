use crate::{
    db::DbPool,
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    services::LineItemInput,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Store for order line items. Creation happens only inside the order
/// transaction; items are immutable afterwards in the happy path.
#[derive(Clone)]
pub struct OrderItemService {
    db_pool: Arc<DbPool>,
}

impl OrderItemService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates one line item under the supplied unit of work.
    #[instrument(skip(self, item, conn), fields(order_id = %order_id))]
    pub async fn create_item<C: ConnectionTrait>(
        &self,
        order_id: i64,
        item: &LineItemInput,
        conn: &C,
    ) -> Result<order_item::Model, ServiceError> {
        item.validate()?;

        let active = order_item::ActiveModel {
            id: NotSet,
            order_id: Set(order_id),
            product_id: Set(item.product_id),
            product_name: Set(item.product_name.trim().to_string()),
            description: Set(item.description.clone()),
            image_url: Set(item.image_url.clone()),
            quantity: Set(item.quantity),
            unit_price_ht: Set(item.unit_price_ht),
            unit_price_ttc: Set(item.unit_price_ttc),
            vat_rate: Set(item.vat_rate),
            total_price_ht: Set(item.total_price_ht),
            total_price_ttc: Set(item.total_price_ttc),
            created_at: NotSet,
            updated_at: NotSet,
        };

        let model = active.insert(conn).await?;
        Ok(model)
    }

    /// Items of one order, in stable display order (creation time ascending).
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_by_order_id(
        &self,
        order_id: i64,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        let db = &*self.db_pool;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::Id)
            .all(db)
            .await?;

        Ok(items)
    }

    /// Administrative single-item deletion. Does not resync the parent's
    /// stored totals; reconciled reads absorb the drift.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;

        let result = OrderItemEntity::delete_by_id(item_id).exec(db).await?;
        let deleted = result.rows_affected > 0;
        if deleted {
            info!(item_id = %item_id, "Order item deleted");
        }
        Ok(deleted)
    }
}
