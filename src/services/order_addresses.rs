use crate::{
    db::DbPool,
    entities::order_address::{self, AddressType, Entity as OrderAddressEntity},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Store for order address snapshots. The snapshot body is caller-defined;
/// field-level validation, if any, happens upstream.
#[derive(Clone)]
pub struct OrderAddressService {
    db_pool: Arc<DbPool>,
}

impl OrderAddressService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates one address snapshot under the supplied unit of work.
    #[instrument(skip(self, snapshot, conn), fields(order_id = %order_id, address_type = ?address_type))]
    pub async fn create<C: ConnectionTrait>(
        &self,
        order_id: i64,
        address_type: AddressType,
        snapshot: serde_json::Value,
        conn: &C,
    ) -> Result<order_address::Model, ServiceError> {
        let active = order_address::ActiveModel {
            id: NotSet,
            order_id: Set(order_id),
            address_type: Set(address_type),
            snapshot: Set(snapshot),
            created_at: Set(Utc::now()),
        };

        let model = active.insert(conn).await?;
        Ok(model)
    }

    /// Addresses of one order (at most shipping + billing in the common case).
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_by_order_id(
        &self,
        order_id: i64,
    ) -> Result<Vec<order_address::Model>, ServiceError> {
        let db = &*self.db_pool;

        let addresses = OrderAddressEntity::find()
            .filter(order_address::Column::OrderId.eq(order_id))
            .order_by_asc(order_address::Column::Id)
            .all(db)
            .await?;

        Ok(addresses)
    }

    /// Administrative deletion of a single address snapshot.
    #[instrument(skip(self), fields(address_id = %address_id))]
    pub async fn delete_address(&self, address_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;

        let result = OrderAddressEntity::delete_by_id(address_id).exec(db).await?;
        let deleted = result.rows_affected > 0;
        if deleted {
            info!(address_id = %address_id, "Order address deleted");
        }
        Ok(deleted)
    }
}
