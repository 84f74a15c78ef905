use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    entities::{credit_note, order_address, order_item},
    errors::ServiceError,
    events::{Event, EventSender},
    services::year_window,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Order header data as assembled by the transaction orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderHeader {
    pub customer_id: Option<i64>,
    /// Opaque caller-defined customer snapshot; required when no customer
    /// reference is given (guest orders).
    pub customer_snapshot: Option<serde_json::Value>,
    pub total_amount_ht: Decimal,
    pub total_amount_ttc: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
    /// Idempotency key; a retried create with the same reference returns the
    /// already-persisted row.
    pub payment_reference: Option<String>,
}

impl NewOrderHeader {
    fn normalized_payment_reference(&self) -> Option<String> {
        self.payment_reference
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    fn has_customer_identity(&self) -> bool {
        self.customer_id.is_some()
            || self
                .customer_snapshot
                .as_ref()
                .map(|v| !v.is_null())
                .unwrap_or(false)
    }
}

/// Service for the order aggregate: header persistence, delivery flag,
/// year listing and administrative deletion.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Validates an order header. Runs before any write so that validation
    /// failures never touch the unit of work.
    pub fn validate_header(header: &NewOrderHeader) -> Result<(), ServiceError> {
        if !header.has_customer_identity() {
            return Err(ServiceError::ValidationError(
                "customer identity required".to_string(),
            ));
        }
        if header.total_amount_ht < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "total HT must be non-negative".to_string(),
            ));
        }
        if header.total_amount_ttc < header.total_amount_ht {
            return Err(ServiceError::ValidationError(
                "total TTC must be at least total HT".to_string(),
            ));
        }
        if header.payment_method.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment method required".to_string(),
            ));
        }
        Ok(())
    }

    /// Writes the order header on the supplied unit of work.
    ///
    /// When a payment reference is present the insert is an upsert keyed on
    /// the unique `payment_reference` column: a duplicate delivery touches
    /// `updated_at` and returns the existing row, so concurrent webhook
    /// retries can never produce two orders.
    #[instrument(skip(self, header, conn))]
    pub async fn insert_header<C: ConnectionTrait>(
        &self,
        header: &NewOrderHeader,
        conn: &C,
    ) -> Result<order::Model, ServiceError> {
        Self::validate_header(header)?;

        let now = Utc::now();
        let payment_reference = header.normalized_payment_reference();

        let active = order::ActiveModel {
            id: NotSet,
            customer_id: Set(header.customer_id),
            customer_snapshot: Set(header.customer_snapshot.clone()),
            total_amount_ht: Set(header.total_amount_ht),
            total_amount_ttc: Set(header.total_amount_ttc),
            payment_method: Set(header.payment_method.trim().to_string()),
            notes: Set(header.notes.clone()),
            delivered: Set(false),
            payment_reference: Set(payment_reference.clone()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let order_model = if payment_reference.is_some() {
            OrderEntity::insert(active)
                .on_conflict(
                    OnConflict::column(order::Column::PaymentReference)
                        .update_column(order::Column::UpdatedAt)
                        .to_owned(),
                )
                .exec_with_returning(conn)
                .await?
        } else {
            active.insert(conn).await?
        };

        info!(order_id = %order_model.id, "Order header written");
        Ok(order_model)
    }

    /// Retrieves an order by ID
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: i64) -> Result<Option<order::Model>, ServiceError> {
        let db = &*self.db_pool;

        let order = OrderEntity::find_by_id(order_id).one(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to fetch order from database");
            ServiceError::DatabaseError(e)
        })?;

        Ok(order)
    }

    /// Toggles the delivered flag, the only mutable header field.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn update_delivery_status(
        &self,
        order_id: i64,
        delivered: bool,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                warn!(order_id = %order_id, "Order not found for delivery status update");
                ServiceError::NotFound("order not found".to_string())
            })?;

        let mut order_active: order::ActiveModel = order.into();
        order_active.delivered = Set(delivered);
        order_active.updated_at = Set(Some(now));

        let updated = order_active.update(db).await?;

        info!(order_id = %order_id, delivered = %delivered, "Delivery status updated");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::DeliveryStatusChanged {
                    order_id,
                    delivered,
                })
                .await
            {
                warn!(error = %e, order_id = %order_id, "Failed to send delivery status event");
            }
        }

        Ok(updated)
    }

    /// Orders created within the UTC year window `[Jan 1, Jan 1 + 1y)`.
    #[instrument(skip(self))]
    pub async fn list_by_year(&self, year: i32) -> Result<Vec<order::Model>, ServiceError> {
        let (start, end) = year_window(year)?;
        self.list_created_between(None, Some(start), Some(end))
            .await
    }

    /// Orders matching an optional customer and creation window. `start` is
    /// inclusive, `end` exclusive.
    #[instrument(skip(self))]
    pub async fn list_created_between(
        &self,
        customer_id: Option<i64>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = OrderEntity::find();
        if let Some(customer_id) = customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(start) = start {
            query = query.filter(order::Column::CreatedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(order::Column::CreatedAt.lt(end));
        }

        let orders = query
            .order_by_asc(order::Column::CreatedAt)
            .order_by_asc(order::Column::Id)
            .all(db)
            .await?;

        Ok(orders)
    }

    /// Administrative deletion; removes the order together with its items and
    /// addresses in one transaction. Returns false when the order does not
    /// exist.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;

        let Some(order) = OrderEntity::find_by_id(order_id).one(db).await? else {
            return Ok(false);
        };

        let referencing_credit_notes = credit_note::Entity::find()
            .filter(credit_note::Column::OrderId.eq(order_id))
            .count(db)
            .await?;
        if referencing_credit_notes > 0 {
            return Err(ServiceError::InvalidOperation(
                "order has credit notes and cannot be deleted".to_string(),
            ));
        }

        let txn = db.begin().await?;

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order_address::Entity::delete_many()
            .filter(order_address::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(order.id).exec(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, "Order deleted");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderDeleted(order_id)).await {
                warn!(error = %e, order_id = %order_id, "Failed to send order deleted event");
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn header() -> NewOrderHeader {
        NewOrderHeader {
            customer_id: None,
            customer_snapshot: Some(json!({"email": "a@b.com"})),
            total_amount_ht: dec!(20),
            total_amount_ttc: dec!(24.20),
            payment_method: "card".to_string(),
            notes: None,
            payment_reference: None,
        }
    }

    #[test]
    fn header_without_customer_identity_is_rejected() {
        let mut bad = header();
        bad.customer_snapshot = None;
        let err = OrderService::validate_header(&bad).unwrap_err();
        assert!(err.to_string().contains("customer identity required"));
    }

    #[test]
    fn null_snapshot_does_not_count_as_identity() {
        let mut bad = header();
        bad.customer_snapshot = Some(serde_json::Value::Null);
        assert!(OrderService::validate_header(&bad).is_err());
    }

    #[test]
    fn customer_id_alone_is_sufficient() {
        let mut ok = header();
        ok.customer_snapshot = None;
        ok.customer_id = Some(7);
        assert!(OrderService::validate_header(&ok).is_ok());
    }

    #[test]
    fn negative_totals_are_rejected() {
        let mut bad = header();
        bad.total_amount_ht = dec!(-1);
        assert!(OrderService::validate_header(&bad).is_err());
    }

    #[test]
    fn ttc_below_ht_is_rejected() {
        let mut bad = header();
        bad.total_amount_ttc = dec!(19.99);
        assert!(OrderService::validate_header(&bad).is_err());
    }

    #[test]
    fn blank_payment_method_is_rejected() {
        let mut bad = header();
        bad.payment_method = "  ".to_string();
        assert!(OrderService::validate_header(&bad).is_err());
    }

    #[test]
    fn blank_payment_reference_normalizes_to_none() {
        let mut h = header();
        h.payment_reference = Some("   ".to_string());
        assert_eq!(h.normalized_payment_reference(), None);

        h.payment_reference = Some(" pay_42 ".to_string());
        assert_eq!(h.normalized_payment_reference(), Some("pay_42".to_string()));
    }
}
