use crate::{
    db::DbPool,
    entities::order,
    entities::order_address::AddressType,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        order_addresses::OrderAddressService,
        order_items::OrderItemService,
        orders::{NewOrderHeader, OrderService},
        LineItemInput,
    },
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Cart as submitted by the caller: line items plus the precomputed totals.
/// The totals are trusted at write time; reconciled reads recompute from the
/// items independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartPayload {
    pub items: Vec<LineItemInput>,
    pub subtotal: Decimal,
    pub total: Decimal,
}

/// Full input of the cart-to-order transaction.
#[derive(Debug, Clone)]
pub struct CreateOrderFromCart {
    pub cart: CartPayload,
    pub customer_id: Option<i64>,
    pub customer_snapshot: Option<serde_json::Value>,
    pub shipping_address: Option<serde_json::Value>,
    pub billing_address: Option<serde_json::Value>,
    /// Skips billing-address creation; the shipping snapshot stands in for
    /// billing.
    pub use_same_billing_address: bool,
    pub payment_reference: Option<String>,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// Orchestrates the atomic cart-to-order transaction: one unit of work for
/// the order header, every line item and the address snapshots. The caller
/// sees either a fully-formed order or none at all.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    orders: Arc<OrderService>,
    order_items: Arc<OrderItemService>,
    order_addresses: Arc<OrderAddressService>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        orders: Arc<OrderService>,
        order_items: Arc<OrderItemService>,
        order_addresses: Arc<OrderAddressService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            orders,
            order_items,
            order_addresses,
        }
    }

    /// Validations that must fail before any write: an empty cart and a
    /// missing customer identity are caller errors, not transaction failures.
    fn validate(input: &CreateOrderFromCart) -> Result<NewOrderHeader, ServiceError> {
        if input.cart.items.is_empty() {
            return Err(ServiceError::ValidationError("cart is empty".to_string()));
        }

        let header = NewOrderHeader {
            customer_id: input.customer_id,
            customer_snapshot: input.customer_snapshot.clone(),
            total_amount_ht: input.cart.subtotal,
            total_amount_ttc: input.cart.total,
            payment_method: input.payment_method.clone(),
            notes: input.notes.clone(),
            payment_reference: input.payment_reference.clone(),
        };
        OrderService::validate_header(&header)?;

        Ok(header)
    }

    /// Creates an order from a cart in one atomic unit of work.
    ///
    /// Pipeline: validate, begin, write header (idempotent upsert on the
    /// payment reference), write every cart line, write address snapshots,
    /// commit. Any failure after the unit of work opens rolls back the whole
    /// transaction and surfaces as `OrderCreationFailed` naming the step.
    #[instrument(skip(self, input), fields(lines = input.cart.items.len()))]
    pub async fn create_order_from_cart(
        &self,
        input: CreateOrderFromCart,
    ) -> Result<order::Model, ServiceError> {
        let header = Self::validate(&input)?;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::OrderCreationFailed(format!("begin unit of work: {}", e))
        })?;

        let written = self.write_order(&txn, &header, &input).await;

        let order_model = match written {
            Ok(order_model) => order_model,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Rollback failed after aborted order creation");
                }
                return Err(match e {
                    wrapped @ ServiceError::OrderCreationFailed(_) => wrapped,
                    other => ServiceError::OrderCreationFailed(other.to_string()),
                });
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_model.id, "Failed to commit order creation");
            ServiceError::OrderCreationFailed(format!("commit: {}", e))
        })?;

        info!(order_id = %order_model.id, "Order created from cart");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::OrderCreated(order_model.id)).await {
                warn!(error = %e, order_id = %order_model.id, "Failed to send order created event");
            }
        }

        Ok(order_model)
    }

    async fn write_order(
        &self,
        txn: &DatabaseTransaction,
        header: &NewOrderHeader,
        input: &CreateOrderFromCart,
    ) -> Result<order::Model, ServiceError> {
        let order_model = self
            .orders
            .insert_header(header, txn)
            .await
            .map_err(|e| ServiceError::OrderCreationFailed(format!("order header: {}", e)))?;

        for (index, line) in input.cart.items.iter().enumerate() {
            self.order_items
                .create_item(order_model.id, line, txn)
                .await
                .map_err(|e| {
                    ServiceError::OrderCreationFailed(format!("cart line {}: {}", index + 1, e))
                })?;
        }

        self.write_addresses(txn, order_model.id, input)
            .await
            .map_err(|e| ServiceError::OrderCreationFailed(format!("addresses: {}", e)))?;

        Ok(order_model)
    }

    async fn write_addresses(
        &self,
        txn: &DatabaseTransaction,
        order_id: i64,
        input: &CreateOrderFromCart,
    ) -> Result<(), ServiceError> {
        if let Some(shipping) = &input.shipping_address {
            self.order_addresses
                .create(order_id, AddressType::Shipping, shipping.clone(), txn)
                .await?;
        }

        if input.use_same_billing_address {
            return Ok(());
        }

        if let Some(billing) = &input.billing_address {
            if input.shipping_address.as_ref() != Some(billing) {
                self.order_addresses
                    .create(order_id, AddressType::Billing, billing.clone(), txn)
                    .await?;
            }
        }

        Ok(())
    }
}
