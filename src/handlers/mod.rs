//! HTTP glue. Handlers parse DTOs, call into the services and shape
//! `ApiResponse` envelopes; no domain logic lives here.

pub mod analytics;
pub mod credit_notes;
pub mod orders;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        checkout::CheckoutService, credit_notes::CreditNoteService,
        order_addresses::OrderAddressService, order_items::OrderItemService, orders::OrderService,
        reconciliation::ReconciliationService, LineItemInput,
    },
};

/// Aggregate of every service used by the HTTP handlers. All services share
/// the injected pool; there are no process-wide singletons.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub order_items: Arc<OrderItemService>,
    pub order_addresses: Arc<OrderAddressService>,
    pub credit_notes: Arc<CreditNoteService>,
    pub checkout: Arc<CheckoutService>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let orders = Arc::new(OrderService::new(db.clone(), Some(event_sender.clone())));
        let order_items = Arc::new(OrderItemService::new(db.clone()));
        let order_addresses = Arc::new(OrderAddressService::new(db.clone()));
        let credit_notes = Arc::new(CreditNoteService::new(
            db.clone(),
            Some(event_sender.clone()),
        ));
        let checkout = Arc::new(CheckoutService::new(
            db.clone(),
            Some(event_sender),
            orders.clone(),
            order_items.clone(),
            order_addresses.clone(),
        ));
        let reconciliation = Arc::new(ReconciliationService::new(
            db,
            orders.clone(),
            credit_notes.clone(),
        ));

        Self {
            orders,
            order_items,
            order_addresses,
            credit_notes,
            checkout,
            reconciliation,
        }
    }
}

/// Line item as submitted over the wire, shared by order and credit-note
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LineItemDto {
    pub product_id: i64,
    pub product_name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price_ht: Decimal,
    pub unit_price_ttc: Decimal,
    #[serde(default)]
    pub vat_rate: Decimal,
    pub total_price_ht: Decimal,
    pub total_price_ttc: Decimal,
}

impl From<LineItemDto> for LineItemInput {
    fn from(dto: LineItemDto) -> Self {
        LineItemInput {
            product_id: dto.product_id,
            product_name: dto.product_name,
            description: dto.description,
            image_url: dto.image_url,
            quantity: dto.quantity,
            unit_price_ht: dto.unit_price_ht,
            unit_price_ttc: dto.unit_price_ttc,
            vat_rate: dto.vat_rate,
            total_price_ht: dto.total_price_ht,
            total_price_ttc: dto.total_price_ttc,
        }
    }
}
