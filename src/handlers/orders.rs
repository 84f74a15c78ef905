use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{order, order_item},
    errors::ServiceError,
    services::checkout::{CartPayload, CreateOrderFromCart},
    ApiResponse, ApiResult, AppState,
};

use super::LineItemDto;

// Order DTOs

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartDto {
    pub items: Vec<LineItemDto>,
    /// Cart subtotal (HT), trusted at write time
    pub subtotal: Decimal,
    /// Cart total (TTC), trusted at write time
    pub total: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub cart: CartDto,
    pub customer_id: Option<i64>,
    /// Customer snapshot for guests or historical accuracy; opaque
    #[schema(value_type = Option<Object>)]
    pub customer: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<serde_json::Value>,
    #[serde(default)]
    pub use_same_billing_address: bool,
    pub payment_reference: Option<String>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    pub delivered: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub customer_id: Option<i64>,
    #[schema(value_type = Option<Object>)]
    pub customer_snapshot: Option<serde_json::Value>,
    pub total_amount_ht: Decimal,
    pub total_amount_ttc: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
    pub delivered: bool,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            customer_snapshot: model.customer_snapshot,
            total_amount_ht: model.total_amount_ht,
            total_amount_ttc: model.total_amount_ttc,
            payment_method: model.payment_method,
            notes: model.notes,
            delivered: model.delivered,
            payment_reference: model.payment_reference,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Order plus its reconciled totals; the authoritative money view.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciledOrderResponse {
    pub order: OrderResponse,
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price_ht: Decimal,
    pub unit_price_ttc: Decimal,
    pub vat_rate: Decimal,
    pub total_price_ht: Decimal,
    pub total_price_ttc: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            description: model.description,
            image_url: model.image_url,
            quantity: model.quantity,
            unit_price_ht: model.unit_price_ht,
            unit_price_ttc: model.unit_price_ttc,
            vat_rate: model.vat_rate,
            total_price_ht: model.total_price_ht,
            total_price_ttc: model.total_price_ttc,
            created_at: model.created_at,
        }
    }
}

/// POST /orders — create an order from a cart, atomically with items and
/// address snapshots.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<OrderResponse> {
    payload.validate().map_err(ServiceError::from)?;

    let input = CreateOrderFromCart {
        cart: CartPayload {
            items: payload.cart.items.into_iter().map(Into::into).collect(),
            subtotal: payload.cart.subtotal,
            total: payload.cart.total,
        },
        customer_id: payload.customer_id,
        customer_snapshot: payload.customer,
        shipping_address: payload.shipping_address,
        billing_address: payload.billing_address,
        use_same_billing_address: payload.use_same_billing_address,
        payment_reference: payload.payment_reference,
        payment_method: payload.payment_method,
        notes: payload.notes,
    };

    let order = state.services.checkout.create_order_from_cart(input).await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// GET /orders/{id} — order with reconciled totals.
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ReconciledOrderResponse> {
    let reconciled = state.services.reconciliation.get_reconciled_order(id).await?;

    Ok(Json(ApiResponse::success(ReconciledOrderResponse {
        order: reconciled.order.into(),
        total_ht: reconciled.total_ht,
        total_ttc: reconciled.total_ttc,
    })))
}

/// GET /orders/{id}/items — line items in display order.
pub async fn get_order_items(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<OrderItemResponse>> {
    state
        .services
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("order not found".to_string()))?;

    let items = state.services.order_items.get_by_order_id(id).await?;

    Ok(Json(ApiResponse::success(
        items.into_iter().map(Into::into).collect(),
    )))
}

/// PUT /orders/{id}/delivery — toggle the delivered flag.
pub async fn update_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .update_delivery_status(id, payload.delivered)
        .await?;

    Ok(Json(ApiResponse::success(order.into())))
}

/// DELETE /orders/{id} — administrative deletion, cascading to items and
/// addresses.
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let deleted = state.services.orders.delete_order(id).await?;
    if !deleted {
        return Err(ServiceError::NotFound("order not found".to_string()));
    }

    Ok(Json(ApiResponse::success(json!({ "deleted": true }))))
}
