use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::{credit_note, credit_note_item},
    errors::ServiceError,
    services::credit_notes::NewCreditNote,
    ApiResponse, ApiResult, AppState,
};

use super::LineItemDto;

// Credit note DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCreditNoteRequest {
    pub order_id: i64,
    pub customer_id: Option<i64>,
    /// Header totals; overridden by the item sums on reconciled reads when
    /// items are present
    #[serde(default)]
    pub total_amount_ht: Decimal,
    #[serde(default)]
    pub total_amount_ttc: Decimal,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
    pub description: Option<String>,
    pub issue_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCreditNoteStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditNoteResponse {
    pub id: i64,
    pub order_id: i64,
    pub customer_id: Option<i64>,
    pub total_amount_ht: Decimal,
    pub total_amount_ttc: Decimal,
    pub reason: String,
    pub description: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub payment_method: String,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<credit_note::Model> for CreditNoteResponse {
    fn from(model: credit_note::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            customer_id: model.customer_id,
            total_amount_ht: model.total_amount_ht,
            total_amount_ttc: model.total_amount_ttc,
            reason: model.reason,
            description: model.description,
            issue_date: model.issue_date,
            payment_method: model.payment_method,
            notes: model.notes,
            status: model.status.as_str().to_string(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Credit note plus its reconciled totals.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciledCreditNoteResponse {
    pub credit_note: CreditNoteResponse,
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditNoteItemResponse {
    pub id: i64,
    pub credit_note_id: i64,
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

impl From<credit_note_item::Model> for CreditNoteItemResponse {
    fn from(model: credit_note_item::Model) -> Self {
        Self {
            id: model.id,
            credit_note_id: model.credit_note_id,
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

/// POST /credit-notes — create a credit note, atomically with its line items
/// when any are given.
pub async fn create_credit_note(
    State(state): State<AppState>,
    Json(payload): Json<CreateCreditNoteRequest>,
) -> ApiResult<CreditNoteResponse> {
    payload.validate().map_err(ServiceError::from)?;

    let header = NewCreditNote {
        order_id: payload.order_id,
        customer_id: payload.customer_id,
        total_amount_ht: payload.total_amount_ht,
        total_amount_ttc: payload.total_amount_ttc,
        reason: payload.reason,
        description: payload.description,
        issue_date: payload.issue_date,
        payment_method: payload.payment_method,
        notes: payload.notes,
    };
    let items = payload.items.into_iter().map(Into::into).collect();

    let credit_note = state
        .services
        .credit_notes
        .create_credit_note(header, items)
        .await?;

    Ok(Json(ApiResponse::success(credit_note.into())))
}

/// GET /credit-notes/{id} — credit note with reconciled totals.
pub async fn get_credit_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ReconciledCreditNoteResponse> {
    let reconciled = state
        .services
        .reconciliation
        .get_reconciled_credit_note(id)
        .await?;

    Ok(Json(ApiResponse::success(ReconciledCreditNoteResponse {
        credit_note: reconciled.credit_note.into(),
        total_ht: reconciled.total_ht,
        total_ttc: reconciled.total_ttc,
    })))
}

/// GET /credit-notes/{id}/items — line items in display order.
pub async fn get_credit_note_items(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<CreditNoteItemResponse>> {
    state
        .services
        .credit_notes
        .get_credit_note(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("credit note not found".to_string()))?;

    let items = state.services.credit_notes.get_items(id).await?;

    Ok(Json(ApiResponse::success(
        items.into_iter().map(Into::into).collect(),
    )))
}

/// PUT /credit-notes/{id}/status — pending → refunded transition.
pub async fn update_credit_note_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCreditNoteStatusRequest>,
) -> ApiResult<CreditNoteResponse> {
    let credit_note = state
        .services
        .credit_notes
        .update_status(id, &payload.status)
        .await?;

    Ok(Json(ApiResponse::success(credit_note.into())))
}
