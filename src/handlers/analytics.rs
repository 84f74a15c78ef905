use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    services::reconciliation::{StatisticsFilter, YearExportData},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatisticsQuery {
    pub customer_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub total_amount_ht: Decimal,
    pub total_amount_ttc: Decimal,
}

/// GET /analytics/statistics — net revenue (orders minus credit notes,
/// floored at zero) for the filtered period.
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<StatisticsResponse> {
    let filter = StatisticsFilter {
        customer_id: query.customer_id,
        start_date: query.start_date,
        end_date: query.end_date,
        year: query.year,
    };

    let stats = state
        .services
        .reconciliation
        .get_order_statistics(&filter)
        .await?;

    Ok(Json(ApiResponse::success(StatisticsResponse {
        total_amount_ht: stats.total_amount_ht,
        total_amount_ttc: stats.total_amount_ttc,
    })))
}

/// GET /analytics/exports/{year} — denormalized, reconciled year export.
pub async fn get_year_export(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<YearExportData> {
    let export = state
        .services
        .reconciliation
        .get_year_export_data(year)
        .await?;

    Ok(Json(ApiResponse::success(export)))
}
