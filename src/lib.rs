//! Ordena API Library
//!
//! Order transaction & financial reconciliation engine: atomic cart-to-order
//! checkout, credit notes, and net-revenue statistics.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod money;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// API routes
pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/orders",
            axum::routing::post(handlers::orders::create_order),
        )
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route("/orders/{id}/items", get(handlers::orders::get_order_items))
        .route(
            "/orders/{id}/delivery",
            axum::routing::put(handlers::orders::update_delivery_status),
        )
        .route(
            "/orders/{id}",
            axum::routing::delete(handlers::orders::delete_order),
        );

    let credit_notes = Router::new()
        .route(
            "/credit-notes",
            axum::routing::post(handlers::credit_notes::create_credit_note),
        )
        .route(
            "/credit-notes/{id}",
            get(handlers::credit_notes::get_credit_note),
        )
        .route(
            "/credit-notes/{id}/items",
            get(handlers::credit_notes::get_credit_note_items),
        )
        .route(
            "/credit-notes/{id}/status",
            axum::routing::put(handlers::credit_notes::update_credit_note_status),
        );

    let analytics = Router::new()
        .route(
            "/analytics/statistics",
            get(handlers::analytics::get_statistics),
        )
        .route(
            "/analytics/exports/{year}",
            get(handlers::analytics::get_year_export),
        );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(orders)
        .merge(credit_notes)
        .merge(analytics)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "ordena-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
