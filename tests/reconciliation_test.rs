mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, TimeZone, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};
use serde_json::json;

use common::{body_json, decimal_field, TestApp};
use ordena_api::entities::order;

async fn create_order(app: &TestApp, cart: serde_json::Value) -> i64 {
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "cart": cart,
                "customer_id": 7,
                "payment_method": "card"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn create_credit_note(app: &TestApp, order_id: i64, ht: f64, ttc: f64) {
    let response = app
        .request(
            Method::POST,
            "/api/v1/credit-notes",
            Some(json!({
                "order_id": order_id,
                "customer_id": 7,
                "reason": "refund",
                "payment_method": "card",
                "items": [{
                    "product_id": 1,
                    "product_name": "Widget",
                    "quantity": 1,
                    "unit_price_ht": ht,
                    "unit_price_ttc": ttc,
                    "total_price_ht": ht,
                    "total_price_ttc": ttc
                }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn item_sums_override_drifted_header_totals() {
    let app = TestApp::new().await;

    // Cart totals (written to the header) disagree with the line items; the
    // reconciled read must trust the items.
    let order_id = create_order(
        &app,
        json!({
            "items": [{
                "product_id": 1,
                "product_name": "Widget",
                "quantity": 2,
                "unit_price_ht": 10,
                "unit_price_ttc": 12.1,
                "total_price_ht": 20,
                "total_price_ttc": 24.2
            }],
            "subtotal": 99,
            "total": 120
        }),
    )
    .await;

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_ht"]), dec!(20));
    assert_eq!(decimal_field(&body["data"]["total_ttc"]), dec!(24.2));
}

#[tokio::test]
async fn stored_line_totals_are_used_verbatim() {
    let app = TestApp::new().await;

    // quantity × unit price would give 30, but the stored line total of 25
    // is what reconciliation must report.
    let order_id = create_order(
        &app,
        json!({
            "items": [{
                "product_id": 1,
                "product_name": "Widget",
                "quantity": 3,
                "unit_price_ht": 10,
                "unit_price_ttc": 12,
                "total_price_ht": 25,
                "total_price_ttc": 30
            }],
            "subtotal": 25,
            "total": 30
        }),
    )
    .await;

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_ht"]), dec!(25));
}

#[tokio::test]
async fn statistics_subtract_credit_notes_from_orders() {
    let app = TestApp::new().await;

    let order_id = create_order(
        &app,
        json!({
            "items": [{
                "product_id": 1,
                "product_name": "Widget",
                "quantity": 1,
                "unit_price_ht": 100,
                "unit_price_ttc": 120,
                "total_price_ht": 100,
                "total_price_ttc": 120
            }],
            "subtotal": 100,
            "total": 120
        }),
    )
    .await;
    create_credit_note(&app, order_id, 30.0, 36.0).await;

    let year = Utc::now().year();
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/analytics/statistics?year={}", year),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_amount_ht"]), dec!(70));
    assert_eq!(decimal_field(&body["data"]["total_amount_ttc"]), dec!(84));
}

#[tokio::test]
async fn net_revenue_is_floored_at_zero() {
    let app = TestApp::new().await;

    let order_id = create_order(
        &app,
        json!({
            "items": [{
                "product_id": 1,
                "product_name": "Widget",
                "quantity": 1,
                "unit_price_ht": 20,
                "unit_price_ttc": 24.2,
                "total_price_ht": 20,
                "total_price_ttc": 24.2
            }],
            "subtotal": 20,
            "total": 24.2
        }),
    )
    .await;
    // Refund more than was ever ordered
    create_credit_note(&app, order_id, 50.0, 60.0).await;

    let year = Utc::now().year();
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/analytics/statistics?year={}", year),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_amount_ht"]), dec!(0));
    assert_eq!(decimal_field(&body["data"]["total_amount_ttc"]), dec!(0));
}

#[tokio::test]
async fn statistics_filtered_by_customer() {
    let app = TestApp::new().await;

    create_order(
        &app,
        json!({
            "items": [{
                "product_id": 1,
                "product_name": "Widget",
                "quantity": 1,
                "unit_price_ht": 100,
                "unit_price_ttc": 120,
                "total_price_ht": 100,
                "total_price_ttc": 120
            }],
            "subtotal": 100,
            "total": 120
        }),
    )
    .await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/analytics/statistics?customer_id=999",
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_amount_ht"]), dec!(0));

    let response = app
        .request(
            Method::GET,
            "/api/v1/analytics/statistics?customer_id=7",
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_amount_ht"]), dec!(100));
}

async fn insert_order_created_at(app: &TestApp, created_at: chrono::DateTime<Utc>) -> i64 {
    let active = order::ActiveModel {
        id: NotSet,
        customer_id: Set(Some(7)),
        customer_snapshot: Set(None),
        total_amount_ht: Set(dec!(20)),
        total_amount_ttc: Set(dec!(24.2)),
        payment_method: Set("card".to_string()),
        notes: Set(None),
        delivered: Set(false),
        payment_reference: Set(None),
        created_at: Set(created_at),
        updated_at: Set(Some(created_at)),
    };
    active.insert(&*app.state.db).await.unwrap().id
}

#[tokio::test]
async fn year_export_uses_a_half_open_utc_window() {
    let app = TestApp::new().await;

    let in_2025 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let in_2024 = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
    let exported_id = insert_order_created_at(&app, in_2025).await;
    insert_order_created_at(&app, in_2024).await;

    let response = app
        .request(Method::GET, "/api/v1/analytics/exports/2025", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let orders = body["data"]["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order"]["id"].as_i64().unwrap(), exported_id);
    assert_eq!(decimal_field(&orders[0]["total_ht"]), dec!(20));
    assert_eq!(body["data"]["credit_notes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn export_records_are_denormalized_with_items_and_addresses() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "cart": {
                    "items": [{
                        "product_id": 1,
                        "product_name": "Widget",
                        "quantity": 2,
                        "unit_price_ht": 10,
                        "unit_price_ttc": 12.1,
                        "total_price_ht": 20,
                        "total_price_ttc": 24.2
                    }],
                    "subtotal": 20,
                    "total": 24.2
                },
                "customer_id": 7,
                "payment_method": "card",
                "shipping_address": {"street": "1 rue de la Paix", "city": "Paris"}
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let year = Utc::now().year();
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/analytics/exports/{}", year),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let orders = body["data"]["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["items"].as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["addresses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn export_rejects_years_before_2025() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/analytics/exports/2024", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
