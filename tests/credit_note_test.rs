mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use serde_json::json;

use common::{body_json, decimal_field, TestApp};
use ordena_api::entities::{credit_note, credit_note_item};

async fn seed_order(app: &TestApp) -> i64 {
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
                "payment_method": "card"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn credit_note_count(app: &TestApp) -> usize {
    credit_note::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap()
        .len()
}

async fn credit_note_item_count(app: &TestApp) -> usize {
    credit_note_item::Entity::find()
        .all(&*app.state.db)
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn item_totals_override_header_totals_on_reconciled_reads() {
    let app = TestApp::new().await;
    let order_id = seed_order(&app).await;

    // Header claims zero; the line carries the real refund amount
    let response = app
        .request(
            Method::POST,
            "/api/v1/credit-notes",
            Some(json!({
                "order_id": order_id,
                "customer_id": 7,
                "total_amount_ht": 0,
                "total_amount_ttc": 0,
                "reason": "damaged item",
                "payment_method": "card",
                "items": [{
                    "product_id": 1,
                    "product_name": "Widget",
                    "quantity": 1,
                    "unit_price_ht": 15,
                    "unit_price_ttc": 18,
                    "total_price_ht": 15,
                    "total_price_ttc": 18
                }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let credit_note_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/credit-notes/{}", credit_note_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_ht"]), dec!(15));
    assert_eq!(decimal_field(&body["data"]["total_ttc"]), dec!(18));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/credit-notes/{}/items", credit_note_id),
            None,
        )
        .await;
    let items = body_json(response).await;
    assert_eq!(items["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn credit_note_without_items_keeps_header_totals() {
    let app = TestApp::new().await;
    let order_id = seed_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/credit-notes",
            Some(json!({
                "order_id": order_id,
                "total_amount_ht": 10,
                "total_amount_ttc": 12,
                "reason": "commercial gesture",
                "payment_method": "card"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let credit_note_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/credit-notes/{}", credit_note_id),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(decimal_field(&body["data"]["total_ht"]), dec!(10));
    assert_eq!(decimal_field(&body["data"]["total_ttc"]), dec!(12));
    assert_eq!(credit_note_item_count(&app).await, 0);
}

#[tokio::test]
async fn blank_reason_is_rejected() {
    let app = TestApp::new().await;
    let order_id = seed_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/credit-notes",
            Some(json!({
                "order_id": order_id,
                "total_amount_ht": 10,
                "total_amount_ttc": 12,
                "reason": "",
                "payment_method": "card"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(credit_note_count(&app).await, 0);
}

#[tokio::test]
async fn invalid_line_rolls_back_header_and_items() {
    let app = TestApp::new().await;
    let order_id = seed_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/credit-notes",
            Some(json!({
                "order_id": order_id,
                "reason": "damaged item",
                "payment_method": "card",
                "items": [
                    {
                        "product_id": 1,
                        "product_name": "Widget",
                        "quantity": 1,
                        "unit_price_ht": 15,
                        "unit_price_ttc": 18,
                        "total_price_ht": 15,
                        "total_price_ttc": 18
                    },
                    {
                        "product_id": 2,
                        "product_name": "",
                        "quantity": 1,
                        "unit_price_ht": 5,
                        "unit_price_ttc": 6,
                        "total_price_ht": 5,
                        "total_price_ttc": 6
                    }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(credit_note_count(&app).await, 0);
    assert_eq!(credit_note_item_count(&app).await, 0);
}

#[tokio::test]
async fn unknown_status_is_rejected_and_row_untouched() {
    let app = TestApp::new().await;
    let order_id = seed_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/credit-notes",
            Some(json!({
                "order_id": order_id,
                "total_amount_ht": 10,
                "total_amount_ttc": 12,
                "reason": "damaged item",
                "payment_method": "card"
            })),
        )
        .await;
    let credit_note_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/credit-notes/{}/status", credit_note_id),
            Some(json!({"status": "shipped"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/credit-notes/{}", credit_note_id),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["credit_note"]["status"], json!("pending"));
}

#[tokio::test]
async fn refunded_is_a_terminal_state() {
    let app = TestApp::new().await;
    let order_id = seed_order(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/credit-notes",
            Some(json!({
                "order_id": order_id,
                "total_amount_ht": 10,
                "total_amount_ttc": 12,
                "reason": "damaged item",
                "payment_method": "card"
            })),
        )
        .await;
    let credit_note_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let status_uri = format!("/api/v1/credit-notes/{}/status", credit_note_id);

    let response = app
        .request(Method::PUT, &status_uri, Some(json!({"status": "refunded"})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("refunded"));

    // Re-applying the current status is an idempotent no-op
    let response = app
        .request(Method::PUT, &status_uri, Some(json!({"status": "refunded"})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Going back to pending is not a legal transition
    let response = app
        .request(Method::PUT, &status_uri, Some(json!({"status": "pending"})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_update_on_unknown_credit_note_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::PUT,
            "/api/v1/credit-notes/9999/status",
            Some(json!({"status": "refunded"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("credit note not found"));
}
