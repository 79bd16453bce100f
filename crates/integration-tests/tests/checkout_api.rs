//! Integration tests for checkout, order lookup and the Maya webhook.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

use stride_integration_tests::{
    MayaMode, MockMaya, TestServer, catalog, checkout_body, decimal,
};

#[tokio::test]
async fn test_cod_checkout_stores_priced_order() {
    let catalog = catalog();
    let server = TestServer::spawn(catalog.seed).await;

    let body = checkout_body(
        Uuid::new_v4(),
        catalog.sneaker,
        Some("42"),
        "Cebu City",
        Some("SAVE10"),
        "cod",
    );
    let (status, placed) = server.post("/api/checkout", &body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["replayed"], false);
    assert!(placed.get("payment").is_none());
    let order = &placed["order"];
    assert_eq!(decimal(&order["total"]), Decimal::from(920));
    assert_eq!(order["promo_code"], "SAVE10");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_method"], "cod");

    let (status, fetched) = server
        .get(&format!("/api/orders/{}", order["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], order["id"]);
    assert_eq!(decimal(&fetched["items"][0]["unit_price"]), Decimal::from(800));
    assert_eq!(server.store.promo_times_used("save10").await, Some(1));
}

#[tokio::test]
async fn test_resubmitted_checkout_is_replayed() {
    let catalog = catalog();
    let server = TestServer::spawn(catalog.seed).await;
    let body = checkout_body(
        Uuid::new_v4(),
        catalog.runner,
        None,
        "Makati",
        Some("LAST5"),
        "cod",
    );

    let (first_status, first) = server.post("/api/checkout", &body).await;
    let (second_status, second) = server.post("/api/checkout", &body).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second["replayed"], true);
    assert_eq!(first["order"]["id"], second["order"]["id"]);
    assert_eq!(server.store.orders().await.len(), 1);
    assert_eq!(server.store.promo_times_used("LAST5").await, Some(1));
}

#[tokio::test]
async fn test_concurrent_redemptions_respect_usage_limit() {
    let catalog = catalog();
    let server = std::sync::Arc::new(TestServer::spawn(catalog.seed).await);

    let attempts: Vec<_> = (0..12)
        .map(|_| {
            let server = server.clone();
            let body = checkout_body(
                Uuid::new_v4(),
                catalog.runner,
                None,
                "Manila",
                Some("LAST5"),
                "cod",
            );
            tokio::spawn(async move { server.post("/api/checkout", &body).await.0 })
        })
        .collect();

    let mut placed = 0;
    for attempt in attempts {
        let status = attempt.await.unwrap();
        if status == StatusCode::CREATED {
            placed += 1;
        } else {
            // Rejected either at validation or at redemption
            assert!(
                status == StatusCode::CONFLICT || status == StatusCode::BAD_REQUEST,
                "unexpected status {status}"
            );
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(server.store.promo_times_used("LAST5").await, Some(5));
    assert_eq!(server.store.orders().await.len(), 5);
}

#[tokio::test]
async fn test_rejected_promo_blocks_checkout() {
    let catalog = catalog();
    let server = TestServer::spawn(catalog.seed).await;

    let body = checkout_body(
        Uuid::new_v4(),
        catalog.runner,
        None,
        "Manila",
        Some("BOGUS"),
        "cod",
    );
    let (status, error) = server.post("/api/checkout", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Invalid or expired promo code");
    assert!(server.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_maya_checkout_returns_redirect() {
    let catalog = catalog();
    let maya = MockMaya::spawn(MayaMode::Accept).await;
    let server = TestServer::spawn_with(catalog.seed, Some(&maya)).await;

    let body = checkout_body(Uuid::new_v4(), catalog.runner, None, "Davao", None, "maya");
    let (status, placed) = server.post("/api/checkout", &body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["payment"]["checkout_id"], "chk-1");
    assert_eq!(placed["payment"]["fallback"], false);
    assert_eq!(maya.calls(), 1);

    let request = maya.last_request().await.unwrap();
    assert_eq!(
        request["requestReferenceNumber"],
        placed["order"]["id"].clone()
    );
    // 2500 + 200 provincial shipping
    assert_eq!(request["totalAmount"]["value"].as_f64(), Some(2700.0));
    assert!(
        request["redirectUrl"]["success"]
            .as_str()
            .unwrap()
            .starts_with("http://shop.test/")
    );
}

#[tokio::test]
async fn test_maya_unavailable_falls_back_to_payment_link() {
    let catalog = catalog();
    let maya = MockMaya::spawn(MayaMode::EndpointUnavailable).await;
    let server = TestServer::spawn_with(catalog.seed, Some(&maya)).await;

    let body = checkout_body(Uuid::new_v4(), catalog.runner, None, "Davao", None, "maya");
    let (status, placed) = server.post("/api/checkout", &body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["payment"]["fallback"], true);
    assert!(placed["payment"]["checkout_id"].is_null());
    let link = placed["payment"]["redirect_url"].as_str().unwrap();
    assert!(link.starts_with("https://paymaya.me/stride?"));
    assert!(link.contains("amount=2700.00"));
}

#[tokio::test]
async fn test_maya_checkout_requires_configuration() {
    let catalog = catalog();
    let server = TestServer::spawn(catalog.seed).await;

    let body = checkout_body(Uuid::new_v4(), catalog.runner, None, "Davao", None, "maya");
    let (status, _) = server.post("/api/checkout", &body).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(server.store.orders().await.is_empty());
}

// ============================================================================
// Webhook
// ============================================================================

async fn place_cod_order(server: &TestServer, product: stride_core::ProductId) -> Value {
    let body = checkout_body(Uuid::new_v4(), product, None, "Manila", None, "cod");
    let (status, placed) = server.post("/api/checkout", &body).await;
    assert_eq!(status, StatusCode::CREATED);
    placed["order"].clone()
}

#[tokio::test]
async fn test_webhook_marks_order_paid() {
    let catalog = catalog();
    let server = TestServer::spawn(catalog.seed).await;
    let order = place_cod_order(&server, catalog.runner).await;

    let (status, body) = server
        .post(
            "/webhooks/maya",
            &json!({
                "id": "chk-99",
                "status": "COMPLETED",
                "paymentStatus": "PAYMENT_SUCCESS",
                "requestReferenceNumber": order["id"],
                "receipt": { "transactionId": "txn-1" },
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Webhook processed successfully");

    let (_, updated) = server
        .get(&format!("/api/orders/{}", order["id"].as_str().unwrap()))
        .await;
    assert_eq!(updated["status"], "paid");
    assert_eq!(updated["payment_status"], "paid");
    assert_eq!(updated["payment_reference"], "chk-99");
    assert_eq!(updated["payment_receipt"]["transactionId"], "txn-1");
}

#[tokio::test]
async fn test_late_webhook_keeps_paid_order() {
    let catalog = catalog();
    let server = TestServer::spawn(catalog.seed).await;
    let order = place_cod_order(&server, catalog.runner).await;

    let (status, _) = server
        .post(
            "/webhooks/maya",
            &json!({
                "id": "chk-7",
                "paymentStatus": "PAYMENT_SUCCESS",
                "requestReferenceNumber": order["id"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    for late in ["PENDING_PAYMENT", "PAYMENT_CANCELLED", "PAYMENT_FAILED"] {
        let (status, _) = server
            .post(
                "/webhooks/maya",
                &json!({ "paymentStatus": late, "requestReferenceNumber": order["id"] }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, current) = server
        .get(&format!("/api/orders/{}", order["id"].as_str().unwrap()))
        .await;
    assert_eq!(current["status"], "paid");
    assert_eq!(current["payment_status"], "paid");
    assert_eq!(current["payment_reference"], "chk-7");
}

#[tokio::test]
async fn test_webhook_failure_and_bad_requests() {
    let catalog = catalog();
    let server = TestServer::spawn(catalog.seed).await;
    let order = place_cod_order(&server, catalog.runner).await;

    let (status, _) = server
        .post(
            "/webhooks/maya",
            &json!({ "paymentStatus": "PAYMENT_FAILED", "requestReferenceNumber": order["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, updated) = server
        .get(&format!("/api/orders/{}", order["id"].as_str().unwrap()))
        .await;
    assert_eq!(updated["status"], "failed");
    assert_eq!(updated["payment_status"], "failed");

    let (status, body) = server
        .post("/webhooks/maya", &json!({ "status": "COMPLETED" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing orderId");

    let (status, _) = server
        .post(
            "/webhooks/maya",
            &json!({ "status": "COMPLETED", "requestReferenceNumber": "not-a-uuid" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            "/webhooks/maya",
            &json!({ "status": "COMPLETED", "requestReferenceNumber": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
