//! Order placement through the storefront API.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use tram_sach_integration_tests::{TestDb, WebhookReceiver, spawn_storefront};

fn customer() -> Value {
    json!({
        "customer_name": "Trần Thị Bình",
        "customer_phone": "0901234567",
        "customer_address": "12 Lý Thường Kiệt, Hà Nội",
    })
}

#[tokio::test]
async fn test_checkout_places_order_and_takes_stock() {
    let db = TestDb::new().await;
    let book = db.seed_book("Nhà giả kim", 79_000, 5).await;
    let server = spawn_storefront(&db, None).await;

    server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": book.id, "quantity": 2 }))
        .send()
        .await
        .unwrap();

    let resp = server
        .client
        .post(server.url("/api/checkout"))
        .json(&customer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let receipt: Value = resp.json().await.unwrap();
    assert_eq!(receipt["total"], 158_000);
    assert_eq!(receipt["customer_name"], "Trần Thị Bình");
    let order_number = receipt["order_number"].as_str().unwrap().to_owned();
    assert!(order_number.starts_with("ORD-"));

    assert_eq!(db.stock_of(&book).await, 3);

    let cart: Value = server
        .client
        .get(server.url("/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"], json!([]));

    let resp = server
        .new_client()
        .get(server.url(&format!("/api/checkout/order/{order_number}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(order, receipt);

    let resp = server
        .new_client()
        .get(server.url("/api/checkout/order/ORD-20240101-ZZZZZZ"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_receipt_lookup_hides_cart_session_and_contact() {
    let db = TestDb::new().await;
    let first = db.seed_book("Số đỏ", 60_000, 5).await;
    let second = db.seed_book("Dế Mèn phiêu lưu ký", 10_000, 5).await;
    let server = spawn_storefront(&db, None).await;

    let cart: Value = server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": first.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let old_session = cart["session_id"].as_str().unwrap().to_owned();

    let receipt: Value = server
        .client
        .post(server.url("/api/checkout"))
        .json(&customer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_number = receipt["order_number"].as_str().unwrap();

    // The shopper keeps browsing with the same cookie
    let next: Value = server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": second.id, "quantity": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let new_session = next["session_id"].as_str().unwrap();
    assert_ne!(new_session, old_session);

    let stranger = server.new_client();
    let order: Value = stranger
        .get(server.url(&format!("/api/checkout/order/{order_number}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let fields = order.as_object().unwrap();
    for hidden in ["session_id", "user_id", "customer_phone", "customer_address", "items"] {
        assert!(!fields.contains_key(hidden), "receipt exposes {hidden}");
    }
    assert_eq!(order["customer_name"], "Trần Thị Bình");

    let old_cart: Value = stranger
        .get(server.url(&format!("/api/cart?session_id={old_session}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(old_cart["items"], json!([]));
}

#[tokio::test]
async fn test_checkout_with_unknown_user_is_rejected() {
    let db = TestDb::new().await;
    let book = db.seed_book("Vợ nhặt", 30_000, 4).await;
    let server = spawn_storefront(&db, None).await;

    server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": book.id }))
        .send()
        .await
        .unwrap();

    let mut body = customer();
    body["user_id"] = json!(9999);
    let resp = server
        .client
        .post(server.url("/api/checkout"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(error["code"], "validation_error");
    assert_eq!(db.stock_of(&book).await, 4);
}

#[tokio::test]
async fn test_checkout_without_cart_is_empty_cart() {
    let db = TestDb::new().await;
    let server = spawn_storefront(&db, None).await;

    let resp = server
        .client
        .post(server.url("/api/checkout"))
        .json(&customer())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "empty_cart");
}

#[tokio::test]
async fn test_checkout_short_stock_changes_nothing() {
    let db = TestDb::new().await;
    let plenty = db.seed_book("Truyện Kiều", 45_000, 10).await;
    let scarce = db.seed_book("Tắt đèn", 40_000, 2).await;
    let server = spawn_storefront(&db, None).await;

    for (book, quantity) in [(&plenty, 3), (&scarce, 2)] {
        server
            .client
            .post(server.url("/api/cart/add?session_id=short-stock"))
            .json(&json!({ "book_id": book.id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
    }

    // Someone else buys one copy of the scarce book first
    sqlx::query("UPDATE books SET stock = 1 WHERE id = ?")
        .bind(scarce.id)
        .execute(&db.pool)
        .await
        .unwrap();

    let mut body = customer();
    body["session_id"] = json!("short-stock");
    let resp = server
        .client
        .post(server.url("/api/checkout"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(error["code"], "insufficient_stock");
    assert!(error["message"].as_str().unwrap().contains("Tắt đèn"));

    assert_eq!(db.stock_of(&plenty).await, 10);
    assert_eq!(db.stock_of(&scarce).await, 1);

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);

    let cart: Value = server
        .client
        .get(server.url("/api/cart?session_id=short-stock"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let db = TestDb::new().await;
    let book = db.seed_book("Bản in cuối cùng", 99_000, 1).await;
    let server = spawn_storefront(&db, None).await;

    let sessions = ["race-a", "race-b", "race-c", "race-d"];
    for session in sessions {
        server
            .client
            .post(server.url(&format!("/api/cart/add?session_id={session}")))
            .json(&json!({ "book_id": book.id }))
            .send()
            .await
            .unwrap();
    }

    let attempts = sessions.map(|session| {
        let client = server.new_client();
        let url = server.url("/api/checkout");
        let mut body = customer();
        body["session_id"] = json!(session);
        tokio::spawn(async move { client.post(url).json(&body).send().await.unwrap().status() })
    });

    let mut created = 0;
    for attempt in attempts {
        let status = attempt.await.unwrap();
        if status == StatusCode::CREATED {
            created += 1;
        } else {
            assert_eq!(status, StatusCode::CONFLICT);
        }
    }

    assert_eq!(created, 1);
    assert_eq!(db.stock_of(&book).await, 0);
}

#[tokio::test]
async fn test_checkout_announces_new_stock() {
    let db = TestDb::new().await;
    let book = db.seed_book("Đất rừng phương Nam", 92_000, 4).await;
    let mut receiver = WebhookReceiver::start().await;
    let server = spawn_storefront(&db, Some(receiver.config())).await;

    server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": book.id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    let resp = server
        .client
        .post(server.url("/api/checkout"))
        .json(&customer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let event = receiver.next_event().await.unwrap();
    assert!(event.signature_valid);
    assert_eq!(event.action(), Some("update"));
    assert_eq!(event.event_type.as_deref(), Some("product.upsert"));
    assert_eq!(event.product().unwrap()["stock"], 1);
}

#[tokio::test]
async fn test_logged_in_checkout_records_customer() {
    let db = TestDb::new().await;
    let book = db.seed_book("Chí Phèo", 35_000, 5).await;
    let user = db.seed_customer("binh@example.vn").await;
    let server = spawn_storefront(&db, None).await;

    server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": book.id }))
        .send()
        .await
        .unwrap();

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({
            "email": "binh@example.vn",
            "password": tram_sach_integration_tests::TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Logging in keeps the cart
    let resp = server
        .client
        .post(server.url("/api/checkout"))
        .json(&customer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let orders: Vec<Value> = server
        .client
        .get(server.url("/api/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["user_id"], json!(user.id));
}
