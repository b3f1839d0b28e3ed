//! Cart sessions and stock checks through the storefront API.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use tram_sach_integration_tests::{TestDb, spawn_storefront};

#[tokio::test]
async fn test_cookie_session_cart_merges_lines() {
    let db = TestDb::new().await;
    let book = db.seed_book("Mắt biếc", 85_000, 5).await;
    let server = spawn_storefront(&db, None).await;

    for quantity in [1, 2] {
        let resp = server
            .client
            .post(server.url("/api/cart/add"))
            .json(&json!({ "book_id": book.id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let cart: Value = server
        .client
        .get(server.url("/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 3);
    assert_eq!(cart["item_count"], 3);
    assert_eq!(cart["total"], 255_000);
}

#[tokio::test]
async fn test_missing_session_gets_empty_cart() {
    let db = TestDb::new().await;
    let server = spawn_storefront(&db, None).await;

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
    assert_eq!(cart["total"], 0);
    assert!(cart["id"].is_null());
}

#[tokio::test]
async fn test_explicit_session_id_is_used() {
    let db = TestDb::new().await;
    let book = db.seed_book("Tôi thấy hoa vàng trên cỏ xanh", 110_000, 3).await;
    let server = spawn_storefront(&db, None).await;

    let resp = server
        .client
        .post(server.url("/api/cart/add?session_id=app-7f3e"))
        .json(&json!({ "book_id": book.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // A different client naming the same session sees the same cart
    let cart: Value = server
        .new_client()
        .get(server.url("/api/cart?session_id=app-7f3e"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["session_id"], "app-7f3e");
    assert_eq!(cart["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_add_beyond_stock_is_rejected() {
    let db = TestDb::new().await;
    let book = db.seed_book("Cho tôi xin một vé đi tuổi thơ", 70_000, 2).await;
    let server = spawn_storefront(&db, None).await;

    let resp = server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": book.id, "quantity": 3 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "insufficient_stock");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Cho tôi xin một vé đi tuổi thơ")
    );
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let db = TestDb::new().await;
    let book = db.seed_book("Dế Mèn phiêu lưu ký", 50_000, 10).await;
    let server = spawn_storefront(&db, None).await;

    let cart: Value = server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": book.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let item_id = cart["items"][0]["id"].as_i64().unwrap();

    let cart: Value = server
        .client
        .put(server.url(&format!("/api/cart/item/{item_id}")))
        .json(&json!({ "quantity": 4 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"][0]["quantity"], 4);
    assert_eq!(cart["total"], 200_000);

    let resp = server
        .client
        .put(server.url(&format!("/api/cart/item/{item_id}")))
        .json(&json!({ "quantity": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let cart: Value = server
        .client
        .delete(server.url(&format!("/api/cart/item/{item_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
async fn test_cannot_touch_another_sessions_line() {
    let db = TestDb::new().await;
    let book = db.seed_book("Số đỏ", 60_000, 10).await;
    let server = spawn_storefront(&db, None).await;

    let cart: Value = server
        .client
        .post(server.url("/api/cart/add"))
        .json(&json!({ "book_id": book.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let item_id = cart["items"][0]["id"].as_i64().unwrap();

    let stranger = server.new_client();
    let resp = stranger
        .delete(server.url(&format!("/api/cart/item/{item_id}?session_id=someone-else")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let cart: Value = server
        .client
        .get(server.url("/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"][0]["quantity"], 1);
}
