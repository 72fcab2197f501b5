//! Checkout: delivery slots, placing orders from the cart, order privacy.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use furnish_integration_tests::{TestServer, cart_lines, money, product_ids};

async fn create_delivery(server: &TestServer, client: &Client) -> i64 {
    let resp = client
        .post(server.url("/api/deliveries"))
        .json(&json!({
            "address": "1 Fjord Street",
            "type_delivery": 1,
            "datetime_from": "2030-05-01T09:00:00Z",
            "datetime_to": "2030-05-01T13:00:00Z",
            "elevator": true,
        }))
        .send()
        .await
        .expect("create delivery");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("delivery json");
    body["id"].as_i64().expect("delivery id")
}

async fn add(server: &TestServer, client: &Client, product: i64, quantity: i64) {
    let resp = client
        .post(server.url("/api/carts/items"))
        .json(&json!({"product": product, "quantity": quantity}))
        .send()
        .await
        .expect("add item");
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_place_order_from_cart() {
    let server = TestServer::spawn().await;
    let ann = server.logged_in(1).await;
    add(&server, &ann, 1, 2).await;
    add(&server, &ann, 5, 1).await;
    let delivery = create_delivery(&server, &ann).await;

    let resp = ann
        .post(server.url("/api/orders"))
        .json(&json!({
            "delivery": delivery,
            "phone": "+7 (912) 3456789",
            "comment": "  Ring twice  ",
        }))
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.expect("order json");

    assert_eq!(money(&order["total_cost"]), Some(Decimal::from(250)));
    assert_eq!(order["user"], 1);
    assert_eq!(order["paid"], false);
    assert_eq!(order["status"], "created");
    assert_eq!(order["comment"], "Ring twice");
    assert_eq!(order["products"].as_array().map(Vec::len), Some(2));

    let cart: Value = ann
        .get(server.url("/api/carts/items"))
        .send()
        .await
        .expect("cart")
        .json()
        .await
        .expect("cart json");
    assert!(cart_lines(&cart).is_empty());

    let orders: Value = ann
        .get(server.url("/api/orders"))
        .send()
        .await
        .expect("my orders")
        .json()
        .await
        .expect("orders json");
    assert_eq!(product_ids(&orders), vec![order["id"].as_i64().unwrap_or_default()]);

    let popular: Value = server
        .visitor()
        .get(server.url("/api/products/popular"))
        .send()
        .await
        .expect("popular")
        .json()
        .await
        .expect("popular json");
    assert_eq!(product_ids(&popular), vec![1, 5]);
}

#[tokio::test]
async fn test_order_rejections() {
    let server = TestServer::spawn().await;
    let anonymous = server.visitor();
    let delivery = create_delivery(&server, &anonymous).await;
    add(&server, &anonymous, 1, 1).await;

    let body = json!({"delivery": delivery, "phone": "89123456789"});
    let resp = anonymous
        .post(server.url("/api/orders"))
        .json(&body)
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let bob = server.logged_in(2).await;
    let resp = bob
        .post(server.url("/api/orders"))
        .json(&body)
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "empty cart");

    add(&server, &bob, 1, 1).await;
    let resp = bob
        .post(server.url("/api/orders"))
        .json(&json!({"delivery": delivery, "phone": "call me"}))
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = resp.json().await.expect("error json");
    assert_eq!(error["field"], "phone");

    let resp = bob
        .post(server.url("/api/orders"))
        .json(&json!({"delivery": 999, "phone": "89123456789"}))
        .send()
        .await
        .expect("place order");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_orders_are_private() {
    let server = TestServer::spawn().await;
    let ann = server.logged_in(1).await;
    add(&server, &ann, 7, 1).await;
    let delivery = create_delivery(&server, &ann).await;

    let order: Value = ann
        .post(server.url("/api/orders"))
        .json(&json!({"delivery": delivery, "phone": "89123456789"}))
        .send()
        .await
        .expect("place order")
        .json()
        .await
        .expect("order json");
    let path = format!("/api/orders/{}", order["id"]);

    let resp = ann.get(server.url(&path)).send().await.expect("own order");
    assert_eq!(resp.status(), StatusCode::OK);

    let bob = server.logged_in(2).await;
    let resp = bob.get(server.url(&path)).send().await.expect("other order");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = server
        .visitor()
        .get(server.url(&path))
        .send()
        .await
        .expect("anonymous order");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delivery_window_must_be_ordered() {
    let server = TestServer::spawn().await;
    let client = server.visitor();

    let resp = client
        .post(server.url("/api/deliveries"))
        .json(&json!({
            "address": "1 Fjord Street",
            "type_delivery": 2,
            "datetime_from": "2030-05-01T13:00:00Z",
            "datetime_to": "2030-05-01T09:00:00Z",
        }))
        .send()
        .await
        .expect("create delivery");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = resp.json().await.expect("error json");
    assert_eq!(error["field"], "datetime_to");

    let types: Value = client
        .get(server.url("/api/delivery_types"))
        .send()
        .await
        .expect("delivery types")
        .json()
        .await
        .expect("types json");
    assert_eq!(product_ids(&types), vec![1, 2]);
}
