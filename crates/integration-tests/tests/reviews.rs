//! Reviews: one per user and product, editable by the author only.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use furnish_integration_tests::{TestServer, money};

#[tokio::test]
async fn test_review_lifecycle() {
    let server = TestServer::spawn().await;
    let ann = server.logged_in(1).await;
    let bob = server.logged_in(2).await;

    let resp = ann
        .post(server.url("/api/reviews"))
        .json(&json!({"product": 2, "rating": 5, "text": "Comfy"}))
        .send()
        .await
        .expect("create review");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let review: Value = resp.json().await.expect("review json");
    assert_eq!(review["user_id"], 1);
    assert_eq!(review["rating"], 5);
    let path = format!("/api/reviews/{}", review["id"]);

    let resp = ann
        .post(server.url("/api/reviews"))
        .json(&json!({"product": 2, "rating": 3}))
        .send()
        .await
        .expect("duplicate review");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = bob
        .post(server.url("/api/reviews"))
        .json(&json!({"product": 2, "rating": 4}))
        .send()
        .await
        .expect("second reviewer");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let product: Value = server
        .visitor()
        .get(server.url("/api/products/2"))
        .send()
        .await
        .expect("product")
        .json()
        .await
        .expect("product json");
    assert_eq!(money(&product["rating"]), Some(Decimal::new(45, 1)));

    let resp = bob
        .patch(server.url(&path))
        .json(&json!({"text": "Mine now"}))
        .send()
        .await
        .expect("foreign update");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ann
        .patch(server.url(&path))
        .json(&json!({"rating": 4}))
        .send()
        .await
        .expect("own update");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("review json");
    assert_eq!(updated["rating"], 4);
    assert_eq!(updated["text"], "Comfy");

    let resp = bob.delete(server.url(&path)).send().await.expect("foreign delete");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ann.delete(server.url(&path)).send().await.expect("own delete");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let reviews: Value = server
        .visitor()
        .get(server.url("/api/reviews?product=2"))
        .send()
        .await
        .expect("reviews")
        .json()
        .await
        .expect("reviews json");
    assert_eq!(reviews.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_review_validation() {
    let server = TestServer::spawn().await;

    let resp = server
        .visitor()
        .post(server.url("/api/reviews"))
        .json(&json!({"product": 1, "rating": 5}))
        .send()
        .await
        .expect("anonymous review");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let ann = server.logged_in(1).await;
    let resp = ann
        .post(server.url("/api/reviews"))
        .json(&json!({"product": 1, "rating": 6}))
        .send()
        .await
        .expect("out of range");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = resp.json().await.expect("error json");
    assert_eq!(error["field"], "rating");

    let resp = ann
        .post(server.url("/api/reviews"))
        .json(&json!({"product": 999, "rating": 3}))
        .send()
        .await
        .expect("unknown product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
