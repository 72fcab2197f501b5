//! Catalog browsing: filters, product pages, reference data and best sellers.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Value;

use furnish_integration_tests::{TestServer, money, product_ids};

async fn get_json(server: &TestServer, path: &str) -> (StatusCode, Value) {
    let resp = server
        .visitor()
        .get(server.url(path))
        .send()
        .await
        .expect("request");
    let status = resp.status();
    (status, resp.json().await.expect("json body"))
}

#[tokio::test]
async fn test_unfiltered_catalog_lists_everything() {
    let server = TestServer::spawn().await;
    let (status, body) = get_json(&server, "/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product_ids(&body), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn test_in_stock_filter() {
    let server = TestServer::spawn().await;
    let (_, body) = get_json(&server, "/api/products?in_stock=true").await;
    assert_eq!(product_ids(&body), vec![1, 2, 4, 5, 6, 7]);
}

#[tokio::test]
async fn test_price_range_uses_discounted_price() {
    let server = TestServer::spawn().await;
    // SF-4 lists at 250 but sells at 125 under its discount.
    let (_, body) = get_json(
        &server,
        "/api/products?category=sofas&min_total_price=100&max_total_price=200",
    )
    .await;
    assert_eq!(product_ids(&body), vec![1, 2, 4]);
}

#[tokio::test]
async fn test_facet_filters_combine() {
    let server = TestServer::spawn().await;

    let (_, body) = get_json(&server, "/api/products?color=Grey,Blue&collection=nordic").await;
    assert_eq!(product_ids(&body), vec![1]);

    let (_, body) = get_json(&server, "/api/products?brand=Norrland").await;
    assert_eq!(product_ids(&body), vec![1, 2]);

    let (_, body) = get_json(&server, "/api/products?name=osl").await;
    assert_eq!(product_ids(&body), vec![1, 2]);
}

#[tokio::test]
async fn test_bad_filter_value_is_rejected() {
    let server = TestServer::spawn().await;
    let (status, body) = get_json(&server, "/api/products?min_total_price=cheap").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "min_total_price");
}

#[tokio::test]
async fn test_product_page_shows_discount_and_relatives() {
    let server = TestServer::spawn().await;

    let (status, body) = get_json(&server, "/api/products/4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["price"]), Some(Decimal::from(250)));
    assert_eq!(money(&body["total_price"]), Some(Decimal::from(125)));
    assert_eq!(body["category"]["slug"], "sofas");

    let (_, body) = get_json(&server, "/api/products/1").await;
    assert_eq!(product_ids(&body["other_color_same_products"]), vec![2]);
    assert_eq!(product_ids(&body["similar_products"]), vec![2, 3, 4]);
    assert_eq!(money(&body["total_price"]), Some(Decimal::from(100)));

    let (status, _) = get_json(&server, "/api/products/404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reference_data() {
    let server = TestServer::spawn().await;

    let (_, body) = get_json(&server, "/api/categories").await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (_, body) = get_json(&server, "/api/collections/nordic").await;
    assert_eq!(body["name"], "Nordic");
    assert_eq!(product_ids(&body["products"]), vec![1, 4]);

    let (status, _) = get_json(&server, "/api/categories/beds").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get_json(&server, "/api/brands").await;
    assert_eq!(body, serde_json::json!(["Norrland"]));
}

#[tokio::test]
async fn test_popular_is_empty_without_orders() {
    let server = TestServer::spawn().await;
    let (status, body) = get_json(&server, "/api/products/popular").await;
    assert_eq!(status, StatusCode::OK);
    assert!(product_ids(&body).is_empty());
}
