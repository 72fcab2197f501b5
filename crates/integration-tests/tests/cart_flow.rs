//! Cart and favorites behave the same for anonymous and logged-in visitors.

use reqwest::StatusCode;
use serde_json::{Value, json};

use furnish_integration_tests::{TestServer, cart_lines, product_ids};

async fn cart(server: &TestServer, client: &reqwest::Client) -> Value {
    client
        .get(server.url("/api/carts/items"))
        .send()
        .await
        .expect("get cart")
        .json()
        .await
        .expect("cart json")
}

#[tokio::test]
async fn test_anonymous_add_overwrites_quantity() {
    let server = TestServer::spawn().await;
    let client = server.visitor();

    for quantity in [2, 5] {
        let resp = client
            .post(server.url("/api/carts/items"))
            .json(&json!({"product": 7, "quantity": quantity}))
            .send()
            .await
            .expect("add item");
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    assert_eq!(cart_lines(&cart(&server, &client).await), vec![(7, 5)]);
}

#[tokio::test]
async fn test_anonymous_cart_survives_between_requests_and_clears() {
    let server = TestServer::spawn().await;
    let client = server.visitor();

    client
        .post(server.url("/api/carts/items"))
        .json(&json!({"product": 1}))
        .send()
        .await
        .expect("add item");
    client
        .patch(server.url("/api/carts/items/1"))
        .json(&json!({"quantity": 3}))
        .send()
        .await
        .expect("update item");
    assert_eq!(cart_lines(&cart(&server, &client).await), vec![(1, 3)]);

    // A different visitor has their own cart.
    let stranger = server.visitor();
    assert!(cart_lines(&cart(&server, &stranger).await).is_empty());

    let resp = client
        .delete(server.url("/api/carts/items"))
        .send()
        .await
        .expect("clear cart");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(cart_lines(&cart(&server, &client).await).is_empty());
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let server = TestServer::spawn().await;
    let client = server.visitor();

    client
        .post(server.url("/api/carts/items"))
        .json(&json!({"product": 7}))
        .send()
        .await
        .expect("add item");

    for _ in 0..2 {
        let resp = client
            .delete(server.url("/api/carts/items/7"))
            .send()
            .await
            .expect("remove item");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("cart json");
        assert!(cart_lines(&body).is_empty());
    }
}

#[tokio::test]
async fn test_invalid_quantity_names_the_field() {
    let server = TestServer::spawn().await;
    let client = server.logged_in(1).await;

    let resp = client
        .post(server.url("/api/carts/items"))
        .json(&json!({"product": 7, "quantity": 0}))
        .send()
        .await
        .expect("add item");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("error json");
    assert_eq!(body["field"], "quantity");

    // Product 6 has a single unit in stock.
    let resp = client
        .post(server.url("/api/carts/items"))
        .json(&json!({"product": 6, "quantity": 2}))
        .send()
        .await
        .expect("add item");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(server.url("/api/carts/items"))
        .json(&json!({"product": 999}))
        .send()
        .await
        .expect("add item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_of_missing_line_is_not_found() {
    let server = TestServer::spawn().await;
    let client = server.visitor();

    let resp = client
        .patch(server.url("/api/carts/items/5"))
        .json(&json!({"quantity": 2}))
        .send()
        .await
        .expect("update item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logged_in_and_anonymous_carts_look_the_same() {
    let server = TestServer::spawn().await;
    let anonymous = server.visitor();
    let user = server.logged_in(2).await;

    for client in [&anonymous, &user] {
        for (product, quantity) in [(4, 1), (5, 2)] {
            let resp = client
                .post(server.url("/api/carts/items"))
                .json(&json!({"product": product, "quantity": quantity}))
                .send()
                .await
                .expect("add item");
            assert_eq!(resp.status(), StatusCode::CREATED);
        }
    }

    let anonymous_cart = cart(&server, &anonymous).await;
    assert_eq!(cart_lines(&anonymous_cart), vec![(4, 1), (5, 2)]);
    assert_eq!(anonymous_cart, cart(&server, &user).await);
}

#[tokio::test]
async fn test_favorites_flag_products() {
    let server = TestServer::spawn().await;

    for client in [server.visitor(), server.logged_in(1).await] {
        for product in [5, 2] {
            let resp = client
                .post(server.url("/api/favorites"))
                .json(&json!({"product": product}))
                .send()
                .await
                .expect("add favorite");
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let favorites: Value = client
            .get(server.url("/api/favorites"))
            .send()
            .await
            .expect("favorites")
            .json()
            .await
            .expect("favorites json");
        assert_eq!(product_ids(&favorites["products"]), vec![2, 5]);

        let product: Value = client
            .get(server.url("/api/products/5"))
            .send()
            .await
            .expect("product")
            .json()
            .await
            .expect("product json");
        assert_eq!(product["is_favorited"], true);

        let favorites: Value = client
            .delete(server.url("/api/favorites/5"))
            .send()
            .await
            .expect("remove favorite")
            .json()
            .await
            .expect("favorites json");
        assert_eq!(product_ids(&favorites["products"]), vec![2]);
    }
}
