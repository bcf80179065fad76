mod common;

use common::spawn_app;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn test_cart_requires_authentication() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/cart")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_add_product_to_cart_merges_quantities() {
    let app = spawn_app().await;
    let cake = app.product("Fruit cake", "14.00", 10).await;
    let token = app.customer("cart@cakes.test").await;

    for quantity in [2, 3] {
        let response = app
            .client
            .post(app.url("/cart"))
            .bearer_auth(&token)
            .json(&json!({ "productId": cake["id"], "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body: Value = app
        .client
        .get(app.url("/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["cartItems"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(items[0]["product"]["name"], "Fruit cake");
}

#[tokio::test]
async fn test_add_defaults_to_one_and_rejects_unknown_products() {
    let app = spawn_app().await;
    let cake = app.product("Swiss roll", "7.00", 10).await;
    let token = app.customer("default@cakes.test").await;

    let response = app
        .client
        .post(app.url("/cart"))
        .bearer_auth(&token)
        .json(&json!({ "productId": cake["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cartItem"]["quantity"], 1);

    let response = app
        .client
        .post(app.url("/cart"))
        .bearer_auth(&token)
        .json(&json!({ "productId": Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .post(app.url("/cart"))
        .bearer_auth(&token)
        .json(&json!({ "productId": cake["id"], "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_and_remove_cart_entries() {
    let app = spawn_app().await;
    let cake = app.product("Battenberg", "11.00", 10).await;
    let token = app.customer("patch@cakes.test").await;

    let body: Value = app
        .client
        .post(app.url("/cart"))
        .bearer_auth(&token)
        .json(&json!({ "productId": cake["id"], "quantity": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry_id = body["cartItem"]["id"].as_str().unwrap().to_owned();

    let response = app
        .client
        .patch(app.url(&format!("/cart/{}", entry_id)))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["cartItem"]["quantity"], 6);

    // Someone else's entry looks missing.
    let intruder = app.customer("intruder@cakes.test").await;
    let response = app
        .client
        .delete(app.url(&format!("/cart/{}", entry_id)))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .patch(app.url(&format!("/cart/{}", entry_id)))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .delete(app.url(&format!("/cart/{}", entry_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_cart_after_checkout() {
    let app = spawn_app().await;
    let first = app.product("Scone", "3.00", 10).await;
    let second = app.product("Muffin", "2.50", 10).await;
    let token = app.customer("clear@cakes.test").await;

    for cake in [&first, &second] {
        app.client
            .post(app.url("/cart"))
            .bearer_auth(&token)
            .json(&json!({ "productId": cake["id"], "quantity": 1 }))
            .send()
            .await
            .unwrap();
    }

    // The order endpoint accepts the cart exactly as the cart endpoint returns it.
    let cart: Value = app
        .client
        .get(app.url("/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let response = app
        .place_order(
            &token,
            json!({ "cartItems": cart["cartItems"], "totalAmount": "5.50" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .client
        .delete(app.url("/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["removed"], 2);
}
