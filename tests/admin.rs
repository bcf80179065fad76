mod common;

use common::{decimal, line, spawn_app};
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = spawn_app().await;
    let token = app.customer("plain@cakes.test").await;

    let response = app
        .client
        .get(app.url("/admin/order"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .post(app.url("/admin/product"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Sneaky", "price": "1.00", "category": "classic", "stock": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.client.get(app.url("/admin/stats")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_crud() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let cake = app.product("Angel cake", "8.00", 6).await;
    let id = cake["id"].as_str().unwrap();
    assert!(cake["owner_id"].is_string());

    let response = app
        .client
        .patch(app.url(&format!("/admin/product/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({ "stock": 12, "category": "celebration" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["product"]["stock"], 12);
    assert_eq!(body["product"]["category"], "celebration");

    let listed: Vec<Value> = app
        .client
        .get(app.url("/admin/product"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let response = app
        .client
        .delete(app.url(&format!("/admin/product/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for response in [
        app.client
            .get(app.url(&format!("/admin/product/{}", id)))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap(),
        app.client
            .patch(app.url(&format!("/admin/product/{}", id)))
            .bearer_auth(&admin)
            .json(&json!({ "stock": 1 }))
            .send()
            .await
            .unwrap(),
        app.client
            .delete(app.url(&format!("/admin/product/{}", Uuid::new_v4())))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap(),
    ] {
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_product_validation() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    for payload in [
        json!({ "name": "Negative", "price": "-1.00", "category": "classic", "stock": 1 }),
        json!({ "name": "Negative stock", "price": "1.00", "category": "classic", "stock": -3 }),
        json!({ "name": "", "price": "1.00", "category": "classic", "stock": 1 }),
        json!({ "name": "Bad link", "price": "1.00", "category": "classic", "stock": 1, "image_url": "nope" }),
    ] {
        let response = app
            .client
            .post(app.url("/admin/product"))
            .bearer_auth(&admin)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
    }
    // Negative zero is still zero, as it is for checkout line prices.
    let response = app
        .client
        .post(app.url("/admin/product"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Free sample", "price": "-0.00", "category": "classic", "stock": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_order_listing_survives_product_deletion() {
    let app = spawn_app().await;
    let cake = app.product("Seasonal special", "19.00", 5).await;
    let token = app.customer("history@cakes.test").await;
    app.place_order(&token, json!({ "cartItems": [line(&cake, 1)], "totalAmount": "19.00" }))
        .await;

    app.client
        .delete(app.url(&format!("/admin/product/{}", cake["id"].as_str().unwrap())))
        .bearer_auth(app.admin().await)
        .send()
        .await
        .unwrap();

    let orders = app.admin_orders().await;
    assert_eq!(orders.len(), 1);
    let item = &orders[0]["order_items"][0];
    assert_eq!(item["product_name"], "Deleted Product");
    assert!(item["product"].is_null());
    assert_eq!(decimal(&item["price"]), dec!(19.00));
}

#[tokio::test]
async fn test_status_override_and_stats() {
    let app = spawn_app().await;
    let cake = app.product("Croquembouche", "60.00", 5).await;
    let token = app.customer("stats@cakes.test").await;
    let admin = app.admin().await;

    let mut order_ids = Vec::new();
    for _ in 0..2 {
        let body: Value = app
            .place_order(&token, json!({ "cartItems": [line(&cake, 1)], "totalAmount": "60.00" }))
            .await
            .json()
            .await
            .unwrap();
        order_ids.push(body["orderId"].as_str().unwrap().to_owned());
    }

    let response = app
        .client
        .patch(app.url(&format!("/admin/order/{}", order_ids[0])))
        .bearer_auth(&admin)
        .json(&json!({ "status": "paid" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["order"]["status"], "paid");

    let response = app
        .client
        .patch(app.url(&format!("/admin/order/{}", Uuid::new_v4())))
        .bearer_auth(&admin)
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stats: Value = app
        .client
        .get(app.url("/admin/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_products"], 1);
    assert_eq!(stats["total_orders"], 2);
    assert_eq!(stats["pending_orders"], 1);
    assert_eq!(decimal(&stats["revenue"]), dec!(60.00));
}
