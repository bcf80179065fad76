#![allow(dead_code)]

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::{collections::HashMap, str::FromStr, sync::Arc};

use cake_shop::config::Config;
use cake_shop::entities::{seed_admin, setup_schema};
use cake_shop::payment::MockGateway;
use cake_shop::{connect, create_app, AppState};

pub const ADMIN_EMAIL: &str = "admin@cakes.test";
pub const ADMIN_PASSWORD: &str = "Muzion15admin";
pub const PASSWORD: &str = "Muzion15";

/// A server on an ephemeral port backed by an in-memory database and the mock gateway.
pub struct TestApp {
    pub base: String,
    pub client: Client,
    pub gateway: Arc<MockGateway>,
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "sqlite::memory:"),
        ("SECRET", "integration-test-secret"),
        ("BIND_ADDR", "127.0.0.1:0"),
        ("ADMIN_EMAIL", ADMIN_EMAIL),
        ("ADMIN_PASSWORD", ADMIN_PASSWORD),
    ]);
    let config =
        Config::from_lookup(|name| vars.get(name).map(|value| value.to_string())).unwrap();

    let db = connect(&config.database_url).await.unwrap();
    setup_schema(&db).await.unwrap();
    seed_admin(&db, config.admin.as_ref().unwrap()).await.unwrap();

    let gateway = Arc::new(MockGateway::new());
    let state = AppState {
        db: Arc::new(db),
        gateway: gateway.clone(),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base: format!("http://{}/api", addr),
        client: Client::new(),
        gateway,
        state,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn register(&self, email: &str) -> reqwest::Response {
        self.client
            .post(self.url("/register"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_owned()
    }

    /// Registers a fresh customer and returns its bearer token.
    pub async fn customer(&self, email: &str) -> String {
        assert_eq!(self.register(email).await.status(), StatusCode::CREATED);
        self.login(email, PASSWORD).await
    }

    pub async fn admin(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Creates a product through the admin API and returns its JSON.
    pub async fn product(&self, name: &str, price: &str, stock: i32) -> Value {
        let token = self.admin().await;
        let response = self
            .client
            .post(self.url("/admin/product"))
            .bearer_auth(token)
            .json(&json!({
                "name": name,
                "description": "Baked this morning",
                "price": price,
                "category": "classic",
                "stock": stock
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["product"].clone()
    }

    pub async fn get_product(&self, id: &str) -> Value {
        self.client
            .get(self.url(&format!("/product/{}", id)))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .unwrap()
    }

    pub async fn place_order(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/orders"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn orders(&self, token: &str) -> Vec<Value> {
        let body: Value = self
            .client
            .get(self.url("/orders"))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .unwrap();
        body["orders"].as_array().unwrap().clone()
    }

    pub async fn admin_orders(&self) -> Vec<Value> {
        let body: Value = self
            .client
            .get(self.url("/admin/order"))
            .bearer_auth(self.admin().await)
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .unwrap();
        body["orders"].as_array().unwrap().clone()
    }
}

/// Decimals travel as JSON strings or numbers depending on the backend.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(text) => Decimal::from_str(text).unwrap(),
        Value::Number(number) => Decimal::from_str(&number.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

pub fn line(product: &Value, quantity: i32) -> Value {
    json!({
        "productId": product["id"],
        "quantity": quantity,
        "price": product["price"]
    })
}
