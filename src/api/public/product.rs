use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use uuid::Uuid;
use validator::Validate;

use crate::entities::product::{self, Category, Entity as ProductEntity};
use crate::middleware::logging::{to_response, ApiError};
use crate::AppState;

pub fn product_router(state: &AppState) -> Router {
    Router::new()
        .route("/product", get(get_products))
        .route("/product/:id", get(get_product))
        .layer(Extension(state.db.clone()))
}

async fn get_products(
    Query(params): Query<GetProductsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    params.validate()?;
    let mut half_result = ProductEntity::find();

    match params.category.as_deref() {
        None | Some("") | Some("all") => {}
        Some(value) => {
            let category = Category::from_str(value).map_err(ApiError::Validation)?;
            half_result = half_result.filter(product::Column::Category.eq(category));
        }
    }

    if let Some(min) = params.min {
        half_result = half_result.filter(product::Column::Price.gte(min));
    }

    if let Some(max) = params.max {
        half_result = half_result.filter(product::Column::Price.lte(max));
    }

    if Some(true) == params.in_stock {
        half_result = half_result.filter(product::Column::Stock.gt(0));
    }

    // Case-insensitive name search on every backend.
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        half_result = half_result.filter(
            Expr::expr(Func::lower(Expr::col(product::Column::Name)))
                .like(LikeExpr::new(format!("%{}%", escape_like(&q.to_lowercase()))).escape('\\')),
        );
    }

    let mut half_result = half_result.order_by_desc(product::Column::CreatedAt);
    if let Some(limit) = params.limit {
        half_result = half_result.limit(limit);
    }

    let products = half_result.all(&*db).await?;

    let response: Vec<PublicProductResponse> = products
        .into_iter()
        .map(PublicProductResponse::new)
        .collect();
    Ok(to_response((StatusCode::OK, Json(response)), Ok(())))
}

async fn get_product(
    Path(id): Path<Uuid>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let prod = ProductEntity::find_by_id(id)
        .one(&*db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {} id was found.", id)))?;

    Ok(to_response(
        (StatusCode::OK, Json(PublicProductResponse::new(prod))),
        Ok(()),
    ))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Deserialize, Validate)]
struct GetProductsQuery {
    category: Option<String>,
    min: Option<Decimal>,
    max: Option<Decimal>,
    in_stock: Option<bool>,
    #[validate(length(max = 100, message = "Search text is too long"))]
    q: Option<String>,
    #[validate(range(min = 1, max = 100, message = "limit should be between 1 and 100"))]
    limit: Option<u64>,
}

#[derive(Serialize)]
pub struct PublicProductResponse {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    image_url: Option<String>,
    category: Category,
    stock: i32,
    created_at: DateTime<Utc>,
}

impl PublicProductResponse {
    pub fn new(value: product::Model) -> PublicProductResponse {
        PublicProductResponse {
            id: value.id,
            name: value.name,
            description: value.description,
            price: value.price,
            image_url: value.image_url,
            category: value.category,
            stock: value.stock,
            created_at: value.created_at,
        }
    }
}
