use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::checkout::is_negative;
use crate::entities::product::{self, Category, Entity as ProductEntity};
use crate::middleware::{
    auth::Claims,
    logging::{to_response, ApiError},
};
use crate::AppState;

//ROUTERS
pub fn admin_product_router(state: &AppState) -> Router {
    Router::new()
        .route("/product", get(admin_get_products).post(create_product))
        .route(
            "/product/:id",
            get(admin_get_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .layer(Extension(state.db.clone()))
}

// Admins are a trusted audience: they get the raw database message.
fn raw(err: DbErr) -> ApiError {
    ApiError::Persistence(err.to_string())
}

//ROUTES
async fn admin_get_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let products = ProductEntity::find()
        .order_by_desc(product::Column::CreatedAt)
        .all(&*db)
        .await
        .map_err(raw)?;

    Ok(to_response((StatusCode::OK, Json(products)), Ok(())))
}

async fn admin_get_product(
    Path(id): Path<Uuid>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let prod = ProductEntity::find_by_id(id)
        .one(&*db)
        .await
        .map_err(raw)?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {} id was found.", id)))?;

    Ok(to_response((StatusCode::OK, Json(prod)), Ok(())))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProduct>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    tracing::debug!(name = %payload.name, "Creating product");

    let new_product = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_owned()),
        description: Set(payload.description),
        price: Set(payload.price),
        image_url: Set(payload.image_url),
        category: Set(payload.category),
        stock: Set(payload.stock),
        owner_id: Set(Some(claims.user_id)),
        created_at: Set(Utc::now()),
    };

    let created = new_product.insert(&*db).await.map_err(raw)?;

    Ok(to_response(
        (
            StatusCode::CREATED,
            Json(json!({
                "message": "Product created successfully",
                "product": created
            })),
        ),
        Ok(()),
    ))
}

async fn patch_product(
    Path(id): Path<Uuid>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchProductPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;

    let product = ProductEntity::find_by_id(id)
        .one(&*db)
        .await
        .map_err(raw)?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {} id was found.", id)))?;
    let mut product: product::ActiveModel = product.into();

    if let Some(name) = payload.name {
        product.name = Set(name.trim().to_owned());
    }

    if let Some(description) = payload.description {
        product.description = Set(Some(description).filter(|value| !value.is_empty()));
    }

    if let Some(price) = payload.price {
        product.price = Set(price);
    }

    if let Some(image_url) = payload.image_url {
        product.image_url = Set(Some(image_url).filter(|value| !value.is_empty()));
    }

    if let Some(category) = payload.category {
        product.category = Set(category);
    }

    if let Some(stock) = payload.stock {
        product.stock = Set(stock);
    }

    let updated = product.update(&*db).await.map_err(raw)?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Resource patched successfully.",
                "product": updated
            })),
        ),
        Ok(()),
    ))
}

/// Order history keeps the line items; their product reference is cleared.
async fn delete_product(
    Path(id): Path<Uuid>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let result = ProductEntity::delete_by_id(id)
        .exec(&*db)
        .await
        .map_err(raw)?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound(format!(
            "No product with {} id was found.",
            id
        )));
    }

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Resource deleted successfully."
            })),
        ),
        Ok(()),
    ))
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if is_negative(*value) {
        return Err(ValidationError::new("negative_price"));
    }
    Ok(())
}

//Structs
#[derive(Deserialize, Validate, Debug)]
struct CreateProduct {
    #[validate(length(min = 1, max = 120))]
    name: String,
    description: Option<String>,
    #[validate(custom(function = "non_negative"))]
    price: Decimal,
    #[validate(url)]
    image_url: Option<String>,
    category: Category,
    #[validate(range(min = 0))]
    stock: i32,
}

#[derive(Deserialize, Validate, Debug)]
struct PatchProductPayload {
    #[validate(length(min = 1, max = 120))]
    name: Option<String>,
    description: Option<String>,
    #[validate(custom(function = "non_negative"))]
    price: Option<Decimal>,
    image_url: Option<String>,
    category: Option<Category>,
    #[validate(range(min = 0))]
    stock: Option<i32>,
}
