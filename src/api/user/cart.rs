use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{cart, cart::Entity as CartEntity, product};
use crate::middleware::{
    auth::Claims,
    logging::{to_response, ApiError},
};
use crate::AppState;

//ROUTERS
pub fn cart_router(state: &AppState) -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(add_product).delete(clear_cart))
        .route("/cart/:id", patch(patch_entry).delete(remove_product))
        .layer(Extension(state.db.clone()))
}

async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let entries = CartEntity::find()
        .filter(cart::Column::UserId.eq(claims.user_id))
        .order_by_asc(cart::Column::CreatedAt)
        .find_also_related(product::Entity)
        .all(&*db)
        .await?;

    let cart_items: Vec<CartItemResponse> = entries
        .into_iter()
        .map(|(item, product)| CartItemResponse { item, product })
        .collect();

    Ok(to_response(
        (StatusCode::OK, Json(json!({ "cartItems": cart_items }))),
        Ok(()),
    ))
}

/// Upsert keyed on (user, product): an existing row gets its quantity increased.
async fn add_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddProduct>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let user_id = claims.user_id;

    if product::Entity::find_by_id(payload.product_id)
        .one(&*db)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound(format!(
            "No product with {} id was found",
            payload.product_id
        )));
    }

    if let Some(entry) = increment_existing(&db, user_id, &payload).await? {
        return Ok(to_response(
            (StatusCode::CREATED, Json(json!({ "cartItem": entry }))),
            Ok(()),
        ));
    }

    let new_entry = cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        product_id: Set(payload.product_id),
        quantity: Set(payload.quantity),
        created_at: Set(Utc::now()),
    };

    let entry = match new_entry.insert(&*db).await {
        Ok(entry) => entry,
        // Another tab inserted the same product in the meantime.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            increment_existing(&db, user_id, &payload)
                .await?
                .ok_or_else(|| ApiError::upstream("Internal server error", err))?
        }
        Err(err) => return Err(err.into()),
    };

    Ok(to_response(
        (StatusCode::CREATED, Json(json!({ "cartItem": entry }))),
        Ok(()),
    ))
}

async fn increment_existing(
    db: &DatabaseConnection,
    user_id: Uuid,
    payload: &AddProduct,
) -> Result<Option<cart::Model>, ApiError> {
    let Some(entry) = CartEntity::find()
        .filter(cart::Column::ProductId.eq(payload.product_id))
        .filter(cart::Column::UserId.eq(user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let quantity = entry.quantity.saturating_add(payload.quantity);
    let mut entry: cart::ActiveModel = entry.into();
    entry.quantity = Set(quantity);
    Ok(Some(entry.update(db).await?))
}

async fn remove_product(
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let result = CartEntity::delete_many()
        .filter(cart::Column::Id.eq(id))
        .filter(cart::Column::UserId.eq(claims.user_id))
        .exec(&*db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound(format!(
            "No related entry with {} id was found.",
            id
        )));
    }

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Resource deleted successfully"
            })),
        ),
        Ok(()),
    ))
}

async fn clear_cart(
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> Result<Response, ApiError> {
    let result = CartEntity::delete_many()
        .filter(cart::Column::UserId.eq(claims.user_id))
        .exec(&*db)
        .await?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "removed": result.rows_affected
            })),
        ),
        Ok(()),
    ))
}

async fn patch_entry(
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchCart>,
) -> Result<Response, ApiError> {
    payload.validate()?;

    let entry = CartEntity::find_by_id(id)
        .filter(cart::Column::UserId.eq(claims.user_id))
        .one(&*db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No related entry with {} id was found.", id)))?;

    let mut entry: cart::ActiveModel = entry.into();
    if payload.quantity == 0 {
        entry.delete(&*db).await?;
        return Ok(to_response(
            (
                StatusCode::OK,
                Json(json!({ "message": "Resource deleted successfully" })),
            ),
            Ok(()),
        ));
    }

    entry.quantity = Set(payload.quantity);
    let entry = entry.update(&*db).await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(json!({
                "message": "Resource patched successfully",
                "cartItem": entry
            })),
        ),
        Ok(()),
    ))
}

//Structs
#[derive(Serialize)]
struct CartItemResponse {
    #[serde(flatten)]
    item: cart::Model,
    product: Option<product::Model>,
}

fn one() -> i32 {
    1
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
struct AddProduct {
    #[serde(alias = "product_id")]
    product_id: Uuid,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 999, message = "Quantity should be between 1 and 999"))]
    quantity: i32,
}

#[derive(Deserialize, Validate)]
struct PatchCart {
    #[validate(range(min = 0, max = 999, message = "Quantity should be between 0 and 999"))]
    quantity: i32,
}
