//! Cart -> order -> payment.
//!
//! The database calls here do not share a transaction.
//! Creating an order is a small saga:
//!
//! 1. insert the `pending` order row,
//! 2. insert every line item in a single statement; on failure the order row
//!    is deleted again so no order without items is ever left behind,
//! 3. decrement stock product by product, floored at zero. This step is
//!    best-effort and never undoes the order.
//!
//! Marking an order paid only happens after re-reading the intent from the
//! gateway; a client's claim that payment succeeded is never trusted.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    order::{self, Entity as OrderEntity, Status},
    order_item,
    product::{self, Entity as ProductEntity},
};
use crate::middleware::logging::ApiError;
use crate::payment::{to_minor_units, CreateIntent, GatewayError, IntentStatus, PaymentGateway};

#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price as shown in the cart when the customer submitted it.
    pub price: Decimal,
}

#[derive(Clone, Debug)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub lines: Vec<CheckoutLine>,
    pub total_amount: Decimal,
    pub idempotency_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    /// True when an earlier attempt with the same idempotency key already created it.
    pub replayed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmedPayment {
    pub order_id: Uuid,
    pub previous_status: Status,
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Invalid cart line: {0}")]
    InvalidLine(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Idempotency key already used by another account")]
    IdempotencyConflict,
    #[error("Failed to create order: {0}")]
    OrderInsert(DbErr),
    #[error("Failed to save order items: {0}")]
    ItemInsert(DbErr),
    #[error("Order {0} not found")]
    OrderNotFound(Uuid),
    #[error("Payment intent creation failed: {0}")]
    PaymentFailed(GatewayError),
    #[error("Payment verification failed: {0}")]
    VerificationFailed(GatewayError),
    #[error("Payment not completed (status {0:?})")]
    PaymentNotCompleted(IntentStatus),
    #[error("Payment intent {intent_id} belongs to order {tagged}")]
    IntentMismatch { intent_id: String, tagged: String },
    #[error("Payment intent {0} is not tagged with an order")]
    UntaggedIntent(String),
    #[error("Payment intent {intent_id} captured {paid} minor units, order needs {expected}")]
    AmountMismatch {
        intent_id: String,
        paid: i64,
        expected: i64,
    },
    #[error("Database error: {0}")]
    Persistence(#[from] DbErr),
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => ApiError::Validation("Cart is empty".to_owned()),
            CheckoutError::InvalidLine(reason) | CheckoutError::InvalidAmount(reason) => {
                ApiError::Validation(reason)
            }
            CheckoutError::IdempotencyConflict => {
                ApiError::Conflict("Idempotency key already in use".to_owned())
            }
            CheckoutError::OrderNotFound(id) => {
                ApiError::NotFound(format!("No order with {} id was found", id))
            }
            CheckoutError::PaymentNotCompleted(_) => {
                ApiError::Validation("Payment not completed".to_owned())
            }
            CheckoutError::IntentMismatch { .. } | CheckoutError::UntaggedIntent(_) => {
                ApiError::Validation("Payment does not belong to this order".to_owned())
            }
            CheckoutError::AmountMismatch { .. } => {
                ApiError::Validation("Payment amount does not match the order".to_owned())
            }
            err @ CheckoutError::OrderInsert(_) => {
                ApiError::upstream("Failed to create order", err)
            }
            err @ CheckoutError::ItemInsert(_) => {
                ApiError::upstream("Failed to save order items", err)
            }
            err @ CheckoutError::PaymentFailed(_) => ApiError::upstream("Payment failed", err),
            err @ CheckoutError::VerificationFailed(_) => {
                ApiError::upstream("Verification failed", err)
            }
            err @ CheckoutError::Persistence(_) => {
                ApiError::upstream("Internal server error", err)
            }
        }
    }
}

/// `-0.00` counts as zero.
pub(crate) fn is_negative(value: Decimal) -> bool {
    value.is_sign_negative() && !value.is_zero()
}

fn validate(new_order: &NewOrder) -> Result<(), CheckoutError> {
    if new_order.lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    if is_negative(new_order.total_amount) {
        return Err(CheckoutError::InvalidAmount(
            "Total amount must not be negative".to_owned(),
        ));
    }
    for line in &new_order.lines {
        if line.quantity <= 0 {
            return Err(CheckoutError::InvalidLine(format!(
                "Quantity for product {} must be positive",
                line.product_id
            )));
        }
        if is_negative(line.price) {
            return Err(CheckoutError::InvalidLine(format!(
                "Price for product {} must not be negative",
                line.product_id
            )));
        }
    }
    Ok(())
}

async fn find_by_key(
    db: &DatabaseConnection,
    user_id: Uuid,
    key: &str,
) -> Result<Option<Uuid>, CheckoutError> {
    match OrderEntity::find()
        .filter(order::Column::IdempotencyKey.eq(key))
        .one(db)
        .await?
    {
        Some(existing) if existing.user_id == user_id => Ok(Some(existing.id)),
        Some(_) => Err(CheckoutError::IdempotencyConflict),
        None => Ok(None),
    }
}

/// Turns a submitted cart into a `pending` order. The cart itself is left alone.
pub async fn create_order(
    db: &DatabaseConnection,
    new_order: NewOrder,
) -> Result<PlacedOrder, CheckoutError> {
    validate(&new_order)?;

    if let Some(key) = new_order.idempotency_key.as_deref() {
        if let Some(order_id) = find_by_key(db, new_order.user_id, key).await? {
            tracing::info!(%order_id, "Checkout replayed with a known idempotency key");
            return Ok(PlacedOrder {
                order_id,
                replayed: true,
            });
        }
    }

    let order_id = Uuid::new_v4();
    let now = Utc::now();
    let order_row = order::ActiveModel {
        id: Set(order_id),
        user_id: Set(new_order.user_id),
        total_amount: Set(new_order.total_amount),
        status: Set(Status::Pending),
        idempotency_key: Set(new_order.idempotency_key.clone()),
        created_at: Set(now),
    };

    if let Err(err) = OrderEntity::insert(order_row).exec(db).await {
        // A concurrent request with the same key won the race.
        if let (Some(SqlErr::UniqueConstraintViolation(_)), Some(key)) =
            (err.sql_err(), new_order.idempotency_key.as_deref())
        {
            if let Some(order_id) = find_by_key(db, new_order.user_id, key).await? {
                return Ok(PlacedOrder {
                    order_id,
                    replayed: true,
                });
            }
        }
        return Err(CheckoutError::OrderInsert(err));
    }

    let items = new_order.lines.iter().map(|line| order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(Some(line.product_id)),
        quantity: Set(line.quantity),
        price: Set(line.price),
        created_at: Set(now),
    });

    if let Err(err) = order_item::Entity::insert_many(items).exec(db).await {
        tracing::warn!(%order_id, error = %err, "Line items rejected, removing order");
        if let Err(delete_err) = OrderEntity::delete_by_id(order_id).exec(db).await {
            tracing::error!(
                %order_id,
                error = %delete_err,
                "Failed to remove order after line item failure"
            );
        }
        return Err(CheckoutError::ItemInsert(err));
    }

    for line in &new_order.lines {
        match decrement_stock(db, line.product_id, line.quantity).await {
            Ok(Some((before, after))) => tracing::debug!(
                %order_id,
                product_id = %line.product_id,
                before,
                after,
                "Stock decremented"
            ),
            Ok(None) => tracing::warn!(
                %order_id,
                product_id = %line.product_id,
                "Product vanished before stock could be decremented"
            ),
            Err(err) => tracing::warn!(
                %order_id,
                product_id = %line.product_id,
                error = %err,
                "Stock decrement failed, order kept"
            ),
        }
    }

    tracing::info!(%order_id, user_id = %new_order.user_id, "Order created");
    Ok(PlacedOrder {
        order_id,
        replayed: false,
    })
}

/// Read-then-write, no locking. Returns the stock before and after.
async fn decrement_stock(
    db: &DatabaseConnection,
    product_id: Uuid,
    quantity: i32,
) -> Result<Option<(i32, i32)>, DbErr> {
    let Some(product) = ProductEntity::find_by_id(product_id).one(db).await? else {
        return Ok(None);
    };

    let remaining = product.stock.saturating_sub(quantity).max(0);
    ProductEntity::update_many()
        .col_expr(product::Column::Stock, Expr::value(remaining))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;

    Ok(Some((product.stock, remaining)))
}

/// Asks the gateway for an intent and hands back its client secret.
pub async fn issue_payment_intent(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    currency: &str,
    user_id: Uuid,
    order_id: Uuid,
    amount: Decimal,
) -> Result<String, CheckoutError> {
    if amount <= Decimal::ZERO {
        return Err(CheckoutError::InvalidAmount(
            "Amount must be greater than zero".to_owned(),
        ));
    }
    let amount_minor =
        to_minor_units(amount).map_err(|err| CheckoutError::InvalidAmount(err.to_string()))?;

    match OrderEntity::find_by_id(order_id).one(db).await? {
        Some(order) if order.user_id == user_id => {}
        _ => return Err(CheckoutError::OrderNotFound(order_id)),
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("orderId".to_owned(), order_id.to_string());
    metadata.insert("userId".to_owned(), user_id.to_string());

    let intent = gateway
        .create_payment_intent(CreateIntent {
            amount_minor,
            currency: currency.to_owned(),
            metadata,
        })
        .await
        .map_err(CheckoutError::PaymentFailed)?;

    tracing::info!(%order_id, intent_id = %intent.id, amount_minor, "Payment intent issued");
    intent.client_secret.ok_or_else(|| {
        CheckoutError::PaymentFailed(GatewayError::Decode(
            "payment intent has no client secret".to_owned(),
        ))
    })
}

/// Re-reads the intent from the gateway and marks the order paid if it succeeded,
/// is tagged with this order and captured exactly the order total.
pub async fn confirm_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    payment_intent_id: &str,
    order_id: Uuid,
) -> Result<ConfirmedPayment, CheckoutError> {
    let intent = gateway
        .retrieve_payment_intent(payment_intent_id)
        .await
        .map_err(CheckoutError::VerificationFailed)?;

    if intent.status != IntentStatus::Succeeded {
        tracing::info!(%order_id, intent_id = %intent.id, status = ?intent.status, "Payment not completed");
        return Err(CheckoutError::PaymentNotCompleted(intent.status));
    }

    match intent.metadata.get("orderId") {
        Some(tagged) if *tagged == order_id.to_string() => {}
        Some(tagged) => {
            return Err(CheckoutError::IntentMismatch {
                intent_id: intent.id,
                tagged: tagged.clone(),
            })
        }
        None => return Err(CheckoutError::UntaggedIntent(intent.id)),
    }

    let order = OrderEntity::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(CheckoutError::OrderNotFound(order_id))?;

    let expected = to_minor_units(order.total_amount).map_err(|err| {
        CheckoutError::InvalidAmount(format!("Order total cannot be charged: {err}"))
    })?;
    if intent.amount != expected {
        tracing::warn!(%order_id, intent_id = %intent.id, paid = intent.amount, expected, "Payment amount mismatch");
        return Err(CheckoutError::AmountMismatch {
            intent_id: intent.id,
            paid: intent.amount,
            expected,
        });
    }

    // Unconditional overwrite: repeating a confirmation is harmless.
    OrderEntity::update_many()
        .col_expr(order::Column::Status, Expr::value(Status::Paid.to_string()))
        .filter(order::Column::Id.eq(order_id))
        .exec(db)
        .await?;

    if order.status == Status::Paid {
        tracing::debug!(%order_id, "Order already paid");
    } else {
        tracing::info!(%order_id, previous = %order.status, "Order marked paid");
    }

    Ok(ConfirmedPayment {
        order_id,
        previous_status: order.status,
    })
}

/// Administrative override: any status, no transition checks.
pub async fn update_order_status(
    db: &DatabaseConnection,
    order_id: Uuid,
    status: Status,
) -> Result<order::Model, CheckoutError> {
    let order = OrderEntity::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(CheckoutError::OrderNotFound(order_id))?;

    let previous = order.status;
    let mut order: order::ActiveModel = order.into();
    order.status = Set(status);
    let updated = order.update(db).await?;

    tracing::info!(%order_id, %previous, next = %status, "Order status overridden");
    Ok(updated)
}
