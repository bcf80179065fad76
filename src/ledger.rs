//! Read side of the order ledger: order history and back-office figures.

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{
    order::{self, Entity as OrderEntity, Status},
    order_item,
    product::{self, Entity as ProductEntity},
};

pub const DELETED_PRODUCT: &str = "Deleted Product";

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: order_item::Model,
    pub product_name: String,
    pub product: Option<product::Model>,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: order::Model,
    pub order_items: Vec<OrderItemView>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Stats {
    pub total_products: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
    pub revenue: Decimal,
}

/// Orders newest first with their line items. `owner` limits the result to one customer.
pub async fn list_orders(
    db: &DatabaseConnection,
    owner: Option<Uuid>,
) -> Result<Vec<OrderView>, DbErr> {
    let mut finder = OrderEntity::find();
    if let Some(user_id) = owner {
        finder = finder.filter(order::Column::UserId.eq(user_id));
    }

    let orders = finder
        .order_by_desc(order::Column::CreatedAt)
        .find_with_related(order_item::Entity)
        .all(db)
        .await?;

    let product_ids: Vec<Uuid> = orders
        .iter()
        .flat_map(|(_, items)| items.iter().filter_map(|item| item.product_id))
        .collect();

    let products: HashMap<Uuid, product::Model> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        ProductEntity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect()
    };

    Ok(orders
        .into_iter()
        .map(|(order, items)| OrderView {
            order,
            order_items: items
                .into_iter()
                .map(|item| {
                    let product = item.product_id.and_then(|id| products.get(&id).cloned());
                    OrderItemView {
                        product_name: product
                            .as_ref()
                            .map(|product| product.name.clone())
                            .unwrap_or_else(|| DELETED_PRODUCT.to_owned()),
                        product,
                        item,
                    }
                })
                .collect(),
        })
        .collect())
}

pub async fn stats(db: &DatabaseConnection) -> Result<Stats, DbErr> {
    let total_products = ProductEntity::find().count(db).await?;
    let total_orders = OrderEntity::find().count(db).await?;
    let pending_orders = OrderEntity::find()
        .filter(order::Column::Status.eq(Status::Pending))
        .count(db)
        .await?;

    // Summed here rather than in SQL to keep decimal precision on every backend.
    let revenue = OrderEntity::find()
        .select_only()
        .column(order::Column::TotalAmount)
        .filter(order::Column::Status.eq(Status::Paid))
        .into_tuple::<Decimal>()
        .all(db)
        .await?
        .into_iter()
        .sum();

    Ok(Stats {
        total_products,
        total_orders,
        pending_orders,
        revenue,
    })
}
