pub mod user;
pub mod product;
pub mod cart;
pub mod order;
pub mod order_item;

use chrono::Utc;
use sea_orm::{
    sea_query::Index, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Schema, Set,
};
use uuid::Uuid;

use crate::config::AdminSeed;
use crate::entities::{
    cart::Entity as Cart,
    order::Entity as Order,
    order_item::Entity as OrderItem,
    product::Entity as Product,
    user::Entity as User,
};
use crate::middleware::auth::hash_password;

/// Creates every table the shop needs. Safe to run against an existing database.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    // Parents before children so foreign keys resolve.
    let mut tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Cart),
        schema.create_table_from_entity(Order),
        schema.create_table_from_entity(OrderItem),
    ];
    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    let cart_unique = Index::create()
        .name("idx_cart_items_user_product")
        .table(Cart)
        .col(cart::Column::UserId)
        .col(cart::Column::ProductId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&cart_unique)).await?;

    Ok(())
}

/// Makes sure the configured back-office account exists.
pub async fn seed_admin(db: &DatabaseConnection, seed: &AdminSeed) -> Result<(), DbErr> {
    let email = user::normalize_email(&seed.email);
    let existing = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;

    if let Some(model) = existing {
        if model.role != user::Role::Admin {
            tracing::warn!(%email, "Seed admin email belongs to a non-admin account");
        }
        return Ok(());
    }

    let password = hash_password(&seed.password)
        .map_err(|err| DbErr::Custom(format!("Failed to hash admin password: {err}")))?;

    let new_admin = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        password: Set(password),
        role: Set(user::Role::Admin),
        created_at: Set(Utc::now()),
    };
    User::insert(new_admin).exec(db).await?;
    tracing::info!(%email, "Seeded admin account");

    Ok(())
}
