use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::entities::user::Entity as User;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub price: Decimal,
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    pub category: Category,
    pub stock: i32,
    #[sea_orm(nullable)]
    pub owner_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "User",
        from = "crate::entities::product::Column::OwnerId",
        to = "crate::entities::user::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull",
    )]
    Owner,
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(
    enum_name = "category_enum",
    db_type = "String(StringLen::N(32))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[sea_orm(string_value = "classic")]
    Classic,
    #[sea_orm(string_value = "chocolate")]
    Chocolate,
    #[sea_orm(string_value = "fruit")]
    Fruit,
    #[sea_orm(string_value = "specialty")]
    Specialty,
    #[sea_orm(string_value = "celebration")]
    Celebration,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Self::Classic),
            "chocolate" => Ok(Self::Chocolate),
            "fruit" => Ok(Self::Fruit),
            "specialty" => Ok(Self::Specialty),
            "celebration" => Ok(Self::Celebration),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

impl Related<crate::entities::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}
