use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A genuine spare part. The part code is a unique natural key and the
/// stock level must never go negative.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "parts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[validate(length(min = 1, max = 20, message = "Código da peça é obrigatório"))]
    pub part_code: String,

    #[validate(length(min = 1, max = 200, message = "Nome é obrigatório"))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub price: Decimal,

    pub stock_on_hand: i32,

    /// Reorder threshold; at or below it the part reports as low stock.
    pub stock_minimum: i32,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    /// Comma-separated model list, e.g. "fh16,fm,fmx".
    #[validate(length(max = 500))]
    pub compatible_models: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::part_order_item::Entity")]
    OrderItems,
}

impl Related<super::part_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Default reorder threshold for newly registered parts.
pub const DEFAULT_STOCK_MINIMUM: i32 = 5;
