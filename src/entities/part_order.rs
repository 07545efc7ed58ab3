use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Lifecycle of a parts order. Delivered and Cancelled are terminal.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PartOrderStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl PartOrderStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// A customer order for parts. Items are owned exclusively by the order
/// and are removed with it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "part_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub order_date: DateTime<Utc>,

    #[validate(length(min = 1, max = 100, message = "Nome do cliente é obrigatório"))]
    pub customer_name: String,

    #[validate(length(max = 18))]
    pub customer_tax_id: Option<String>,

    #[validate(length(max = 20))]
    pub customer_phone: Option<String>,

    pub total_value: Decimal,

    pub status: PartOrderStatus,

    /// Cleared if the salesperson is removed.
    pub salesperson_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::part_order_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::salesperson::Entity",
        from = "Column::SalespersonId",
        to = "super::salesperson::Column::Id"
    )]
    Salesperson,
}

impl Related<super::part_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::salesperson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Salesperson.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
