use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A salesperson. Base salary must be positive; the rule is enforced in the
/// service layer so the violation reports as a named business error.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "salespeople")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[validate(length(min = 1, max = 100, message = "Nome é obrigatório"))]
    pub name: String,

    pub base_salary: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale::Entity")]
    Sales,
    #[sea_orm(has_many = "super::part_order::Entity")]
    PartOrders,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl Related<super::part_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
