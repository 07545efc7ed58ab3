use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A vehicle in the dealership inventory, identified by its chassis number.
/// The chassis is a natural key and is immutable once the row exists.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[validate(length(min = 1, max = 17, message = "Chassi deve ter entre 1 e 17 caracteres"))]
    pub chassis: String,

    #[validate(length(min = 1, max = 100, message = "Modelo é obrigatório"))]
    pub model: String,

    pub year: i32,

    #[validate(length(max = 30))]
    pub color: Option<String>,

    /// List price, two decimal places.
    pub price: Decimal,

    pub mileage: i32,

    /// Factory equipment summary, e.g. "i-shift, engine brake, adaptive cruise".
    #[validate(length(max = 500))]
    pub equipment: Option<String>,

    #[validate(length(max = 50))]
    pub engine_version: Option<String>,

    /// Intended application, e.g. "long haul", "construction".
    #[validate(length(max = 100))]
    pub application: Option<String>,

    /// A vehicle may be unowned (dealership stock).
    pub owner_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::owner::Entity",
        from = "Column::OwnerId",
        to = "super::owner::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::sale::Entity")]
    Sales,
}

impl Related<super::owner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
