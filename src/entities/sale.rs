use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A completed sale. At most one sale may ever reference a given vehicle;
/// the `sales.vehicle_id` unique index is the authoritative guard.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub vehicle_id: String,

    pub salesperson_id: i32,

    pub sale_date: DateTime<Utc>,

    pub final_price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Chassis"
    )]
    Vehicle,
    #[sea_orm(
        belongs_to = "super::salesperson::Entity",
        from = "Column::SalespersonId",
        to = "super::salesperson::Column::Id"
    )]
    Salesperson,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl Related<super::salesperson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Salesperson.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
