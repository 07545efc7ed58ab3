use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A vehicle owner. The tax id (CPF/CNPJ) is a unique natural key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "owners")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[validate(length(min = 1, max = 100, message = "Nome é obrigatório"))]
    pub name: String,

    #[sea_orm(column_name = "tax_id")]
    #[validate(length(min = 1, max = 18, message = "CPF/CNPJ é obrigatório"))]
    pub tax_id: String,

    #[validate(length(max = 200))]
    pub address: Option<String>,

    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 500))]
    pub personal_data: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vehicle::Entity")]
    Vehicles,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
