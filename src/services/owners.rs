use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{owner, vehicle};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Payload for registering a new owner.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OwnerInput {
    #[validate(length(min = 1, max = 100, message = "Nome é obrigatório"))]
    pub name: String,
    #[validate(length(min = 1, max = 18, message = "CPF/CNPJ é obrigatório"))]
    pub tax_id: String,
    pub address: Option<String>,
    #[validate(email(message = "E-mail inválido"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub personal_data: Option<String>,
}

/// An owner with the vehicles currently assigned to them.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerDetails {
    pub owner: owner::Model,
    pub vehicles: Vec<vehicle::Model>,
}

/// Owner CRUD with the tax-id uniqueness guard.
#[derive(Clone)]
pub struct OwnerService {
    db: Arc<DbPool>,
    events: EventSender,
}

impl OwnerService {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// Exclusion-aware uniqueness guard: at creation no record is excluded;
    /// at update the record itself is, so a no-op update never collides
    /// with its own tax id.
    pub async fn tax_id_is_unique(
        &self,
        tax_id: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool, ServiceError> {
        let mut query = owner::Entity::find().filter(owner::Column::TaxId.eq(tax_id));
        if let Some(id) = exclude_id {
            query = query.filter(owner::Column::Id.ne(id));
        }

        Ok(query.one(self.db.as_ref()).await?.is_none())
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<owner::Model>, ServiceError> {
        Ok(owner::Entity::find().all(self.db.as_ref()).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<OwnerDetails, ServiceError> {
        let db = self.db.as_ref();

        let owner = owner::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Proprietário não encontrado".to_string()))?;

        let vehicles = vehicle::Entity::find()
            .filter(vehicle::Column::OwnerId.eq(id))
            .all(db)
            .await?;

        Ok(OwnerDetails { owner, vehicles })
    }

    #[instrument(skip(self, input), fields(tax_id = %input.tax_id))]
    pub async fn create(&self, input: OwnerInput) -> Result<owner::Model, ServiceError> {
        input.validate()?;

        if !self.tax_id_is_unique(&input.tax_id, None).await? {
            return Err(ServiceError::DuplicateKey("CPF/CNPJ já cadastrado".to_string()));
        }

        let active = owner::ActiveModel {
            id: NotSet,
            name: Set(input.name),
            tax_id: Set(input.tax_id),
            address: Set(input.address),
            email: Set(input.email),
            phone: Set(input.phone),
            personal_data: Set(input.personal_data),
        };

        let created = active.insert(self.db.as_ref()).await.map_err(|err| {
            ServiceError::from_unique_violation(
                err,
                ServiceError::DuplicateKey("CPF/CNPJ já cadastrado".to_string()),
            )
        })?;

        info!(owner_id = created.id, "owner created");
        self.events.send(Event::OwnerCreated { id: created.id }).await;

        Ok(created)
    }

    #[instrument(skip(self, owner))]
    pub async fn update(&self, id: i32, owner: owner::Model) -> Result<owner::Model, ServiceError> {
        if id != owner.id {
            return Err(ServiceError::KeyMismatch("ID não corresponde".to_string()));
        }
        owner.validate()?;

        if !self.tax_id_is_unique(&owner.tax_id, Some(id)).await? {
            return Err(ServiceError::DuplicateKey(
                "CPF/CNPJ já cadastrado para outro proprietário".to_string(),
            ));
        }

        let active = owner::ActiveModel {
            id: Set(owner.id),
            name: Set(owner.name),
            tax_id: Set(owner.tax_id),
            address: Set(owner.address),
            email: Set(owner.email),
            phone: Set(owner.phone),
            personal_data: Set(owner.personal_data),
        };

        match active.update(self.db.as_ref()).await {
            Ok(updated) => Ok(updated),
            Err(DbErr::RecordNotUpdated) => {
                let exists = owner::Entity::find_by_id(id)
                    .one(self.db.as_ref())
                    .await?
                    .is_some();
                if exists {
                    Err(ServiceError::ConcurrentModification(format!(
                        "Proprietário {id}"
                    )))
                } else {
                    Err(ServiceError::NotFound(
                        "Proprietário não encontrado".to_string(),
                    ))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes an owner. Vehicles referencing them are unlinked first
    /// (clear-on-parent-delete policy), in the same transaction.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let owner = owner::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Proprietário não encontrado".to_string()))?;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                vehicle::Entity::update_many()
                    .col_expr(vehicle::Column::OwnerId, Expr::value(None::<i32>))
                    .filter(vehicle::Column::OwnerId.eq(owner.id))
                    .exec(txn)
                    .await?;

                owner::Entity::delete_by_id(owner.id).exec(txn).await?;
                Ok(())
            })
        })
        .await?;

        info!(owner_id = id, "owner removed, vehicles unlinked");
        Ok(())
    }
}
