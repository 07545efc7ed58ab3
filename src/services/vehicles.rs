use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::{info, instrument};
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{owner, sale, vehicle};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::validation::VehicleValidator;

/// A vehicle together with its owner, when one is assigned.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleDetails {
    pub vehicle: vehicle::Model,
    pub owner: Option<owner::Model>,
}

/// Orchestrates vehicle registration through the validation pipeline and
/// owns the vehicle CRUD surface.
#[derive(Clone)]
pub struct VehicleService {
    db: Arc<DbPool>,
    events: EventSender,
}

impl VehicleService {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// Lists vehicles ordered by mileage, optionally filtered by engine
    /// version.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        engine_version: Option<&str>,
    ) -> Result<Vec<vehicle::Model>, ServiceError> {
        let mut query = vehicle::Entity::find();
        if let Some(version) = engine_version {
            query = query.filter(vehicle::Column::EngineVersion.eq(version));
        }

        Ok(query
            .order_by_asc(vehicle::Column::Mileage)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, chassis: &str) -> Result<VehicleDetails, ServiceError> {
        let db = self.db.as_ref();

        let vehicle = vehicle::Entity::find_by_id(chassis.to_owned())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Veículo não encontrado".to_string()))?;

        let owner = match vehicle.owner_id {
            Some(owner_id) => owner::Entity::find_by_id(owner_id).one(db).await?,
            None => None,
        };

        Ok(VehicleDetails { vehicle, owner })
    }

    /// Registers a new vehicle. The candidate runs through the registration
    /// pipeline (chassis uniqueness, owner existence) and is persisted
    /// unmodified on success. A unique-index violation raced past the
    /// pipeline reports the same duplicate-chassis outcome.
    #[instrument(skip(self, vehicle), fields(chassis = %vehicle.chassis))]
    pub async fn register(&self, vehicle: vehicle::Model) -> Result<vehicle::Model, ServiceError> {
        vehicle.validate()?;

        let db = self.db.as_ref();
        VehicleValidator::registration().validate(&vehicle, db).await?;

        let active = vehicle::ActiveModel {
            chassis: Set(vehicle.chassis.clone()),
            model: Set(vehicle.model),
            year: Set(vehicle.year),
            color: Set(vehicle.color),
            price: Set(vehicle.price),
            mileage: Set(vehicle.mileage),
            equipment: Set(vehicle.equipment),
            engine_version: Set(vehicle.engine_version),
            application: Set(vehicle.application),
            owner_id: Set(vehicle.owner_id),
        };

        let created = active.insert(db).await.map_err(|err| {
            ServiceError::from_unique_violation(
                err,
                ServiceError::DuplicateKey("Chassi já cadastrado no sistema.".to_string()),
            )
        })?;

        info!(chassis = %created.chassis, "vehicle registered");
        self.events
            .send(Event::VehicleRegistered {
                chassis: created.chassis.clone(),
            })
            .await;

        Ok(created)
    }

    /// Updates a vehicle. The path-identified chassis must match the
    /// payload; a mismatch is an error, never silently corrected.
    #[instrument(skip(self, vehicle))]
    pub async fn update(
        &self,
        chassis: &str,
        vehicle: vehicle::Model,
    ) -> Result<vehicle::Model, ServiceError> {
        if chassis != vehicle.chassis {
            return Err(ServiceError::KeyMismatch("Chassi não corresponde".to_string()));
        }
        vehicle.validate()?;

        let db = self.db.as_ref();
        VehicleValidator::update().validate(&vehicle, db).await?;

        let active = vehicle::ActiveModel {
            chassis: Set(vehicle.chassis.clone()),
            model: Set(vehicle.model),
            year: Set(vehicle.year),
            color: Set(vehicle.color),
            price: Set(vehicle.price),
            mileage: Set(vehicle.mileage),
            equipment: Set(vehicle.equipment),
            engine_version: Set(vehicle.engine_version),
            application: Set(vehicle.application),
            owner_id: Set(vehicle.owner_id),
        };

        match active.update(db).await {
            Ok(updated) => Ok(updated),
            Err(DbErr::RecordNotUpdated) => {
                // Optimistic update lost the race. If the row vanished the
                // caller gets NotFound, otherwise a retryable conflict.
                let exists = vehicle::Entity::find_by_id(chassis.to_owned())
                    .one(db)
                    .await?
                    .is_some();
                if exists {
                    Err(ServiceError::ConcurrentModification(format!(
                        "Veículo {chassis}"
                    )))
                } else {
                    Err(ServiceError::NotFound("Veículo não encontrado".to_string()))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// True when at least one sale references the vehicle. Exposed so the
    /// restrict-on-delete policy is enforced explicitly, not by a trigger.
    pub async fn has_sales(&self, chassis: &str) -> Result<bool, ServiceError> {
        Ok(sale::Entity::find()
            .filter(sale::Column::VehicleId.eq(chassis))
            .one(self.db.as_ref())
            .await?
            .is_some())
    }

    /// Removes a vehicle. Vehicles with recorded sales are never removed.
    #[instrument(skip(self))]
    pub async fn remove(&self, chassis: &str) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let vehicle = vehicle::Entity::find_by_id(chassis.to_owned())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Veículo não encontrado".to_string()))?;

        if self.has_sales(chassis).await? {
            return Err(ServiceError::InvalidInput(
                "Não é possível deletar veículo com vendas registradas".to_string(),
            ));
        }

        vehicle::Entity::delete_by_id(vehicle.chassis.clone())
            .exec(db)
            .await?;

        info!(chassis = %vehicle.chassis, "vehicle removed");
        self.events
            .send(Event::VehicleRemoved {
                chassis: vehicle.chassis,
            })
            .await;

        Ok(())
    }
}
