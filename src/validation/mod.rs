//! Vehicle registration rule pipeline.
//!
//! Each rule is an independent read-only check over the candidate vehicle
//! and the store. Rules run in registration order and the first failure
//! wins; later rules never execute. No rule may assume another already ran.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{owner, vehicle};
use crate::errors::ServiceError;

/// One link of the vehicle validation pipeline. Implementations may read
/// the store to answer existence or uniqueness questions, never write it.
#[async_trait]
pub trait VehicleRule: Send + Sync {
    async fn check(
        &self,
        candidate: &vehicle::Model,
        db: &DatabaseConnection,
    ) -> Result<(), ServiceError>;
}

/// Rejects a chassis that is already registered.
pub struct ChassisIsUnique;

#[async_trait]
impl VehicleRule for ChassisIsUnique {
    async fn check(
        &self,
        candidate: &vehicle::Model,
        db: &DatabaseConnection,
    ) -> Result<(), ServiceError> {
        let exists = vehicle::Entity::find()
            .filter(vehicle::Column::Chassis.eq(candidate.chassis.as_str()))
            .one(db)
            .await?
            .is_some();

        if exists {
            return Err(ServiceError::DuplicateKey(
                "Chassi já cadastrado no sistema.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rejects a referenced owner that does not exist. Vehicles without an
/// owner (dealership stock) pass trivially.
pub struct OwnerExists;

#[async_trait]
impl VehicleRule for OwnerExists {
    async fn check(
        &self,
        candidate: &vehicle::Model,
        db: &DatabaseConnection,
    ) -> Result<(), ServiceError> {
        let Some(owner_id) = candidate.owner_id else {
            return Ok(());
        };

        let exists = owner::Entity::find_by_id(owner_id)
            .one(db)
            .await?
            .is_some();

        if !exists {
            return Err(ServiceError::NotFound(
                "O Proprietário informado não foi encontrado.".to_string(),
            ));
        }
        Ok(())
    }
}

/// An ordered collection of rules, composed by the caller. An empty
/// pipeline succeeds trivially.
pub struct VehicleValidator {
    rules: Vec<Box<dyn VehicleRule>>,
}

impl VehicleValidator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: impl VehicleRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Pipeline for new registrations: uniqueness before foreign-key
    /// existence. The order is a configuration decision, not a hidden
    /// dependency between rules.
    pub fn registration() -> Self {
        Self::new().with_rule(ChassisIsUnique).with_rule(OwnerExists)
    }

    /// Pipeline for updates. The record's own chassis would collide with
    /// itself, so only the owner reference is re-checked.
    pub fn update() -> Self {
        Self::new().with_rule(OwnerExists)
    }

    pub async fn validate(
        &self,
        candidate: &vehicle::Model,
        db: &DatabaseConnection,
    ) -> Result<(), ServiceError> {
        for rule in &self.rules {
            rule.check(candidate, db).await?;
        }
        Ok(())
    }
}

impl Default for VehicleValidator {
    fn default() -> Self {
        Self::registration()
    }
}
