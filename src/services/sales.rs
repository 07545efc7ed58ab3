use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::db::DbPool;
use crate::entities::{sale, salesperson, vehicle};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Payload for registering a sale. An unset `sale_date` is stamped with
/// the current timestamp at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub vehicle_id: String,
    pub salesperson_id: i32,
    pub sale_date: Option<DateTime<Utc>>,
    pub final_price: Decimal,
}

/// A sale with its denormalized vehicle and salesperson, so callers see
/// the full picture without a second round trip.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetails {
    pub sale: sale::Model,
    pub vehicle: Option<vehicle::Model>,
    pub salesperson: Option<salesperson::Model>,
}

/// Enforces the sale invariants and commits sale records.
#[derive(Clone)]
pub struct SaleService {
    db: Arc<DbPool>,
    events: EventSender,
}

impl SaleService {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// Lists sales newest first, with vehicle and salesperson attached.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<SaleDetails>, ServiceError> {
        let db = self.db.as_ref();

        let sales = sale::Entity::find()
            .order_by_desc(sale::Column::SaleDate)
            .all(db)
            .await?;

        if sales.is_empty() {
            return Ok(Vec::new());
        }

        let chassis: Vec<String> = sales.iter().map(|s| s.vehicle_id.clone()).collect();
        let seller_ids: Vec<i32> = sales.iter().map(|s| s.salesperson_id).collect();

        let vehicles = vehicle::Entity::find()
            .filter(vehicle::Column::Chassis.is_in(chassis))
            .all(db)
            .await?;
        let salespeople = salesperson::Entity::find()
            .filter(salesperson::Column::Id.is_in(seller_ids))
            .all(db)
            .await?;

        Ok(sales
            .into_iter()
            .map(|sale| {
                let vehicle = vehicles.iter().find(|v| v.chassis == sale.vehicle_id).cloned();
                let salesperson = salespeople
                    .iter()
                    .find(|s| s.id == sale.salesperson_id)
                    .cloned();
                SaleDetails {
                    sale,
                    vehicle,
                    salesperson,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<SaleDetails, ServiceError> {
        let db = self.db.as_ref();

        let sale = sale::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Venda não encontrada".to_string()))?;

        let vehicle = vehicle::Entity::find_by_id(sale.vehicle_id.clone())
            .one(db)
            .await?;
        let salesperson = salesperson::Entity::find_by_id(sale.salesperson_id)
            .one(db)
            .await?;

        Ok(SaleDetails {
            sale,
            vehicle,
            salesperson,
        })
    }

    /// Registers a sale. The checks run in a fixed order and the first
    /// failure wins; each rejection is attributable to exactly one rule:
    ///
    /// 1. the vehicle must exist
    /// 2. the salesperson must exist
    /// 3. the vehicle must not have been sold before
    /// 4. the final price must be positive
    ///
    /// A vehicle sells exactly once; the unique index on `sales.vehicle_id`
    /// backs check 3 under concurrent registration.
    #[instrument(skip(self, new_sale), fields(vehicle_id = %new_sale.vehicle_id))]
    pub async fn register(&self, new_sale: NewSale) -> Result<SaleDetails, ServiceError> {
        let db = self.db.as_ref();

        let vehicle = vehicle::Entity::find_by_id(new_sale.vehicle_id.clone())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Veículo não encontrado".to_string()))?;

        let salesperson = salesperson::Entity::find_by_id(new_sale.salesperson_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendedor não encontrado".to_string()))?;

        let already_sold = sale::Entity::find()
            .filter(sale::Column::VehicleId.eq(new_sale.vehicle_id.as_str()))
            .one(db)
            .await?
            .is_some();
        if already_sold {
            return Err(ServiceError::AlreadySold(
                "Este veículo já foi vendido".to_string(),
            ));
        }

        if new_sale.final_price <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Valor final deve ser maior que zero".to_string(),
            ));
        }

        let sale_date = effective_sale_date(new_sale.sale_date);

        let active = sale::ActiveModel {
            id: NotSet,
            vehicle_id: Set(new_sale.vehicle_id.clone()),
            salesperson_id: Set(new_sale.salesperson_id),
            sale_date: Set(sale_date),
            final_price: Set(new_sale.final_price),
        };

        let created = active.insert(db).await.map_err(|err| {
            ServiceError::from_unique_violation(
                err,
                ServiceError::AlreadySold("Este veículo já foi vendido".to_string()),
            )
        })?;

        info!(sale_id = created.id, vehicle_id = %created.vehicle_id, "sale registered");
        self.events
            .send(Event::SaleRegistered {
                id: created.id,
                vehicle_id: created.vehicle_id.clone(),
            })
            .await;

        Ok(SaleDetails {
            sale: created,
            vehicle: Some(vehicle),
            salesperson: Some(salesperson),
        })
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let sale = sale::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Venda não encontrada".to_string()))?;

        sale::Entity::delete_by_id(sale.id).exec(db).await?;
        info!(sale_id = id, "sale removed");
        Ok(())
    }
}

/// The date written with the sale: the caller's, or the current instant
/// when none was supplied.
fn effective_sale_date(requested: Option<DateTime<Utc>>) -> DateTime<Utc> {
    requested.unwrap_or_else(Utc::now)
}
