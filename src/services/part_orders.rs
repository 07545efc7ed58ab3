use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{part, part_order, part_order_item, salesperson, PartOrderStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// One requested line of a new parts order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartOrderItem {
    pub part_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Payload for placing a parts order. An unset `order_date` is stamped
/// with the current timestamp at commit time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPartOrder {
    #[validate(length(min = 1, max = 100, message = "Nome do cliente é obrigatório"))]
    pub customer_name: String,
    pub customer_tax_id: Option<String>,
    pub customer_phone: Option<String>,
    pub salesperson_id: Option<i32>,
    pub order_date: Option<DateTime<Utc>>,
    pub items: Vec<NewPartOrderItem>,
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct PartOrderDetails {
    pub order: part_order::Model,
    pub items: Vec<part_order_item::Model>,
}

/// Parts-order lifecycle: creation with owned lines, status transitions,
/// and cascade removal.
#[derive(Clone)]
pub struct PartOrderService {
    db: Arc<DbPool>,
    events: EventSender,
}

impl PartOrderService {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self { db, events }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<part_order::Model>, ServiceError> {
        Ok(part_order::Entity::find()
            .order_by_desc(part_order::Column::OrderDate)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<PartOrderDetails, ServiceError> {
        let db = self.db.as_ref();

        let order = part_order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Pedido não encontrado".to_string()))?;

        let items = part_order_item::Entity::find()
            .filter(part_order_item::Column::PartOrderId.eq(id))
            .all(db)
            .await?;

        Ok(PartOrderDetails { order, items })
    }

    /// Places an order. Every referenced part must exist, quantities must
    /// be positive, and line subtotals plus the order total are computed
    /// here, never trusted from the caller. The order and its lines commit
    /// in one transaction.
    #[instrument(skip(self, new_order), fields(customer = %new_order.customer_name))]
    pub async fn create(&self, new_order: NewPartOrder) -> Result<PartOrderDetails, ServiceError> {
        new_order.validate()?;

        if new_order.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Pedido deve ter ao menos um item".to_string(),
            ));
        }

        let db = self.db.as_ref();

        if let Some(salesperson_id) = new_order.salesperson_id {
            let exists = salesperson::Entity::find_by_id(salesperson_id)
                .one(db)
                .await?
                .is_some();
            if !exists {
                return Err(ServiceError::NotFound("Vendedor não encontrado".to_string()));
            }
        }

        let mut lines: Vec<(NewPartOrderItem, Decimal)> = Vec::with_capacity(new_order.items.len());
        for item in &new_order.items {
            if item.quantity <= 0 {
                return Err(ServiceError::InvalidInput(
                    "Quantidade deve ser maior que zero".to_string(),
                ));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(ServiceError::InvalidInput(
                    "Preço unitário não pode ser negativo".to_string(),
                ));
            }

            let part_exists = part::Entity::find_by_id(item.part_id).one(db).await?.is_some();
            if !part_exists {
                return Err(ServiceError::NotFound("Peça não encontrada".to_string()));
            }

            let subtotal = Decimal::from(item.quantity) * item.unit_price;
            lines.push((item.clone(), subtotal));
        }

        let total_value: Decimal = lines.iter().map(|(_, subtotal)| *subtotal).sum();
        let order_date = new_order.order_date.unwrap_or_else(Utc::now);

        let details = db
            .transaction::<_, PartOrderDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = part_order::ActiveModel {
                        id: NotSet,
                        order_date: Set(order_date),
                        customer_name: Set(new_order.customer_name),
                        customer_tax_id: Set(new_order.customer_tax_id),
                        customer_phone: Set(new_order.customer_phone),
                        total_value: Set(total_value),
                        status: Set(PartOrderStatus::Pending),
                        salesperson_id: Set(new_order.salesperson_id),
                    }
                    .insert(txn)
                    .await?;

                    let mut items = Vec::with_capacity(lines.len());
                    for (line, subtotal) in lines {
                        let item = part_order_item::ActiveModel {
                            id: NotSet,
                            part_order_id: Set(order.id),
                            part_id: Set(line.part_id),
                            quantity: Set(line.quantity),
                            unit_price: Set(line.unit_price),
                            subtotal: Set(subtotal),
                        }
                        .insert(txn)
                        .await?;
                        items.push(item);
                    }

                    Ok(PartOrderDetails { order, items })
                })
            })
            .await?;

        info!(order_id = details.order.id, "parts order created");
        self.events
            .send(Event::PartOrderCreated {
                id: details.order.id,
            })
            .await;

        Ok(details)
    }

    /// Moves an order to a new status. Delivered and Cancelled are
    /// terminal; no transition leaves them.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: i32,
        status: PartOrderStatus,
    ) -> Result<part_order::Model, ServiceError> {
        let db = self.db.as_ref();

        let order = part_order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Pedido não encontrado".to_string()))?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidInput(format!(
                "Pedido {} não pode mudar de status",
                order.status
            )));
        }

        let old_status = order.status;
        let active = part_order::ActiveModel {
            id: Set(order.id),
            status: Set(status),
            ..Default::default()
        };
        let updated = active.update(db).await?;

        info!(order_id = id, from = %old_status, to = %updated.status, "order status changed");
        self.events
            .send(Event::PartOrderStatusChanged {
                id,
                old: old_status.to_string(),
                new: updated.status.to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Removes an order and its lines in one transaction. Lines are owned
    /// exclusively by the order (cascade policy).
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let order = part_order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Pedido não encontrado".to_string()))?;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                part_order_item::Entity::delete_many()
                    .filter(part_order_item::Column::PartOrderId.eq(order.id))
                    .exec(txn)
                    .await?;

                part_order::Entity::delete_by_id(order.id).exec(txn).await?;
                Ok(())
            })
        })
        .await?;

        info!(order_id = id, "parts order removed");
        Ok(())
    }
}
