use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db::DbPool;
use crate::entities::part::{self, DEFAULT_STOCK_MINIMUM};
use crate::entities::part_order_item;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Payload for registering a new part.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PartInput {
    #[validate(length(min = 1, max = 20, message = "Código da peça é obrigatório"))]
    pub part_code: String,
    #[validate(length(min = 1, max = 200, message = "Nome é obrigatório"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_on_hand: i32,
    /// Defaults to `DEFAULT_STOCK_MINIMUM` when unset.
    pub stock_minimum: Option<i32>,
    pub category: Option<String>,
    pub compatible_models: Option<String>,
}

/// Outcome of a stock adjustment, including the low-stock signal the
/// caller surfaces to operators.
#[derive(Debug, Clone, Serialize)]
pub struct StockStatus {
    pub part_id: i32,
    pub name: String,
    pub stock_on_hand: i32,
    pub stock_minimum: i32,
    pub low_stock: bool,
}

/// Part CRUD, the part-code uniqueness guard, and the stock adjuster.
#[derive(Clone)]
pub struct PartService {
    db: Arc<DbPool>,
    events: EventSender,
}

impl PartService {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// Exclusion-aware uniqueness guard over the part code.
    pub async fn part_code_is_unique(
        &self,
        part_code: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool, ServiceError> {
        let mut query = part::Entity::find().filter(part::Column::PartCode.eq(part_code));
        if let Some(id) = exclude_id {
            query = query.filter(part::Column::Id.ne(id));
        }

        Ok(query.one(self.db.as_ref()).await?.is_none())
    }

    /// Lists parts by name, optionally restricted to one category and to
    /// parts at or below their reorder threshold.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        category: Option<&str>,
        low_stock_only: bool,
    ) -> Result<Vec<part::Model>, ServiceError> {
        let mut query = part::Entity::find();

        if let Some(category) = category {
            query = query.filter(part::Column::Category.eq(category));
        }
        if low_stock_only {
            query = query.filter(
                Expr::col(part::Column::StockOnHand).lte(Expr::col(part::Column::StockMinimum)),
            );
        }

        Ok(query
            .order_by_asc(part::Column::Name)
            .all(self.db.as_ref())
            .await?)
    }

    /// Parts whose compatibility list mentions the given model, ordered by
    /// category then name.
    #[instrument(skip(self))]
    pub async fn compatible_with(&self, model: &str) -> Result<Vec<part::Model>, ServiceError> {
        Ok(part::Entity::find()
            .filter(part::Column::CompatibleModels.contains(model))
            .order_by_asc(part::Column::Category)
            .order_by_asc(part::Column::Name)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<part::Model, ServiceError> {
        part::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Peça não encontrada".to_string()))
    }

    #[instrument(skip(self, input), fields(part_code = %input.part_code))]
    pub async fn create(&self, input: PartInput) -> Result<part::Model, ServiceError> {
        input.validate()?;

        if input.stock_on_hand < 0 {
            return Err(ServiceError::NegativeStock(
                "Estoque não pode ser negativo".to_string(),
            ));
        }
        if !self.part_code_is_unique(&input.part_code, None).await? {
            return Err(ServiceError::DuplicateKey(
                "Código de peça já cadastrado".to_string(),
            ));
        }

        let active = part::ActiveModel {
            id: NotSet,
            part_code: Set(input.part_code),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            stock_on_hand: Set(input.stock_on_hand),
            stock_minimum: Set(input.stock_minimum.unwrap_or(DEFAULT_STOCK_MINIMUM)),
            category: Set(input.category),
            compatible_models: Set(input.compatible_models),
        };

        let created = active.insert(self.db.as_ref()).await.map_err(|err| {
            ServiceError::from_unique_violation(
                err,
                ServiceError::DuplicateKey("Código de peça já cadastrado".to_string()),
            )
        })?;

        info!(part_id = created.id, "part created");
        Ok(created)
    }

    #[instrument(skip(self, part))]
    pub async fn update(&self, id: i32, part: part::Model) -> Result<part::Model, ServiceError> {
        if id != part.id {
            return Err(ServiceError::KeyMismatch("ID não corresponde".to_string()));
        }
        part.validate()?;

        if part.stock_on_hand < 0 {
            return Err(ServiceError::NegativeStock(
                "Estoque não pode ser negativo".to_string(),
            ));
        }
        if !self.part_code_is_unique(&part.part_code, Some(id)).await? {
            return Err(ServiceError::DuplicateKey(
                "Código de peça já cadastrado".to_string(),
            ));
        }

        let active = part::ActiveModel {
            id: Set(part.id),
            part_code: Set(part.part_code),
            name: Set(part.name),
            description: Set(part.description),
            price: Set(part.price),
            stock_on_hand: Set(part.stock_on_hand),
            stock_minimum: Set(part.stock_minimum),
            category: Set(part.category),
            compatible_models: Set(part.compatible_models),
        };

        match active.update(self.db.as_ref()).await {
            Ok(updated) => Ok(updated),
            Err(DbErr::RecordNotUpdated) => {
                let exists = part::Entity::find_by_id(id)
                    .one(self.db.as_ref())
                    .await?
                    .is_some();
                if exists {
                    Err(ServiceError::ConcurrentModification(format!("Peça {id}")))
                } else {
                    Err(ServiceError::NotFound("Peça não encontrada".to_string()))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Applies a signed delta to a part's stock. A delta that would drive
    /// the stock negative is rejected before anything is written, so the
    /// stored value is never partially applied.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, id: i32, delta: i32) -> Result<StockStatus, ServiceError> {
        let db = self.db.as_ref();

        let part = part::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Peça não encontrada".to_string()))?;

        let new_stock = part.stock_on_hand.checked_add(delta).ok_or_else(|| {
            ServiceError::InvalidInput("Ajuste de estoque fora do intervalo".to_string())
        })?;

        if new_stock < 0 {
            return Err(ServiceError::NegativeStock(
                "Estoque não pode ser negativo".to_string(),
            ));
        }

        let active = part::ActiveModel {
            id: Set(part.id),
            stock_on_hand: Set(new_stock),
            ..Default::default()
        };
        let updated = active.update(db).await?;

        let low_stock = updated.stock_on_hand <= updated.stock_minimum;
        if low_stock {
            warn!(part_id = updated.id, stock = updated.stock_on_hand, "part at or below minimum stock");
        }

        self.events
            .send(Event::StockAdjusted {
                part_id: updated.id,
                new_stock: updated.stock_on_hand,
                low_stock,
            })
            .await;

        Ok(StockStatus {
            part_id: updated.id,
            name: updated.name,
            stock_on_hand: updated.stock_on_hand,
            stock_minimum: updated.stock_minimum,
            low_stock,
        })
    }

    /// True when any order line references the part.
    pub async fn has_order_items(&self, id: i32) -> Result<bool, ServiceError> {
        Ok(part_order_item::Entity::find()
            .filter(part_order_item::Column::PartId.eq(id))
            .one(self.db.as_ref())
            .await?
            .is_some())
    }

    /// Removes a part. Parts referenced by order lines are never removed.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let part = part::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Peça não encontrada".to_string()))?;

        if self.has_order_items(id).await? {
            return Err(ServiceError::InvalidInput(
                "Não é possível deletar peça com pedidos registrados".to_string(),
            ));
        }

        part::Entity::delete_by_id(part.id).exec(db).await?;
        info!(part_id = id, "part removed");
        Ok(())
    }
}
