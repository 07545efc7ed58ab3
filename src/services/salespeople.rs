use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, NotSet, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{part_order, sale, salesperson};
use crate::errors::ServiceError;

/// Flat commission rate applied to a salesperson's monthly sales total.
pub const COMMISSION_RATE: Decimal = dec!(0.01);

/// Earliest year the payroll window accepts.
pub const MIN_COMMISSION_YEAR: i32 = 2000;

/// Payload for registering a new salesperson.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SalespersonInput {
    #[validate(length(min = 1, max = 100, message = "Nome é obrigatório"))]
    pub name: String,
    pub base_salary: Decimal,
}

/// Payroll report for one salesperson over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionReport {
    pub salesperson_id: i32,
    pub name: String,
    pub month: u32,
    pub year: i32,
    pub base_salary: Decimal,
    pub total_sales: Decimal,
    pub commission: Decimal,
    pub final_salary: Decimal,
}

/// Salesperson CRUD and the commission calculator.
#[derive(Clone)]
pub struct SalespersonService {
    db: Arc<DbPool>,
}

impl SalespersonService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<salesperson::Model>, ServiceError> {
        Ok(salesperson::Entity::find().all(self.db.as_ref()).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<salesperson::Model, ServiceError> {
        salesperson::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendedor não encontrado".to_string()))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: SalespersonInput) -> Result<salesperson::Model, ServiceError> {
        input.validate()?;
        if input.base_salary <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Salário base deve ser maior que zero".to_string(),
            ));
        }

        let active = salesperson::ActiveModel {
            id: NotSet,
            name: Set(input.name),
            base_salary: Set(input.base_salary),
        };

        let created = active.insert(self.db.as_ref()).await?;
        info!(salesperson_id = created.id, "salesperson created");
        Ok(created)
    }

    #[instrument(skip(self, salesperson))]
    pub async fn update(
        &self,
        id: i32,
        salesperson: salesperson::Model,
    ) -> Result<salesperson::Model, ServiceError> {
        if id != salesperson.id {
            return Err(ServiceError::KeyMismatch("ID não corresponde".to_string()));
        }
        salesperson.validate()?;
        if salesperson.base_salary <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Salário base deve ser maior que zero".to_string(),
            ));
        }

        let active = salesperson::ActiveModel {
            id: Set(salesperson.id),
            name: Set(salesperson.name),
            base_salary: Set(salesperson.base_salary),
        };

        match active.update(self.db.as_ref()).await {
            Ok(updated) => Ok(updated),
            Err(DbErr::RecordNotUpdated) => {
                let exists = salesperson::Entity::find_by_id(id)
                    .one(self.db.as_ref())
                    .await?
                    .is_some();
                if exists {
                    Err(ServiceError::ConcurrentModification(format!("Vendedor {id}")))
                } else {
                    Err(ServiceError::NotFound("Vendedor não encontrado".to_string()))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// True when at least one sale references the salesperson. Exposed so
    /// the restrict-on-delete policy is enforced explicitly.
    pub async fn has_sales(&self, id: i32) -> Result<bool, ServiceError> {
        Ok(sale::Entity::find()
            .filter(sale::Column::SalespersonId.eq(id))
            .one(self.db.as_ref())
            .await?
            .is_some())
    }

    /// Removes a salesperson. Sales restrict the removal; parts orders only
    /// reference them informally and are unlinked (set-null policy) in the
    /// same transaction.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let salesperson = salesperson::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendedor não encontrado".to_string()))?;

        if self.has_sales(id).await? {
            return Err(ServiceError::InvalidInput(
                "Não é possível deletar vendedor com vendas registradas".to_string(),
            ));
        }

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                part_order::Entity::update_many()
                    .col_expr(part_order::Column::SalespersonId, Expr::value(None::<i32>))
                    .filter(part_order::Column::SalespersonId.eq(salesperson.id))
                    .exec(txn)
                    .await?;

                salesperson::Entity::delete_by_id(salesperson.id)
                    .exec(txn)
                    .await?;
                Ok(())
            })
        })
        .await?;

        info!(salesperson_id = id, "salesperson removed");
        Ok(())
    }

    /// Computes the payroll report for one calendar month: base salary plus
    /// the flat commission over the salesperson's sales in that window.
    ///
    /// Month is validated before year; both are checked independently of
    /// the sales data, and the summation stays in `Decimal` end to end.
    #[instrument(skip(self))]
    pub async fn commission(
        &self,
        id: i32,
        month: u32,
        year: i32,
    ) -> Result<CommissionReport, ServiceError> {
        let db = self.db.as_ref();

        let salesperson = salesperson::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendedor não encontrado".to_string()))?;

        if !(1..=12).contains(&month) {
            return Err(ServiceError::InvalidInput("Mês inválido (1-12)".to_string()));
        }

        let current_year = Utc::now().year();
        if year < MIN_COMMISSION_YEAR || year > current_year {
            return Err(ServiceError::InvalidInput("Ano inválido".to_string()));
        }

        let (window_start, window_end) = month_window(year, month)
            .ok_or_else(|| ServiceError::InvalidInput("Ano inválido".to_string()))?;

        let sales = sale::Entity::find()
            .filter(sale::Column::SalespersonId.eq(id))
            .filter(sale::Column::SaleDate.gte(window_start))
            .filter(sale::Column::SaleDate.lt(window_end))
            .all(db)
            .await?;

        let total_sales: Decimal = sales.iter().map(|s| s.final_price).sum();
        let commission = total_sales * COMMISSION_RATE;
        let final_salary = salesperson.base_salary + commission;

        Ok(CommissionReport {
            salesperson_id: salesperson.id,
            name: salesperson.name,
            month,
            year,
            base_salary: salesperson.base_salary,
            total_sales,
            commission,
            final_salary,
        })
    }
}

/// Half-open UTC window covering one calendar month.
fn month_window(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.and_hms_opt(0, 0, 0)?;

    Some((Utc.from_utc_datetime(&start), Utc.from_utc_datetime(&end)))
}
