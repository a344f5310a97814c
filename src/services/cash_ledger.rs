use crate::{
    db::DbPool,
    entities::{
        cash_balance::{self, BALANCE_ROW_ID},
        cash_transaction::{self, TransactionCategory, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{not_blank, positive};

/// Input for a new ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCashTransaction {
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    #[serde(default = "default_category")]
    pub category: TransactionCategory,
    #[validate(custom = "positive")]
    pub amount: Decimal,
    #[validate(custom = "not_blank")]
    pub description: String,
    #[serde(default)]
    pub delivery_note_id: Option<Uuid>,
    #[serde(default)]
    pub delivery_note_number: Option<String>,
}

fn default_category() -> TransactionCategory {
    TransactionCategory::Manual
}

/// Inflow, outflow and closing balance for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCashSummary {
    pub date: NaiveDate,
    pub total_inflow: Decimal,
    pub total_outflow: Decimal,
    pub transaction_count: usize,
    /// Balance including every transaction dated on or before `date`
    pub balance: Decimal,
}

/// Signed sum of a set of transactions: inflows add, outflows subtract.
pub fn signed_total<'a, I>(transactions: I) -> Decimal
where
    I: IntoIterator<Item = &'a cash_transaction::Model>,
{
    transactions
        .into_iter()
        .map(cash_transaction::Model::signed_amount)
        .sum()
}

/// Append-only cash log with a cached running balance.
///
/// The log is the source of truth. The cache row is adjusted after every
/// insert/delete and verified (and rewritten if stale) whenever the current
/// balance is read.
#[derive(Clone)]
pub struct CashLedgerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CashLedgerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(amount = %input.amount, kind = %input.transaction_type))]
    pub async fn record(
        &self,
        input: NewCashTransaction,
        actor: &str,
    ) -> Result<cash_transaction::Model, ServiceError> {
        input.validate()?;

        let model = cash_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            date: Set(input.date),
            transaction_type: Set(input.transaction_type),
            category: Set(input.category),
            amount: Set(input.amount),
            description: Set(input.description.trim().to_string()),
            delivery_note_id: Set(input.delivery_note_id),
            delivery_note_number: Set(input.delivery_note_number),
            created_at: Set(Utc::now()),
            created_by: Set(actor.to_string()),
        };

        let created = model.insert(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, "Failed to record cash transaction");
            ServiceError::db_error(e)
        })?;

        let delta = created.signed_amount();
        if let Err(e) = self.adjust_cached_balance(delta).await {
            // The next balance read recomputes from the log.
            warn!(error = %e, transaction_id = %created.id, "Cash balance cache not updated");
        }

        counter!("surat_jalan_cash_transactions_recorded_total", 1, "category" => created.category.to_string());
        info!(transaction_id = %created.id, "Cash transaction recorded");
        self.event_sender
            .send_or_log(Event::CashTransactionRecorded {
                transaction_id: created.id,
                signed_amount: delta,
            })
            .await;

        Ok(created)
    }

    /// Removes an entry and reverses its effect on the cached balance.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<cash_transaction::Model, ServiceError> {
        let existing = self.get(id).await?;

        cash_transaction::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let delta = -existing.signed_amount();
        if let Err(e) = self.adjust_cached_balance(delta).await {
            warn!(error = %e, transaction_id = %id, "Cash balance cache not updated after delete");
        }

        info!(transaction_id = %id, "Cash transaction deleted");
        self.event_sender
            .send_or_log(Event::CashTransactionDeleted {
                transaction_id: id,
                signed_amount: existing.signed_amount(),
            })
            .await;

        Ok(existing)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<cash_transaction::Model, ServiceError> {
        cash_transaction::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Cash transaction {} not found", id)))
    }

    /// Every entry, newest date first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<cash_transaction::Model>, ServiceError> {
        cash_transaction::Entity::find()
            .order_by_desc(cash_transaction::Column::Date)
            .order_by_desc(cash_transaction::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Entries dated within `[start, end]`, newest first.
    #[instrument(skip(self))]
    pub async fn list_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<cash_transaction::Model>, ServiceError> {
        if start > end {
            return Err(ServiceError::ValidationError(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        cash_transaction::Entity::find()
            .filter(cash_transaction::Column::Date.gte(start))
            .filter(cash_transaction::Column::Date.lte(end))
            .order_by_desc(cash_transaction::Column::Date)
            .order_by_desc(cash_transaction::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn list_for_delivery_note(
        &self,
        delivery_note_id: Uuid,
    ) -> Result<Vec<cash_transaction::Model>, ServiceError> {
        cash_transaction::Entity::find()
            .filter(cash_transaction::Column::DeliveryNoteId.eq(delivery_note_id))
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Current balance, recomputed from the log. A missing or stale cache row is rewritten.
    #[instrument(skip(self))]
    pub async fn current_balance(&self) -> Result<Decimal, ServiceError> {
        let transactions = cash_transaction::Entity::find()
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        let recomputed = signed_total(&transactions);

        let cached = cash_balance::Entity::find_by_id(BALANCE_ROW_ID)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let cached_value = cached.as_ref().map(|row| row.balance);
        if cached_value != Some(recomputed) {
            warn!(
                cached = ?cached_value,
                recomputed = %recomputed,
                "Cached cash balance out of sync, repairing"
            );
            counter!("surat_jalan_cash_balance_repairs_total", 1);
            if let Err(e) = self.write_cached_balance(cached, recomputed).await {
                error!(error = %e, "Failed to repair cached cash balance");
            }
            self.event_sender
                .send_or_log(Event::CashBalanceRepaired {
                    cached: cached_value,
                    recomputed,
                })
                .await;
        }

        Ok(recomputed)
    }

    /// Signed sum over entries dated on or before `date`. Never touches the cache.
    #[instrument(skip(self))]
    pub async fn balance_as_of(&self, date: NaiveDate) -> Result<Decimal, ServiceError> {
        let transactions = cash_transaction::Entity::find()
            .filter(cash_transaction::Column::Date.lte(date))
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(signed_total(&transactions))
    }

    #[instrument(skip(self))]
    pub async fn daily_summary(&self, date: NaiveDate) -> Result<DailyCashSummary, ServiceError> {
        let day = self.list_by_date_range(date, date).await?;
        let (total_inflow, total_outflow) =
            day.iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(inflow, outflow), tx| {
                    match tx.transaction_type {
                        TransactionType::Inflow => (inflow + tx.amount, outflow),
                        TransactionType::Outflow => (inflow, outflow + tx.amount),
                    }
                });
        let balance = self.balance_as_of(date).await?;
        Ok(DailyCashSummary {
            date,
            total_inflow,
            total_outflow,
            transaction_count: day.len(),
            balance,
        })
    }

    async fn adjust_cached_balance(&self, delta: Decimal) -> Result<(), ServiceError> {
        let cached = cash_balance::Entity::find_by_id(BALANCE_ROW_ID)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        match cached {
            Some(row) => {
                let next = row.balance + delta;
                self.write_cached_balance(Some(row), next).await
            }
            // No cache yet: seed it from the full log, which already includes this change.
            None => {
                let transactions = cash_transaction::Entity::find()
                    .all(&*self.db_pool)
                    .await
                    .map_err(ServiceError::db_error)?;
                self.write_cached_balance(None, signed_total(&transactions))
                    .await
            }
        }
    }

    async fn write_cached_balance(
        &self,
        existing: Option<cash_balance::Model>,
        balance: Decimal,
    ) -> Result<(), ServiceError> {
        match existing {
            Some(row) => {
                let mut model: cash_balance::ActiveModel = row.into();
                model.balance = Set(balance);
                model.updated_at = Set(Utc::now());
                model
                    .update(&*self.db_pool)
                    .await
                    .map_err(ServiceError::db_error)?;
            }
            None => {
                cash_balance::ActiveModel {
                    id: Set(BALANCE_ROW_ID),
                    balance: Set(balance),
                    updated_at: Set(Utc::now()),
                }
                .insert(&*self.db_pool)
                .await
                .map_err(ServiceError::db_error)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(kind: TransactionType, amount: Decimal) -> cash_transaction::Model {
        cash_transaction::Model {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            transaction_type: kind,
            category: TransactionCategory::Manual,
            amount,
            description: "test".into(),
            delivery_note_id: None,
            delivery_note_number: None,
            created_at: Utc::now(),
            created_by: "tester".into(),
        }
    }

    #[test]
    fn signed_total_nets_inflows_against_outflows() {
        let log = vec![
            tx(TransactionType::Inflow, dec!(1000000)),
            tx(TransactionType::Outflow, dec!(500000)),
            tx(TransactionType::Outflow, dec!(125000.50)),
        ];
        assert_eq!(signed_total(&log), dec!(374999.50));
        assert_eq!(signed_total(&Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn amount_must_be_positive() {
        let input = NewCashTransaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            transaction_type: TransactionType::Inflow,
            category: TransactionCategory::Manual,
            amount: Decimal::ZERO,
            description: "Setoran".into(),
            delivery_note_id: None,
            delivery_note_number: None,
        };
        assert!(input.validate().is_err());
    }
}
