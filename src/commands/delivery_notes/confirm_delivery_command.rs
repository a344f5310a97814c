use super::{ensure_pending, find_note};
use crate::{
    commands::Command,
    db::DbPool,
    entities::{delivery_note, DeliveryNoteStatus, TransactionCategory, TransactionType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        self,
        cash_ledger::{CashLedgerService, NewCashTransaction},
    },
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Moves a pending note to `terkirim` and pays out its route allowance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDeliveryCommand {
    pub note_id: Uuid,
    pub delivery_date: NaiveDate,
    pub quantity_delivered: Decimal,
    #[serde(skip)]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    pub note: delivery_note::Model,
    /// `None` when no allowance entry was written
    pub cash_transaction_id: Option<Uuid>,
}

#[async_trait::async_trait]
impl Command for ConfirmDeliveryCommand {
    type Result = DeliveryConfirmation;

    #[instrument(skip(self, db_pool, event_sender), fields(note_id = %self.note_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let note = self.mark_delivered(&db_pool).await?;

        counter!("surat_jalan_delivery_notes_delivered_total", 1);
        info!(
            note_id = %note.id,
            document_number = %note.document_number,
            quantity_delivered = %self.quantity_delivered,
            "Delivery confirmed"
        );
        event_sender
            .send_or_log(Event::DeliveryNoteDelivered {
                note_id: note.id,
                document_number: note.document_number.clone(),
                delivery_date: self.delivery_date,
                quantity_delivered: self.quantity_delivered,
            })
            .await;

        // The status change is already committed; the allowance entry is best-effort.
        let cash_transaction_id = self.record_allowance(&note, db_pool, event_sender).await;

        Ok(DeliveryConfirmation {
            note,
            cash_transaction_id,
        })
    }
}

impl ConfirmDeliveryCommand {
    async fn mark_delivered(&self, db: &DbPool) -> Result<delivery_note::Model, ServiceError> {
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let note = find_note(&txn, self.note_id).await?;
        ensure_pending(&note)?;

        if self.quantity_delivered <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity delivered must be greater than 0".to_string(),
            ));
        }
        if !services::is_storable(&self.quantity_delivered) {
            return Err(ServiceError::ValidationError(format!(
                "Quantity delivered must have at most {} decimal places",
                services::MAX_DECIMAL_PLACES
            )));
        }
        if self.quantity_delivered > note.quantity_loaded {
            return Err(ServiceError::ValidationError(format!(
                "Quantity delivered must not exceed the loaded quantity of {} {}",
                note.quantity_loaded, note.unit
            )));
        }

        let mut model: delivery_note::ActiveModel = note.into();
        model.status = Set(DeliveryNoteStatus::Delivered);
        model.delivery_date = Set(Some(self.delivery_date));
        model.quantity_delivered = Set(Some(self.quantity_delivered));
        model.updated_at = Set(Utc::now());
        model.updated_by = Set(Some(self.actor.clone()));

        let updated = model.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }

    /// Writes the `uang_jalan` outflow for a delivered note. Failures are logged, never returned.
    async fn record_allowance(
        &self,
        note: &delivery_note::Model,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Option<Uuid> {
        if note.route_allowance <= Decimal::ZERO {
            warn!(
                document_number = %note.document_number,
                route = %note.route_name,
                "Route has no allowance; no cash entry recorded"
            );
            return None;
        }

        let entry = NewCashTransaction {
            date: self.delivery_date,
            transaction_type: TransactionType::Outflow,
            category: TransactionCategory::RouteAllowance,
            amount: note.route_allowance,
            description: format!("Uang Jalan - {} ({})", note.document_number, note.route_name),
            delivery_note_id: Some(note.id),
            delivery_note_number: Some(note.document_number.clone()),
        };

        match CashLedgerService::new(db_pool, event_sender)
            .record(entry, &self.actor)
            .await
        {
            Ok(tx) => Some(tx.id),
            Err(e) => {
                counter!("surat_jalan_allowance_ledger_failures_total", 1);
                error!(
                    error = %e,
                    document_number = %note.document_number,
                    "Delivery confirmed but route allowance was not recorded"
                );
                None
            }
        }
    }
}
