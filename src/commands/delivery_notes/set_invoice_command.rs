use super::find_note;
use crate::{
    commands::Command,
    db::DbPool,
    entities::delivery_note,
    errors::ServiceError,
    events::{Event, EventSender},
    services::not_blank,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Attaches or overwrites the invoice of a delivered note.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetInvoiceCommand {
    #[serde(default)]
    pub note_id: Uuid,
    #[validate(custom = "not_blank")]
    pub invoice_number: String,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(skip)]
    pub actor: String,
}

#[async_trait::async_trait]
impl Command for SetInvoiceCommand {
    type Result = delivery_note::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(note_id = %self.note_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(format!("Invalid input: {}", e)))?;

        let db = db_pool.as_ref();
        let note = find_note(db, self.note_id).await?;
        if !note.is_delivered() {
            return Err(ServiceError::ValidationError(format!(
                "Invoice can only be set on delivered notes; {} is {}",
                note.document_number, note.status
            )));
        }

        let invoice_number = self.invoice_number.trim().to_string();
        let mut model: delivery_note::ActiveModel = note.into();
        model.invoice_number = Set(Some(invoice_number.clone()));
        model.invoice_date = Set(self.invoice_date);
        model.updated_at = Set(Utc::now());
        model.updated_by = Set(Some(self.actor.clone()));
        let updated = model.update(db).await.map_err(ServiceError::db_error)?;

        info!(document_number = %updated.document_number, invoice_number = %invoice_number, "Invoice set");
        event_sender
            .send_or_log(Event::DeliveryNoteInvoiced {
                note_id: updated.id,
                invoice_number,
            })
            .await;

        Ok(updated)
    }
}
