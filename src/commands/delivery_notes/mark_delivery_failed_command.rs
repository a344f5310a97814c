use super::{ensure_pending, find_note};
use crate::{
    commands::Command,
    db::DbPool,
    entities::{delivery_note, DeliveryNoteStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Moves a pending note to `gagal`. Nothing else on the note changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkDeliveryFailedCommand {
    pub note_id: Uuid,
    #[serde(skip)]
    pub actor: String,
}

#[async_trait::async_trait]
impl Command for MarkDeliveryFailedCommand {
    type Result = delivery_note::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(note_id = %self.note_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = db_pool.begin().await.map_err(ServiceError::db_error)?;

        let note = find_note(&txn, self.note_id).await?;
        ensure_pending(&note)?;

        let mut model: delivery_note::ActiveModel = note.into();
        model.status = Set(DeliveryNoteStatus::Failed);
        model.updated_at = Set(Utc::now());
        model.updated_by = Set(Some(self.actor.clone()));
        let updated = model.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        counter!("surat_jalan_delivery_notes_failed_total", 1);
        warn!(document_number = %updated.document_number, "Delivery marked as failed");
        event_sender
            .send_or_log(Event::DeliveryNoteFailed {
                note_id: updated.id,
                document_number: updated.document_number.clone(),
            })
            .await;

        Ok(updated)
    }
}
