pub mod confirm_delivery_command;
pub mod create_delivery_note_command;
pub mod mark_delivery_failed_command;
pub mod set_invoice_command;

pub use confirm_delivery_command::{ConfirmDeliveryCommand, DeliveryConfirmation};
pub use create_delivery_note_command::CreateDeliveryNoteCommand;
pub use mark_delivery_failed_command::MarkDeliveryFailedCommand;
pub use set_invoice_command::SetInvoiceCommand;

use crate::{entities::delivery_note, errors::ServiceError};
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

pub(crate) async fn find_note<C: ConnectionTrait>(
    db: &C,
    note_id: Uuid,
) -> Result<delivery_note::Model, ServiceError> {
    delivery_note::Entity::find_by_id(note_id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Delivery note {} not found", note_id)))
}

/// Only pending notes may change status.
pub(crate) fn ensure_pending(note: &delivery_note::Model) -> Result<(), ServiceError> {
    if note.is_pending() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Delivery note {} is already {}",
            note.document_number, note.status
        )))
    }
}
