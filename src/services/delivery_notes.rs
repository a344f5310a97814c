use crate::{
    commands::{
        delivery_notes::{
            ConfirmDeliveryCommand, CreateDeliveryNoteCommand, DeliveryConfirmation,
            MarkDeliveryFailedCommand, SetInvoiceCommand,
        },
        Command,
    },
    db::DbPool,
    entities::{delivery_note, DeliveryNoteStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Filters for listing delivery notes; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryNoteFilter {
    pub status: Option<DeliveryNoteStatus>,
    /// Inclusive lower bound on the document date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the document date
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring of the document number
    pub search: Option<String>,
    /// Only meaningful together with `status = terkirim`
    pub invoiced: Option<bool>,
}

/// `%term%` with the LIKE wildcards in `term` matched literally (escape `\`).
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl DeliveryNoteFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(status) = self.status {
            cond = cond.add(delivery_note::Column::Status.eq(status));
        }
        if let Some(start) = self.start_date {
            cond = cond.add(delivery_note::Column::DocumentDate.gte(start));
        }
        if let Some(end) = self.end_date {
            cond = cond.add(delivery_note::Column::DocumentDate.lte(end));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            cond = cond.add(
                Expr::expr(Func::lower(Expr::col(delivery_note::Column::DocumentNumber)))
                    .like(LikeExpr::new(contains_pattern(&term.to_lowercase())).escape('\\')),
            );
        }
        match self.invoiced {
            Some(true) => cond.add(delivery_note::Column::InvoiceNumber.is_not_null()),
            Some(false) => cond.add(delivery_note::Column::InvoiceNumber.is_null()),
            None => cond,
        }
    }
}

/// Orchestrates the delivery-note lifecycle commands and read models.
#[derive(Clone)]
pub struct DeliveryNoteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DeliveryNoteService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Issues a new note in `pending` state.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        command: CreateDeliveryNoteCommand,
    ) -> Result<delivery_note::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn confirm_delivery(
        &self,
        command: ConfirmDeliveryCommand,
    ) -> Result<DeliveryConfirmation, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn mark_failed(
        &self,
        command: MarkDeliveryFailedCommand,
    ) -> Result<delivery_note::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_invoice(
        &self,
        command: SetInvoiceCommand,
    ) -> Result<delivery_note::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<delivery_note::Model, ServiceError> {
        crate::commands::delivery_notes::find_note(&*self.db_pool, id).await
    }

    /// Notes matching `filter`, newest document date first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &DeliveryNoteFilter,
    ) -> Result<Vec<delivery_note::Model>, ServiceError> {
        delivery_note::Entity::find()
            .filter(filter.condition())
            .order_by_desc(delivery_note::Column::DocumentDate)
            .order_by_desc(delivery_note::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Notes still awaiting realization.
    pub async fn list_pending(&self) -> Result<Vec<delivery_note::Model>, ServiceError> {
        self.list(&DeliveryNoteFilter {
            status: Some(DeliveryNoteStatus::Pending),
            ..Default::default()
        })
        .await
    }

    /// Delivered (invoiceable) notes, optionally only those with or without an invoice.
    pub async fn list_delivered(
        &self,
        invoiced: Option<bool>,
    ) -> Result<Vec<delivery_note::Model>, ServiceError> {
        self.list(&DeliveryNoteFilter {
            status: Some(DeliveryNoteStatus::Delivered),
            invoiced,
            ..Default::default()
        })
        .await
    }

    /// First pending note carrying `document_number`, if any.
    #[instrument(skip(self))]
    pub async fn find_pending_by_number(
        &self,
        document_number: &str,
    ) -> Result<Option<delivery_note::Model>, ServiceError> {
        delivery_note::Entity::find()
            .filter(delivery_note::Column::DocumentNumber.eq(document_number.trim()))
            .filter(delivery_note::Column::Status.eq(DeliveryNoteStatus::Pending))
            .order_by_asc(delivery_note::Column::CreatedAt)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Removes a note. Cash entries it produced are left in the ledger.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = delivery_note::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Delivery note {} not found",
                id
            )));
        }
        info!(note_id = %id, "Delivery note deleted");
        self.event_sender
            .send_or_log(Event::DeliveryNoteDeleted(id))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(contains_pattern("sj/2024"), "%sj/2024%");
        assert_eq!(contains_pattern("sj_1"), "%sj\\_1%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }
}
