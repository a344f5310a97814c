use crate::{
    commands::Command,
    db::DbPool,
    entities::{delivery_note, driver, material, route, truck, DeliveryNoteStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{not_blank, positive},
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDeliveryNoteCommand {
    #[validate(custom = "not_blank")]
    pub document_number: String,
    pub document_date: NaiveDate,
    pub truck_id: Uuid,
    pub driver_id: Uuid,
    pub route_id: Uuid,
    pub material_id: Uuid,
    #[validate(custom = "positive")]
    pub quantity_loaded: Decimal,
    /// Id of the user issuing the note
    #[serde(skip)]
    pub actor: String,
}

#[async_trait::async_trait]
impl Command for CreateDeliveryNoteCommand {
    type Result = delivery_note::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(document_number = %self.document_number))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            counter!("surat_jalan_delivery_note_failures_total", 1, "error_type" => "validation");
            ServiceError::ValidationError(format!("Invalid input: {}", e))
        })?;

        let db = db_pool.as_ref();
        let note = self.build_note(db).await?;

        let created = note.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to insert delivery note");
            ServiceError::db_error(e)
        })?;

        counter!("surat_jalan_delivery_notes_created_total", 1);
        info!(note_id = %created.id, document_number = %created.document_number, "Delivery note created");

        event_sender
            .send_or_log(Event::DeliveryNoteCreated {
                note_id: created.id,
                document_number: created.document_number.clone(),
            })
            .await;

        Ok(created)
    }
}

impl CreateDeliveryNoteCommand {
    /// Resolves the referenced master records and copies their display fields.
    async fn build_note(
        &self,
        db: &DatabaseConnection,
    ) -> Result<delivery_note::ActiveModel, ServiceError> {
        let truck = truck::Entity::find_by_id(self.truck_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|t| t.is_active)
            .ok_or_else(|| missing("Truck", self.truck_id))?;
        let driver = driver::Entity::find_by_id(self.driver_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|d| d.is_active)
            .ok_or_else(|| missing("Driver", self.driver_id))?;
        let route = route::Entity::find_by_id(self.route_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| missing("Route", self.route_id))?;
        let material = material::Entity::find_by_id(self.material_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| missing("Material", self.material_id))?;

        let now = Utc::now();
        Ok(delivery_note::ActiveModel {
            id: Set(Uuid::new_v4()),
            document_number: Set(self.document_number.trim().to_string()),
            document_date: Set(self.document_date),
            truck_id: Set(truck.id),
            truck_plate: Set(truck.plate_number),
            driver_id: Set(driver.id),
            driver_name: Set(driver.name),
            driver_company: Set(driver.company_name),
            route_id: Set(route.id),
            route_name: Set(route.name),
            route_allowance: Set(route.allowance),
            material_id: Set(material.id),
            material_name: Set(material.name),
            unit: Set(material.unit),
            quantity_loaded: Set(self.quantity_loaded),
            status: Set(DeliveryNoteStatus::Pending),
            delivery_date: Set(None),
            quantity_delivered: Set(None),
            invoice_number: Set(None),
            invoice_date: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(self.actor.clone()),
            updated_by: Set(None),
        })
    }
}

fn missing(kind: &str, id: Uuid) -> ServiceError {
    counter!("surat_jalan_delivery_note_failures_total", 1, "error_type" => "missing_master_data");
    ServiceError::ValidationError(format!("{} {} not found or inactive", kind, id))
}
