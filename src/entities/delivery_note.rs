use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Workflow state of a delivery note. `Delivered` and `Failed` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DeliveryNoteStatus {
    #[sea_orm(string_value = "pending")]
    #[serde(rename = "pending")]
    #[strum(serialize = "pending")]
    Pending,
    #[sea_orm(string_value = "terkirim")]
    #[serde(rename = "terkirim")]
    #[strum(serialize = "terkirim")]
    Delivered,
    #[sea_orm(string_value = "gagal")]
    #[serde(rename = "gagal")]
    #[strum(serialize = "gagal")]
    Failed,
}

impl DeliveryNoteStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryNoteStatus::Pending)
    }
}

/// Delivery note ("surat jalan").
///
/// Truck, driver, route and material details are copied in at creation so the
/// note keeps reading the same after the master records change or disappear.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub document_number: String,
    pub document_date: NaiveDate,

    pub truck_id: Uuid,
    pub truck_plate: String,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub driver_company: String,
    pub route_id: Uuid,
    pub route_name: String,
    pub route_allowance: Decimal,
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: String,

    pub quantity_loaded: Decimal,
    pub status: DeliveryNoteStatus,
    pub delivery_date: Option<NaiveDate>,
    pub quantity_delivered: Option<Decimal>,

    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.status == DeliveryNoteStatus::Pending
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryNoteStatus::Delivered
    }

    pub fn is_invoiced(&self) -> bool {
        self.invoice_number
            .as_deref()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_wire_names() {
        assert_eq!(DeliveryNoteStatus::Delivered.to_string(), "terkirim");
        assert_eq!(
            DeliveryNoteStatus::from_str("gagal").unwrap(),
            DeliveryNoteStatus::Failed
        );
        assert_eq!(
            serde_json::to_string(&DeliveryNoteStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert!(DeliveryNoteStatus::from_str("shipped").is_err());
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!DeliveryNoteStatus::Pending.is_terminal());
        assert!(DeliveryNoteStatus::Delivered.is_terminal());
        assert!(DeliveryNoteStatus::Failed.is_terminal());
    }
}
