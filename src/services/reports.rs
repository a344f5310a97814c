use crate::{
    db::DbPool,
    entities::{delivery_note, DeliveryNoteStatus},
    errors::ServiceError,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Number of notes shown under "recent activity" on the dashboard.
pub const RECENT_NOTES: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    pub delivered: usize,
    pub failed: usize,
    pub invoiced: usize,
    /// Delivered notes still waiting for an invoice
    pub not_invoiced: usize,
}

impl DashboardStats {
    pub fn from_notes<'a>(notes: impl IntoIterator<Item = &'a delivery_note::Model>) -> Self {
        notes.into_iter().fold(Self::default(), |mut stats, note| {
            stats.total += 1;
            match note.status {
                DeliveryNoteStatus::Pending => stats.pending += 1,
                DeliveryNoteStatus::Failed => stats.failed += 1,
                DeliveryNoteStatus::Delivered => {
                    stats.delivered += 1;
                    if note.is_invoiced() {
                        stats.invoiced += 1;
                    } else {
                        stats.not_invoiced += 1;
                    }
                }
            }
            stats
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent: Vec<delivery_note::Model>,
}

/// One line of the route allowance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAllowanceLine {
    pub document_number: String,
    pub driver_name: String,
    pub truck_plate: String,
    pub route_name: String,
    pub allowance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAllowanceReport {
    pub delivery_date: NaiveDate,
    pub count: usize,
    pub total_allowance: Decimal,
    pub lines: Vec<RouteAllowanceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub note: delivery_note::Model,
    pub invoiced: bool,
}

/// Read-only aggregates over delivery notes.
#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<Dashboard, ServiceError> {
        let db = &*self.db_pool;
        let notes = delivery_note::Entity::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let recent = delivery_note::Entity::find()
            .order_by_desc(delivery_note::Column::CreatedAt)
            .limit(RECENT_NOTES)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(Dashboard {
            stats: DashboardStats::from_notes(&notes),
            recent,
        })
    }

    /// Allowances owed for deliveries made on `date`.
    #[instrument(skip(self))]
    pub async fn route_allowance(&self, date: NaiveDate) -> Result<RouteAllowanceReport, ServiceError> {
        let notes = delivery_note::Entity::find()
            .filter(delivery_note::Column::Status.eq(DeliveryNoteStatus::Delivered))
            .filter(delivery_note::Column::DeliveryDate.eq(date))
            .order_by_asc(delivery_note::Column::DocumentNumber)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        let lines: Vec<RouteAllowanceLine> = notes
            .into_iter()
            .map(|n| RouteAllowanceLine {
                document_number: n.document_number,
                driver_name: n.driver_name,
                truck_plate: n.truck_plate,
                route_name: n.route_name,
                allowance: n.route_allowance,
            })
            .collect();
        Ok(RouteAllowanceReport {
            delivery_date: date,
            count: lines.len(),
            total_allowance: lines.iter().map(|l| l.allowance).sum(),
            lines,
        })
    }

    /// Delivered notes with their invoice state, newest delivery first.
    #[instrument(skip(self))]
    pub async fn invoices(&self, invoiced: Option<bool>) -> Result<Vec<InvoiceLine>, ServiceError> {
        let notes = delivery_note::Entity::find()
            .filter(delivery_note::Column::Status.eq(DeliveryNoteStatus::Delivered))
            .order_by_desc(delivery_note::Column::DeliveryDate)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(notes
            .into_iter()
            .map(|note| InvoiceLine {
                invoiced: note.is_invoiced(),
                note,
            })
            .filter(|line| invoiced.map_or(true, |want| line.invoiced == want))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn note(status: DeliveryNoteStatus, invoice: Option<&str>) -> delivery_note::Model {
        let now = Utc::now();
        delivery_note::Model {
            id: Uuid::new_v4(),
            document_number: "SJ/1".into(),
            document_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            truck_id: Uuid::new_v4(),
            truck_plate: "B1".into(),
            driver_id: Uuid::new_v4(),
            driver_name: "Budi".into(),
            driver_company: "PT Aman".into(),
            route_id: Uuid::new_v4(),
            route_name: "R".into(),
            route_allowance: dec!(1),
            material_id: Uuid::new_v4(),
            material_name: "Pasir".into(),
            unit: "Ton".into(),
            quantity_loaded: dec!(10),
            status,
            delivery_date: None,
            quantity_delivered: None,
            invoice_number: invoice.map(str::to_string),
            invoice_date: None,
            created_at: now,
            updated_at: now,
            created_by: "u".into(),
            updated_by: None,
        }
    }

    #[test]
    fn stats_split_delivered_by_invoice_state() {
        let notes = vec![
            note(DeliveryNoteStatus::Pending, None),
            note(DeliveryNoteStatus::Delivered, Some("INV/1")),
            note(DeliveryNoteStatus::Delivered, None),
            note(DeliveryNoteStatus::Failed, None),
        ];
        let stats = DashboardStats::from_notes(&notes);
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                pending: 1,
                delivered: 2,
                failed: 1,
                invoiced: 1,
                not_invoiced: 1,
            }
        );
    }
}
