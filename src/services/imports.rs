use crate::{
    commands::delivery_notes::{
        ConfirmDeliveryCommand, CreateDeliveryNoteCommand, MarkDeliveryFailedCommand,
    },
    entities::DeliveryNoteStatus,
    errors::ServiceError,
    import::{self, DeliveryNoteRow, ImportReport, ParsedRow, RealizationRow, SourceLine},
    services::{
        delivery_notes::DeliveryNoteService,
        master_data::{MasterDataService, MasterDataSnapshot},
    },
};
use metrics::counter;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Runs pasted/uploaded text imports against the database.
///
/// Rows are handled in file order. A bad row is reported and skipped; it never
/// aborts the rest of the file.
#[derive(Clone)]
pub struct ImportService {
    master_data: MasterDataService,
    delivery_notes: DeliveryNoteService,
    error_preview_limit: usize,
}

impl ImportService {
    pub fn new(
        master_data: MasterDataService,
        delivery_notes: DeliveryNoteService,
        error_preview_limit: usize,
    ) -> Self {
        Self {
            master_data,
            delivery_notes,
            error_preview_limit,
        }
    }

    #[instrument(skip(self, text))]
    pub async fn import_drivers(&self, text: &str) -> Result<ImportReport, ServiceError> {
        let (inputs, mut report) = collect_valid(import::parse_driver_rows(text)?);
        if !inputs.is_empty() {
            let created = self.master_data.bulk_create_drivers(inputs).await?;
            report.record_successes(created.len());
        }
        Ok(self.finish("drivers", report))
    }

    #[instrument(skip(self, text))]
    pub async fn import_trucks(&self, text: &str) -> Result<ImportReport, ServiceError> {
        let (inputs, mut report) = collect_valid(import::parse_truck_rows(text)?);
        if !inputs.is_empty() {
            let created = self.master_data.bulk_create_trucks(inputs).await?;
            report.record_successes(created.len());
        }
        Ok(self.finish("trucks", report))
    }

    #[instrument(skip(self, text))]
    pub async fn import_materials(&self, text: &str) -> Result<ImportReport, ServiceError> {
        let (inputs, mut report) = collect_valid(import::parse_material_rows(text)?);
        if !inputs.is_empty() {
            let created = self.master_data.bulk_create_materials(inputs).await?;
            report.record_successes(created.len());
        }
        Ok(self.finish("materials", report))
    }

    #[instrument(skip(self, text))]
    pub async fn import_routes(&self, text: &str) -> Result<ImportReport, ServiceError> {
        let (inputs, mut report) = collect_valid(import::parse_route_rows(text)?);
        if !inputs.is_empty() {
            let created = self.master_data.bulk_create_routes(inputs).await?;
            report.record_successes(created.len());
        }
        Ok(self.finish("routes", report))
    }

    /// Creates one note per row through the lifecycle engine.
    ///
    /// References are resolved against master data loaded once, before the first row.
    #[instrument(skip(self, text))]
    pub async fn import_delivery_notes(
        &self,
        text: &str,
        actor: &str,
    ) -> Result<ImportReport, ServiceError> {
        let rows = import::parse_delivery_note_rows(text)?;
        let snapshot = self.master_data.snapshot().await?;
        let mut report = ImportReport::new();

        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    report.record_failure(e.message);
                    continue;
                }
            };
            let command = match resolve_delivery_note(&row, &snapshot, actor) {
                Ok(command) => command,
                Err(message) => {
                    report.record_failure(message);
                    continue;
                }
            };
            match self.delivery_notes.create(command).await {
                Ok(_) => report.record_success(),
                Err(e) if e.is_client_error() => {
                    report.record_failure(format!("{}: {}", row.document_number, e))
                }
                Err(e) => return Err(e),
            }
        }

        Ok(self.finish("delivery_notes", report))
    }

    /// Confirms or fails pending notes listed by document number.
    #[instrument(skip(self, text))]
    pub async fn import_realizations(
        &self,
        text: &str,
        actor: &str,
    ) -> Result<ImportReport, ServiceError> {
        let rows = import::parse_realization_rows(text)?;
        let mut report = ImportReport::new();

        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    report.record_failure(e.message);
                    continue;
                }
            };
            match self.apply_realization(&row, actor).await {
                Ok(Ok(())) => report.record_success(),
                Ok(Err(message)) => report.record_failure(message),
                Err(e) => return Err(e),
            }
        }

        Ok(self.finish("realizations", report))
    }

    /// Outer error aborts the import; inner error is a row failure.
    async fn apply_realization(
        &self,
        row: &RealizationRow,
        actor: &str,
    ) -> Result<Result<(), String>, ServiceError> {
        let number = &row.document_number;
        let note = match self.delivery_notes.find_pending_by_number(number).await? {
            Some(note) => note,
            None => {
                return Ok(Err(format!(
                    "Delivery note not found or already processed: {}",
                    number
                )))
            }
        };

        let outcome = match row.outcome {
            DeliveryNoteStatus::Delivered => {
                let Some(quantity_delivered) = row
                    .quantity_delivered
                    .filter(|q| *q > Decimal::ZERO)
                else {
                    return Ok(Err(format!("Invalid quantity for: {}", number)));
                };
                let Some(delivery_date) = row.delivery_date else {
                    return Ok(Err(format!("Invalid date for: {}", number)));
                };
                self.delivery_notes
                    .confirm_delivery(ConfirmDeliveryCommand {
                        note_id: note.id,
                        delivery_date,
                        quantity_delivered,
                        actor: actor.to_string(),
                    })
                    .await
                    .map(|_| ())
            }
            _ => self
                .delivery_notes
                .mark_failed(MarkDeliveryFailedCommand {
                    note_id: note.id,
                    actor: actor.to_string(),
                })
                .await
                .map(|_| ()),
        };

        match outcome {
            Ok(()) => Ok(Ok(())),
            Err(e) if e.is_client_error() => Ok(Err(format!("{}: {}", number, e))),
            Err(e) => Err(e),
        }
    }

    fn finish(&self, entity: &'static str, report: ImportReport) -> ImportReport {
        counter!("surat_jalan_import_rows_total", report.succeeded as u64, "entity" => entity, "outcome" => "succeeded");
        counter!("surat_jalan_import_rows_total", report.failed as u64, "entity" => entity, "outcome" => "failed");
        if report.failed > 0 {
            warn!(entity, succeeded = report.succeeded, failed = report.failed, "Import finished with errors");
        } else {
            info!(entity, succeeded = report.succeeded, "Import finished");
        }
        report.finish(self.error_preview_limit)
    }
}

/// Splits parsed rows into validated inputs and a report holding the row failures.
fn collect_valid<R, I>(rows: Vec<ParsedRow<R>>) -> (Vec<I>, ImportReport)
where
    R: SourceLine,
    I: From<R> + Validate,
{
    let mut report = ImportReport::new();
    let mut inputs = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Ok(row) => {
                let line = row.line();
                let input = I::from(row);
                match input.validate() {
                    Ok(()) => inputs.push(input),
                    Err(e) => report.record_failure(format!("Row {}: {}", line, e)),
                }
            }
            Err(e) => report.record_failure(e.message),
        }
    }
    (inputs, report)
}

/// Resolves a row's references; the error is the row's failure message.
///
/// Unknown references are reported ahead of a bad quantity or date.
fn resolve_delivery_note(
    row: &DeliveryNoteRow,
    snapshot: &MasterDataSnapshot,
    actor: &str,
) -> Result<CreateDeliveryNoteCommand, String> {
    let number = &row.document_number;
    let (Some(truck), Some(driver), Some(route), Some(material)) = (
        snapshot.truck_by_plate(&row.truck_plate),
        snapshot.driver_by_username(&row.driver_username),
        snapshot.route_by_name(&row.route_name),
        snapshot.material_by_name(&row.material_name),
    ) else {
        return Err(format!("Master data not found for: {}", number));
    };
    let quantity_loaded = row
        .quantity_loaded
        .filter(|q| *q > Decimal::ZERO)
        .ok_or_else(|| format!("Invalid quantity for: {}", number))?;
    let document_date = row
        .document_date
        .ok_or_else(|| format!("Invalid date for: {}", number))?;

    Ok(CreateDeliveryNoteCommand {
        document_number: number.clone(),
        document_date,
        truck_id: truck.id,
        driver_id: driver.id,
        route_id: route.id,
        material_id: material.id,
        quantity_loaded,
        actor: actor.to_string(),
    })
}
