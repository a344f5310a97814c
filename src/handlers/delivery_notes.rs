use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::common::{created_response, csv_response, no_content_response, InvoicedQuery};
use crate::{
    auth::AuthUser,
    commands::delivery_notes::{
        ConfirmDeliveryCommand, CreateDeliveryNoteCommand, DeliveryConfirmation,
        MarkDeliveryFailedCommand, SetInvoiceCommand,
    },
    entities::delivery_note,
    errors::ServiceError,
    export,
    import::ImportReport,
    services::delivery_notes::DeliveryNoteFilter,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct DeliverRequest {
    pub delivery_date: NaiveDate,
    pub quantity_delivered: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceRequest {
    pub invoice_number: String,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
}

pub async fn list_delivery_notes(
    State(state): State<AppState>,
    Query(filter): Query<DeliveryNoteFilter>,
) -> ApiResult<Vec<delivery_note::Model>> {
    let notes = state.services.delivery_notes.list(&filter).await?;
    Ok(Json(ApiResponse::success(notes)))
}

/// Pending notes, the worklist for realization.
pub async fn list_pending_notes(
    State(state): State<AppState>,
) -> ApiResult<Vec<delivery_note::Model>> {
    let notes = state.services.delivery_notes.list_pending().await?;
    Ok(Json(ApiResponse::success(notes)))
}

/// Delivered notes, the worklist for invoicing.
pub async fn list_delivered_notes(
    State(state): State<AppState>,
    Query(query): Query<InvoicedQuery>,
) -> ApiResult<Vec<delivery_note::Model>> {
    let notes = state
        .services
        .delivery_notes
        .list_delivered(query.invoiced)
        .await?;
    Ok(Json(ApiResponse::success(notes)))
}

pub async fn get_delivery_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<delivery_note::Model> {
    let note = state.services.delivery_notes.get(id).await?;
    Ok(Json(ApiResponse::success(note)))
}

pub async fn create_delivery_note(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(mut command): Json<CreateDeliveryNoteCommand>,
) -> Result<Response, ServiceError> {
    command.actor = auth_user.user_id;
    let note = state.services.delivery_notes.create(command).await?;
    Ok(created_response(note))
}

pub async fn delete_delivery_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.delivery_notes.delete(id).await?;
    Ok(no_content_response())
}

pub async fn confirm_delivery(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<DeliverRequest>,
) -> ApiResult<DeliveryConfirmation> {
    let confirmation = state
        .services
        .delivery_notes
        .confirm_delivery(ConfirmDeliveryCommand {
            note_id: id,
            delivery_date: request.delivery_date,
            quantity_delivered: request.quantity_delivered,
            actor: auth_user.user_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(confirmation)))
}

pub async fn mark_failed(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<delivery_note::Model> {
    let note = state
        .services
        .delivery_notes
        .mark_failed(MarkDeliveryFailedCommand {
            note_id: id,
            actor: auth_user.user_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(note)))
}

pub async fn set_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<InvoiceRequest>,
) -> ApiResult<delivery_note::Model> {
    let note = state
        .services
        .delivery_notes
        .set_invoice(SetInvoiceCommand {
            note_id: id,
            invoice_number: request.invoice_number,
            invoice_date: request.invoice_date,
            actor: auth_user.user_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(note)))
}

pub async fn import_delivery_notes(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: String,
) -> ApiResult<ImportReport> {
    let report = state
        .services
        .imports
        .import_delivery_notes(&body, &auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn import_realizations(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: String,
) -> ApiResult<ImportReport> {
    let report = state
        .services
        .imports
        .import_realizations(&body, &auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn export_delivery_notes(
    State(state): State<AppState>,
    Query(filter): Query<DeliveryNoteFilter>,
) -> Result<Response, ServiceError> {
    let notes = state.services.delivery_notes.list(&filter).await?;
    Ok(csv_response(
        "laporan-surat-jalan.csv",
        export::delivery_notes_csv(&notes)?,
    ))
}
