use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::NaiveDate;

use super::common::{csv_response, InvoicedQuery};
use crate::{
    errors::ServiceError,
    export,
    services::reports::{Dashboard, InvoiceLine, RouteAllowanceReport},
    ApiResponse, ApiResult, AppState,
};

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let dashboard = state.services.reports.dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

pub async fn route_allowance(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<RouteAllowanceReport> {
    let report = state.services.reports.route_allowance(date).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoicedQuery>,
) -> ApiResult<Vec<InvoiceLine>> {
    let lines = state.services.reports.invoices(query.invoiced).await?;
    Ok(Json(ApiResponse::success(lines)))
}

pub async fn export_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoicedQuery>,
) -> Result<Response, ServiceError> {
    let notes: Vec<_> = state
        .services
        .reports
        .invoices(query.invoiced)
        .await?
        .into_iter()
        .map(|line| line.note)
        .collect();
    Ok(csv_response("laporan-invoice.csv", export::invoices_csv(&notes)?))
}
