use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{created_response, DateRangeQuery};
use crate::{
    auth::AuthUser,
    entities::cash_transaction,
    errors::ServiceError,
    services::cash_ledger::{DailyCashSummary, NewCashTransaction},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(range): Query<DateRangeQuery>,
) -> ApiResult<Vec<cash_transaction::Model>> {
    let ledger = &state.services.cash_ledger;
    let transactions = match (range.start, range.end) {
        (Some(start), Some(end)) => ledger.list_by_date_range(start, end).await?,
        (None, None) => ledger.list().await?,
        _ => {
            return Err(ServiceError::ValidationError(
                "Both start and end dates are required for a date range".to_string(),
            ))
        }
    };
    Ok(Json(ApiResponse::success(transactions)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<cash_transaction::Model> {
    let transaction = state.services.cash_ledger.get(id).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<NewCashTransaction>,
) -> Result<Response, ServiceError> {
    let transaction = state
        .services
        .cash_ledger
        .record(input, &auth_user.user_id)
        .await?;
    Ok(created_response(transaction))
}

/// Removes an entry and reverses its effect on the balance.
pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<cash_transaction::Model> {
    let removed = state.services.cash_ledger.delete(id).await?;
    Ok(Json(ApiResponse::success(removed)))
}

pub async fn current_balance(State(state): State<AppState>) -> ApiResult<BalanceResponse> {
    let balance = state.services.cash_ledger.current_balance().await?;
    Ok(Json(ApiResponse::success(BalanceResponse {
        balance,
        as_of: None,
    })))
}

pub async fn balance_as_of(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<BalanceResponse> {
    let balance = state.services.cash_ledger.balance_as_of(date).await?;
    Ok(Json(ApiResponse::success(BalanceResponse {
        balance,
        as_of: Some(date),
    })))
}

pub async fn daily_summary(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<DailyCashSummary> {
    let summary = state.services.cash_ledger.daily_summary(date).await?;
    Ok(Json(ApiResponse::success(summary)))
}
