use crate::ApiResponse;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// CSV download with an attachment file name.
pub fn csv_response(filename: &str, body: String) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// `?active=true` on driver and truck lists
#[derive(Debug, Default, Deserialize)]
pub struct ActiveQuery {
    #[serde(default)]
    pub active: bool,
}

/// Inclusive date range; both ends are required together.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// `?invoiced=true|false`
#[derive(Debug, Default, Deserialize)]
pub struct InvoicedQuery {
    pub invoiced: Option<bool>,
}
