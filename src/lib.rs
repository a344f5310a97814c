//! Surat Jalan API Library
//!
//! Back office for delivery notes: master data, the delivery lifecycle,
//! bulk CSV import and the route allowance cash ledger.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod export;
pub mod handlers;
pub mod import;
pub mod logging;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::consts as perm;
use crate::auth::{AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{cash_ledger, delivery_notes, master_data, reports, users};

    let dashboard = Router::new()
        .route("/reports/dashboard", get(reports::dashboard))
        .with_permission(perm::DASHBOARD_READ);

    // Master data: read for the note entry screens, write for admins
    let master_read = Router::new()
        .route("/drivers", get(master_data::list_drivers))
        .route("/drivers/export", get(master_data::export_drivers))
        .route("/drivers/:id", get(master_data::get_driver))
        .route("/trucks", get(master_data::list_trucks))
        .route("/trucks/export", get(master_data::export_trucks))
        .route("/trucks/:id", get(master_data::get_truck))
        .route("/materials", get(master_data::list_materials))
        .route("/materials/export", get(master_data::export_materials))
        .route("/materials/:id", get(master_data::get_material))
        .route("/routes", get(master_data::list_routes))
        .route("/routes/export", get(master_data::export_routes))
        .route("/routes/:id", get(master_data::get_route))
        .with_permission(perm::MASTER_DATA_READ);

    let master_write = Router::new()
        .route("/drivers", post(master_data::create_driver))
        .route("/drivers/import", post(master_data::import_drivers))
        .route(
            "/drivers/:id",
            put(master_data::update_driver).delete(master_data::delete_driver),
        )
        .route("/trucks", post(master_data::create_truck))
        .route("/trucks/import", post(master_data::import_trucks))
        .route(
            "/trucks/:id",
            put(master_data::update_truck).delete(master_data::delete_truck),
        )
        .route("/materials", post(master_data::create_material))
        .route("/materials/import", post(master_data::import_materials))
        .route(
            "/materials/:id",
            put(master_data::update_material).delete(master_data::delete_material),
        )
        .route("/routes", post(master_data::create_route))
        .route("/routes/import", post(master_data::import_routes))
        .route(
            "/routes/:id",
            put(master_data::update_route).delete(master_data::delete_route),
        )
        .with_permission(perm::MASTER_DATA_WRITE);

    let notes_read = Router::new()
        .route("/delivery-notes", get(delivery_notes::list_delivery_notes))
        .route(
            "/delivery-notes/pending",
            get(delivery_notes::list_pending_notes),
        )
        .route("/delivery-notes/:id", get(delivery_notes::get_delivery_note))
        .with_permission(perm::DELIVERY_NOTES_READ);

    let notes_write = Router::new()
        .route("/delivery-notes", post(delivery_notes::create_delivery_note))
        .route(
            "/delivery-notes/import",
            post(delivery_notes::import_delivery_notes),
        )
        .route(
            "/delivery-notes/realizations/import",
            post(delivery_notes::import_realizations),
        )
        .route(
            "/delivery-notes/:id/deliver",
            post(delivery_notes::confirm_delivery),
        )
        .route("/delivery-notes/:id/fail", post(delivery_notes::mark_failed))
        .with_permission(perm::DELIVERY_NOTES_WRITE);

    let notes_delete = Router::new()
        .route(
            "/delivery-notes/:id",
            axum::routing::delete(delivery_notes::delete_delivery_note),
        )
        .with_permission(perm::DELIVERY_NOTES_DELETE);

    let invoices_read = Router::new()
        .route("/reports/invoices", get(reports::invoices))
        .route(
            "/delivery-notes/delivered",
            get(delivery_notes::list_delivered_notes),
        )
        .with_permission(perm::INVOICES_READ);

    let invoices_write = Router::new()
        .route("/delivery-notes/:id/invoice", put(delivery_notes::set_invoice))
        .with_permission(perm::INVOICES_WRITE);

    let reports_read = Router::new()
        .route("/reports/route-allowance/:date", get(reports::route_allowance))
        .with_permission(perm::REPORTS_READ);

    let reports_export = Router::new()
        .route(
            "/delivery-notes/export",
            get(delivery_notes::export_delivery_notes),
        )
        .route("/reports/invoices/export", get(reports::export_invoices))
        .with_permission(perm::REPORTS_EXPORT);

    let cash_read = Router::new()
        .route("/cash-transactions", get(cash_ledger::list_transactions))
        .route("/cash-transactions/balance", get(cash_ledger::current_balance))
        .route(
            "/cash-transactions/balance/as-of/:date",
            get(cash_ledger::balance_as_of),
        )
        .route(
            "/cash-transactions/daily/:date",
            get(cash_ledger::daily_summary),
        )
        .route("/cash-transactions/:id", get(cash_ledger::get_transaction))
        .with_permission(perm::CASH_READ);

    let cash_write = Router::new()
        .route("/cash-transactions", post(cash_ledger::create_transaction))
        .route(
            "/cash-transactions/:id",
            axum::routing::delete(cash_ledger::delete_transaction),
        )
        .with_permission(perm::CASH_WRITE);

    let user_admin = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .with_permission(perm::USERS_MANAGE);

    let me = Router::new()
        .route("/me", get(handlers::auth::me))
        .with_auth();

    Router::new()
        .merge(dashboard)
        .merge(master_read)
        .merge(master_write)
        .merge(notes_read)
        .merge(notes_write)
        .merge(notes_delete)
        .merge(invoices_read)
        .merge(invoices_write)
        .merge(reports_read)
        .merge(reports_export)
        .merge(cash_read)
        .merge(cash_write)
        .merge(user_admin)
        .merge(me)
}

/// Full application router: versioned API, login, health probe, request ids
/// and HTTP tracing. CORS, body limits and the access log are added by the
/// binary.
pub fn app_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();

    Router::<AppState>::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .nest("/auth", auth::auth_routes(auth_service.clone()))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
             mut req: axum::extract::Request,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            crate::tracing::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("sj-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("sj-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}
