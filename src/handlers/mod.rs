pub mod auth;
pub mod cash_ledger;
pub mod common;
pub mod delivery_notes;
pub mod health;
pub mod master_data;
pub mod reports;
pub mod users;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        cash_ledger::CashLedgerService, delivery_notes::DeliveryNoteService,
        imports::ImportService, master_data::MasterDataService, reports::ReportService,
        users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub master_data: Arc<MasterDataService>,
    pub delivery_notes: Arc<DeliveryNoteService>,
    pub cash_ledger: Arc<CashLedgerService>,
    pub imports: Arc<ImportService>,
    pub reports: Arc<ReportService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let master_data = MasterDataService::new(db_pool.clone(), event_sender.clone());
        let delivery_notes = DeliveryNoteService::new(db_pool.clone(), event_sender.clone());
        let imports = ImportService::new(
            master_data.clone(),
            delivery_notes.clone(),
            config.import_error_preview_limit,
        );

        Self {
            master_data: Arc::new(master_data),
            delivery_notes: Arc::new(delivery_notes),
            cash_ledger: Arc::new(CashLedgerService::new(db_pool.clone(), event_sender)),
            imports: Arc::new(imports),
            reports: Arc::new(ReportService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool)),
        }
    }
}
