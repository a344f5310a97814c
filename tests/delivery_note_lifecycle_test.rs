//! End-to-end tests for the delivery note lifecycle.
//!
//! Tests cover:
//! - Creation with master data snapshots
//! - Delivery confirmation and the automatic route allowance entry
//! - Failed deliveries
//! - Invoicing
//! - Rejected transitions out of terminal states

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{date, json_decimal, response_json, TestApp, ALLOWANCE};
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use serde_json::json;
use surat_jalan_api::{
    commands::delivery_notes::{ConfirmDeliveryCommand, MarkDeliveryFailedCommand, SetInvoiceCommand},
    entities::{DeliveryNoteStatus, TransactionCategory, TransactionType, UserRole},
    errors::ServiceError,
    services::{delivery_notes::DeliveryNoteFilter, master_data::RouteInput},
};

fn confirm(note_id: uuid::Uuid, quantity: rust_decimal::Decimal) -> ConfirmDeliveryCommand {
    ConfirmDeliveryCommand {
        note_id,
        delivery_date: date(2024, 1, 16),
        quantity_delivered: quantity,
        actor: "tester".to_string(),
    }
}

#[tokio::test]
async fn confirming_delivery_records_route_allowance_once() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let notes = &app.state.services.delivery_notes;
    let ledger = &app.state.services.cash_ledger;

    let note = app.create_note(&seeded, "SJ/2024/001", dec!(10)).await;
    assert_eq!(note.status, DeliveryNoteStatus::Pending);
    assert_eq!(note.truck_plate, "B 1234 CD");
    assert_eq!(note.driver_company, "PT Maju Jaya");
    assert_eq!(note.route_allowance, ALLOWANCE);

    let confirmation = notes
        .confirm_delivery(confirm(note.id, dec!(9.5)))
        .await
        .expect("confirm delivery");
    assert_eq!(confirmation.note.status, DeliveryNoteStatus::Delivered);
    assert_eq!(confirmation.note.delivery_date, Some(date(2024, 1, 16)));
    assert_eq!(confirmation.note.quantity_delivered, Some(dec!(9.5)));
    assert!(confirmation.cash_transaction_id.is_some());

    let entries = ledger.list_for_delivery_note(note.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.transaction_type, TransactionType::Outflow);
    assert_eq!(entry.category, TransactionCategory::RouteAllowance);
    assert_eq!(entry.amount, ALLOWANCE);
    assert_eq!(entry.date, date(2024, 1, 16));
    assert_eq!(entry.description, "Uang Jalan - SJ/2024/001 (Jakarta-Bandung)");
    assert_eq!(ledger.current_balance().await.unwrap(), -ALLOWANCE);

    // A second confirmation is rejected and writes nothing.
    let second = notes.confirm_delivery(confirm(note.id, dec!(9.5))).await;
    assert_matches!(second, Err(ServiceError::ValidationError(msg)) if msg.contains("terkirim"));
    assert_eq!(ledger.list_for_delivery_note(note.id).await.unwrap().len(), 1);
    assert_eq!(ledger.current_balance().await.unwrap(), -ALLOWANCE);
}

#[tokio::test]
async fn route_changes_after_creation_do_not_touch_the_note() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let note = app.create_note(&seeded, "SJ/2024/002", dec!(5)).await;

    app.state
        .services
        .master_data
        .update_route(
            seeded.route.id,
            RouteInput {
                name: "Jakarta-Bandung via Tol".into(),
                allowance: dec!(750000),
            },
        )
        .await
        .unwrap();

    let confirmation = app
        .state
        .services
        .delivery_notes
        .confirm_delivery(confirm(note.id, dec!(5)))
        .await
        .unwrap();
    assert_eq!(confirmation.note.route_name, "Jakarta-Bandung");
    let entries = app
        .state
        .services
        .cash_ledger
        .list_for_delivery_note(note.id)
        .await
        .unwrap();
    assert_eq!(entries[0].amount, ALLOWANCE);
}

#[tokio::test]
async fn delivered_quantity_is_bounded_by_loaded_quantity() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let notes = &app.state.services.delivery_notes;
    let note = app.create_note(&seeded, "SJ/2024/003", dec!(10)).await;

    for quantity in [dec!(0), dec!(-1), dec!(10.01)] {
        let result = notes.confirm_delivery(confirm(note.id, quantity)).await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }
    assert!(notes.get(note.id).await.unwrap().is_pending());
    assert!(app.state.services.cash_ledger.list().await.unwrap().is_empty());

    // Delivering exactly what was loaded is fine.
    notes.confirm_delivery(confirm(note.id, dec!(10))).await.unwrap();
}

#[tokio::test]
async fn failed_delivery_is_terminal_and_writes_no_cash() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let notes = &app.state.services.delivery_notes;
    let note = app.create_note(&seeded, "SJ/2024/004", dec!(10)).await;

    let failed = notes
        .mark_failed(MarkDeliveryFailedCommand {
            note_id: note.id,
            actor: "tester".into(),
        })
        .await
        .unwrap();
    assert_eq!(failed.status, DeliveryNoteStatus::Failed);
    assert_eq!(failed.delivery_date, None);

    assert_matches!(
        notes.confirm_delivery(confirm(note.id, dec!(5))).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        notes
            .mark_failed(MarkDeliveryFailedCommand {
                note_id: note.id,
                actor: "tester".into(),
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert!(app.state.services.cash_ledger.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn invoice_requires_a_delivered_note() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let notes = &app.state.services.delivery_notes;
    let note = app.create_note(&seeded, "SJ/2024/005", dec!(10)).await;

    let invoice = |invoice_number: &str| SetInvoiceCommand {
        note_id: note.id,
        invoice_number: invoice_number.to_string(),
        invoice_date: Some(date(2024, 1, 20)),
        actor: "tester".into(),
    };

    assert_matches!(
        notes.set_invoice(invoice("INV-001")).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("pending")
    );

    notes.confirm_delivery(confirm(note.id, dec!(10))).await.unwrap();
    let invoiced = notes.set_invoice(invoice("INV-001")).await.unwrap();
    assert_eq!(invoiced.invoice_number.as_deref(), Some("INV-001"));
    assert_eq!(invoiced.invoice_date, Some(date(2024, 1, 20)));
    assert!(invoiced.is_invoiced());

    // Re-invoicing overwrites the number.
    let corrected = notes.set_invoice(invoice("INV-001A")).await.unwrap();
    assert_eq!(corrected.invoice_number.as_deref(), Some("INV-001A"));

    assert_matches!(
        notes.set_invoice(invoice("   ")).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn unknown_or_inactive_masters_are_rejected_on_create() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    app.state
        .services
        .master_data
        .update_truck(
            seeded.truck.id,
            surat_jalan_api::services::master_data::TruckInput {
                plate_number: seeded.truck.plate_number.clone(),
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    let result = app
        .state
        .services
        .delivery_notes
        .create(surat_jalan_api::commands::delivery_notes::CreateDeliveryNoteCommand {
            document_number: "SJ/2024/006".into(),
            document_date: date(2024, 1, 15),
            truck_id: seeded.truck.id,
            driver_id: seeded.driver.id,
            route_id: seeded.route.id,
            material_id: seeded.material.id,
            quantity_loaded: dec!(3),
            actor: "tester".into(),
        })
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("Truck"));
}

#[tokio::test]
async fn delivery_stays_confirmed_when_the_ledger_write_fails() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let note = app.create_note(&seeded, "SJ/2024/007", dec!(10)).await;

    app.state
        .db
        .execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "DROP TABLE cash_transactions".to_string(),
        ))
        .await
        .unwrap();

    let confirmation = app
        .state
        .services
        .delivery_notes
        .confirm_delivery(confirm(note.id, dec!(10)))
        .await
        .expect("status change survives a ledger failure");
    assert_eq!(confirmation.cash_transaction_id, None);

    let stored = app.state.services.delivery_notes.get(note.id).await.unwrap();
    assert_eq!(stored.status, DeliveryNoteStatus::Delivered);
}

#[tokio::test]
async fn zero_allowance_route_writes_no_cash_entry() {
    let app = TestApp::new().await;
    let mut seeded = app.seed_master_data().await;
    seeded.route = app
        .state
        .services
        .master_data
        .create_route(RouteInput {
            name: "Dalam Kota".into(),
            allowance: dec!(0),
        })
        .await
        .unwrap();
    let note = app.create_note(&seeded, "SJ/2024/008", dec!(2)).await;

    let confirmation = app
        .state
        .services
        .delivery_notes
        .confirm_delivery(confirm(note.id, dec!(2)))
        .await
        .unwrap();
    assert_eq!(confirmation.cash_transaction_id, None);
    assert!(app.state.services.cash_ledger.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn lifecycle_over_http() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let clerk = app.token_for(UserRole::InputSuratJalan).await;
    let invoicer = app.token_for(UserRole::InputInvoice).await;

    let created = app
        .request(
            Method::POST,
            "/api/v1/delivery-notes",
            Some(json!({
                "document_number": "SJ/2024/001",
                "document_date": "2024-01-15",
                "truck_id": seeded.truck.id,
                "driver_id": seeded.driver.id,
                "route_id": seeded.route.id,
                "material_id": seeded.material.id,
                "quantity_loaded": "10"
            })),
            Some(&clerk),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = response_json(created).await;
    assert_eq!(body["data"]["status"], "pending");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // Invoicing a pending note is refused.
    let early_invoice = app
        .request(
            Method::PUT,
            &format!("/api/v1/delivery-notes/{}/invoice", id),
            Some(json!({ "invoice_number": "INV-9" })),
            Some(&invoicer),
        )
        .await;
    assert_eq!(early_invoice.status(), StatusCode::BAD_REQUEST);

    let delivered = app
        .request(
            Method::POST,
            &format!("/api/v1/delivery-notes/{}/deliver", id),
            Some(json!({ "delivery_date": "2024-01-16", "quantity_delivered": "10" })),
            Some(&clerk),
        )
        .await;
    assert_eq!(delivered.status(), StatusCode::OK);
    let body = response_json(delivered).await;
    assert_eq!(body["data"]["note"]["status"], "terkirim");
    assert!(body["data"]["cash_transaction_id"].is_string());

    let again = app
        .request(
            Method::POST,
            &format!("/api/v1/delivery-notes/{}/deliver", id),
            Some(json!({ "delivery_date": "2024-01-16", "quantity_delivered": "10" })),
            Some(&clerk),
        )
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    let error = response_json(again).await;
    assert!(error["message"].as_str().unwrap().contains("already terkirim"));

    let invoiced = app
        .request(
            Method::PUT,
            &format!("/api/v1/delivery-notes/{}/invoice", id),
            Some(json!({ "invoice_number": "INV-9", "invoice_date": "2024-01-20" })),
            Some(&invoicer),
        )
        .await;
    assert_eq!(invoiced.status(), StatusCode::OK);
    assert_eq!(response_json(invoiced).await["data"]["invoice_number"], "INV-9");

    let admin = app.token_for(UserRole::Admin).await;
    let balance = app
        .request(
            Method::GET,
            "/api/v1/cash-transactions/balance",
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(balance.status(), StatusCode::OK);
    let body = response_json(balance).await;
    assert_eq!(json_decimal(&body["data"]["balance"]), -ALLOWANCE);
}

#[tokio::test]
async fn worklists_follow_note_status() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    let waiting = app.create_note(&seeded, "SJ/2024/401", dec!(10)).await;
    let shipped = app.create_note(&seeded, "SJ/2024/402", dec!(10)).await;
    app.state
        .services
        .delivery_notes
        .confirm_delivery(confirm(shipped.id, dec!(10)))
        .await
        .unwrap();

    let clerk = app.token_for(UserRole::InputSuratJalan).await;
    let pending = response_json(
        app.request(Method::GET, "/api/v1/delivery-notes/pending", None, Some(&clerk))
            .await,
    )
    .await;
    let pending = pending["data"].as_array().unwrap().clone();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], waiting.id.to_string());

    let invoicer = app.token_for(UserRole::InputInvoice).await;
    let open = response_json(
        app.request(
            Method::GET,
            "/api/v1/delivery-notes/delivered?invoiced=false",
            None,
            Some(&invoicer),
        )
        .await,
    )
    .await;
    let open = open["data"].as_array().unwrap().clone();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["document_number"], "SJ/2024/402");

    let done = app
        .state
        .services
        .delivery_notes
        .list_delivered(Some(true))
        .await
        .unwrap();
    assert!(done.is_empty());
}

#[tokio::test]
async fn search_matches_underscores_literally() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    app.create_note(&seeded, "SJ_2024_01", dec!(5)).await;
    app.create_note(&seeded, "SJX2024X01", dec!(5)).await;

    let found = app
        .state
        .services
        .delivery_notes
        .list(&DeliveryNoteFilter {
            search: Some("sj_2024".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].document_number, "SJ_2024_01");
}
