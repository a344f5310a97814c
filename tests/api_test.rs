//! HTTP surface: authentication, role gating, exports and health.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{response_json, response_text, TestApp};
use rstest::rstest;
use rust_decimal_macros::dec;
use serde_json::json;
use surat_jalan_api::entities::UserRole;

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/delivery-notes", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_MISSING");

    let forged = app
        .request(Method::GET, "/api/v1/delivery-notes", None, Some("not-a-jwt"))
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let app = TestApp::new().await;
    app.state
        .services
        .users
        .ensure_bootstrap_admin("admin", "admin123")
        .await
        .unwrap();

    let rejected = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": "salah" })),
            None,
        )
        .await;
    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": "admin123" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["user"].get("password_hash").is_none());
    let token = body["access_token"].as_str().unwrap().to_string();

    let me = app
        .request(Method::GET, "/api/v1/me", None, Some(&token))
        .await;
    assert_eq!(me.status(), StatusCode::OK);
    let body = response_json(me).await;
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["user"]["username"], "admin");
}

#[rstest]
#[case(UserRole::Reader, Method::GET, "/api/v1/reports/dashboard", StatusCode::OK)]
#[case(UserRole::InputKas, Method::GET, "/api/v1/reports/dashboard", StatusCode::OK)]
#[case(UserRole::InputKas, Method::GET, "/api/v1/cash-transactions", StatusCode::OK)]
#[case(UserRole::Reader, Method::GET, "/api/v1/cash-transactions", StatusCode::FORBIDDEN)]
#[case(UserRole::InputSuratJalan, Method::GET, "/api/v1/cash-transactions", StatusCode::FORBIDDEN)]
#[case(UserRole::InputSuratJalan, Method::GET, "/api/v1/delivery-notes", StatusCode::OK)]
#[case(UserRole::InputKas, Method::GET, "/api/v1/delivery-notes", StatusCode::FORBIDDEN)]
#[case(UserRole::InputInvoice, Method::GET, "/api/v1/reports/invoices", StatusCode::OK)]
#[case(UserRole::InputSuratJalan, Method::GET, "/api/v1/reports/invoices", StatusCode::FORBIDDEN)]
#[case(UserRole::Reader, Method::GET, "/api/v1/delivery-notes/export", StatusCode::OK)]
#[case(UserRole::InputInvoice, Method::GET, "/api/v1/delivery-notes/export", StatusCode::FORBIDDEN)]
#[case(UserRole::InputSuratJalan, Method::GET, "/api/v1/drivers", StatusCode::OK)]
#[case(UserRole::InputSuratJalan, Method::GET, "/api/v1/users", StatusCode::FORBIDDEN)]
#[case(UserRole::Admin, Method::GET, "/api/v1/users", StatusCode::OK)]
#[tokio::test]
async fn roles_are_gated_by_permission(
    #[case] role: UserRole,
    #[case] method: Method,
    #[case] uri: &str,
    #[case] expected: StatusCode,
) {
    let app = TestApp::new().await;
    let token = app.token_for(role).await;
    let response = app.request(method, uri, None, Some(&token)).await;
    assert_eq!(response.status(), expected, "{} {}", role, uri);
}

#[tokio::test]
async fn only_admins_write_master_data() {
    let app = TestApp::new().await;
    let clerk = app.token_for(UserRole::InputSuratJalan).await;
    let admin = app.token_for(UserRole::Admin).await;
    let route = json!({ "name": "Jakarta-Cirebon", "allowance": "350000" });

    let denied = app
        .request(Method::POST, "/api/v1/routes", Some(route.clone()), Some(&clerk))
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let created = app
        .request(Method::POST, "/api/v1/routes", Some(route), Some(&admin))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = response_json(created).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/v1/routes/{}", id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = app
        .request(
            Method::GET,
            &format!("/api/v1/routes/{}", id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delivery_note_export_is_quoted_csv() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    app.create_note(&seeded, "SJ/2024/301", dec!(10)).await;
    let reader = app.token_for(UserRole::Reader).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/delivery-notes/export?status=pending",
            None,
            Some(&reader),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let text = response_text(response).await;
    let mut lines = text.lines();
    let header_row = lines.next().unwrap();
    assert!(header_row.starts_with("\"Nomor Surat Jalan\""));
    let row = lines.next().unwrap();
    assert!(row.starts_with("\"SJ/2024/301\""));
    assert!(row.contains("\"-\""));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn dashboard_counts_notes_by_status() {
    let app = TestApp::new().await;
    let seeded = app.seed_master_data().await;
    app.create_note(&seeded, "SJ/1", dec!(1)).await;
    app.create_note(&seeded, "SJ/2", dec!(1)).await;
    let reader = app.token_for(UserRole::Reader).await;

    let response = app
        .request(Method::GET, "/api/v1/reports/dashboard", None, Some(&reader))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["stats"]["total"], 2);
    assert_eq!(body["data"]["stats"]["pending"], 2);
    assert_eq!(body["data"]["recent"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let app = TestApp::new().await;
    let admin = app.token_for(UserRole::Admin).await;
    let me = response_json(
        app.request(Method::GET, "/api/v1/me", None, Some(&admin))
            .await,
    )
    .await;
    let id = me["data"]["user"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{}", id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
