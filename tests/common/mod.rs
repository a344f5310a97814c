#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use surat_jalan_api::{
    app_router,
    auth::{AuthConfig, AuthService},
    commands::delivery_notes::CreateDeliveryNoteCommand,
    config::AppConfig,
    db,
    entities::{delivery_note, driver, material, route, truck, UserRole},
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        master_data::{DriverInput, MaterialInput, RouteInput, TruckInput},
        users::CreateUserInput,
    },
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ALLOWANCE: Decimal = dec!(500000);

/// Master records most scenarios start from.
pub struct Seeded {
    pub driver: driver::Model,
    pub truck: truck::Model,
    pub route: route::Model,
    pub material: material::Model,
}

/// Application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_surat_jalan_integration_tests_0123456789abcdef".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let pool = db::establish_connection(&cfg.database_url)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = EventSender::channel(256);
        let event_sender = Arc::new(event_sender);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);
        let auth = Arc::new(AuthService::new(
            AuthConfig::new(
                cfg.jwt_secret.clone(),
                "surat-jalan-api".to_string(),
                Duration::from_secs(cfg.jwt_expiration as u64),
            ),
            services.users.as_ref().clone(),
        ));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth,
        };

        Self {
            router: app_router(state.clone()),
            state,
            _event_task: event_task,
        }
    }

    /// Creates an account with `role` and returns a bearer token for it.
    pub async fn token_for(&self, role: UserRole) -> String {
        let account = self
            .state
            .services
            .users
            .create(CreateUserInput {
                username: format!("{}-{}", role, &Uuid::new_v4().simple().to_string()[..6]),
                name: format!("Petugas {}", role),
                password: "rahasia123".to_string(),
                role,
            })
            .await
            .expect("create test user");
        self.state
            .auth
            .generate_token(&account)
            .expect("issue test token")
    }

    pub async fn seed_master_data(&self) -> Seeded {
        let master = &self.state.services.master_data;
        let driver = master
            .create_driver(DriverInput {
                name: "Budi Santoso".into(),
                company_name: "PT Maju Jaya".into(),
                username: Some("budi".into()),
                is_active: None,
            })
            .await
            .expect("seed driver");
        let truck = master
            .create_truck(TruckInput {
                plate_number: "B 1234 CD".into(),
                is_active: None,
            })
            .await
            .expect("seed truck");
        let route = master
            .create_route(RouteInput {
                name: "Jakarta-Bandung".into(),
                allowance: ALLOWANCE,
            })
            .await
            .expect("seed route");
        let material = master
            .create_material(MaterialInput {
                name: "Pasir".into(),
                unit: "m3".into(),
            })
            .await
            .expect("seed material");
        Seeded {
            driver,
            truck,
            route,
            material,
        }
    }

    pub async fn create_note(
        &self,
        seeded: &Seeded,
        document_number: &str,
        quantity_loaded: Decimal,
    ) -> delivery_note::Model {
        self.state
            .services
            .delivery_notes
            .create(CreateDeliveryNoteCommand {
                document_number: document_number.to_string(),
                document_date: date(2024, 1, 15),
                truck_id: seeded.truck.id,
                driver_id: seeded.driver.id,
                route_id: seeded.route.id,
                material_id: seeded.material.id,
                quantity_loaded,
                actor: "tester".to_string(),
            })
            .await
            .expect("create delivery note")
    }

    /// Sends a request with an optional JSON body and bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize json request body"))
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("build request")).await
    }

    /// Sends a plain-text body, as used by the CSV import endpoints.
    pub async fn request_text(&self, uri: &str, text: &str, token: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", "text/plain; charset=utf-8")
            .body(Body::from(text.to_string()))
            .expect("build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Decimals travel as strings in JSON.
pub fn json_decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_f64().and_then(rust_decimal::prelude::FromPrimitive::from_f64))
        .unwrap_or_else(|| panic!("not a decimal: {}", value))
}
