use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use super::common::{created_response, csv_response, no_content_response, ActiveQuery};
use crate::{
    entities::{driver, material, route, truck},
    errors::ServiceError,
    export,
    import::ImportReport,
    services::master_data::{DriverInput, MaterialInput, RouteInput, TruckInput},
    ApiResponse, ApiResult, AppState,
};

// ---- drivers -----------------------------------------------------------

pub async fn list_drivers(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<driver::Model>> {
    let drivers = state.services.master_data.list_drivers(query.active).await?;
    Ok(Json(ApiResponse::success(drivers)))
}

pub async fn get_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<driver::Model> {
    let driver = state.services.master_data.get_driver(id).await?;
    Ok(Json(ApiResponse::success(driver)))
}

pub async fn create_driver(
    State(state): State<AppState>,
    Json(input): Json<DriverInput>,
) -> Result<Response, ServiceError> {
    let driver = state.services.master_data.create_driver(input).await?;
    Ok(created_response(driver))
}

pub async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<DriverInput>,
) -> ApiResult<driver::Model> {
    let driver = state.services.master_data.update_driver(id, input).await?;
    Ok(Json(ApiResponse::success(driver)))
}

pub async fn delete_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.master_data.delete_driver(id).await?;
    Ok(no_content_response())
}

pub async fn import_drivers(State(state): State<AppState>, body: String) -> ApiResult<ImportReport> {
    let report = state.services.imports.import_drivers(&body).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn export_drivers(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let drivers = state.services.master_data.list_drivers(false).await?;
    Ok(csv_response("supir.csv", export::drivers_csv(&drivers)?))
}

// ---- trucks ------------------------------------------------------------

pub async fn list_trucks(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<truck::Model>> {
    let trucks = state.services.master_data.list_trucks(query.active).await?;
    Ok(Json(ApiResponse::success(trucks)))
}

pub async fn get_truck(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<truck::Model> {
    let truck = state.services.master_data.get_truck(id).await?;
    Ok(Json(ApiResponse::success(truck)))
}

pub async fn create_truck(
    State(state): State<AppState>,
    Json(input): Json<TruckInput>,
) -> Result<Response, ServiceError> {
    let truck = state.services.master_data.create_truck(input).await?;
    Ok(created_response(truck))
}

pub async fn update_truck(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TruckInput>,
) -> ApiResult<truck::Model> {
    let truck = state.services.master_data.update_truck(id, input).await?;
    Ok(Json(ApiResponse::success(truck)))
}

pub async fn delete_truck(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.master_data.delete_truck(id).await?;
    Ok(no_content_response())
}

pub async fn import_trucks(State(state): State<AppState>, body: String) -> ApiResult<ImportReport> {
    let report = state.services.imports.import_trucks(&body).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn export_trucks(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let trucks = state.services.master_data.list_trucks(false).await?;
    Ok(csv_response("truck.csv", export::trucks_csv(&trucks)?))
}

// ---- materials ---------------------------------------------------------

pub async fn list_materials(State(state): State<AppState>) -> ApiResult<Vec<material::Model>> {
    let materials = state.services.master_data.list_materials().await?;
    Ok(Json(ApiResponse::success(materials)))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<material::Model> {
    let material = state.services.master_data.get_material(id).await?;
    Ok(Json(ApiResponse::success(material)))
}

pub async fn create_material(
    State(state): State<AppState>,
    Json(input): Json<MaterialInput>,
) -> Result<Response, ServiceError> {
    let material = state.services.master_data.create_material(input).await?;
    Ok(created_response(material))
}

pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<MaterialInput>,
) -> ApiResult<material::Model> {
    let material = state.services.master_data.update_material(id, input).await?;
    Ok(Json(ApiResponse::success(material)))
}

pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.master_data.delete_material(id).await?;
    Ok(no_content_response())
}

pub async fn import_materials(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<ImportReport> {
    let report = state.services.imports.import_materials(&body).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn export_materials(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let materials = state.services.master_data.list_materials().await?;
    Ok(csv_response("material.csv", export::materials_csv(&materials)?))
}

// ---- routes ------------------------------------------------------------

pub async fn list_routes(State(state): State<AppState>) -> ApiResult<Vec<route::Model>> {
    let routes = state.services.master_data.list_routes().await?;
    Ok(Json(ApiResponse::success(routes)))
}

pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<route::Model> {
    let route = state.services.master_data.get_route(id).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn create_route(
    State(state): State<AppState>,
    Json(input): Json<RouteInput>,
) -> Result<Response, ServiceError> {
    let route = state.services.master_data.create_route(input).await?;
    Ok(created_response(route))
}

pub async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RouteInput>,
) -> ApiResult<route::Model> {
    let route = state.services.master_data.update_route(id, input).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.master_data.delete_route(id).await?;
    Ok(no_content_response())
}

pub async fn import_routes(State(state): State<AppState>, body: String) -> ApiResult<ImportReport> {
    let report = state.services.imports.import_routes(&body).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn export_routes(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let routes = state.services.master_data.list_routes().await?;
    Ok(csv_response("rute.csv", export::routes_csv(&routes)?))
}
