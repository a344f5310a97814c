use crate::{
    db::DbPool,
    entities::{driver, material, route, truck},
    errors::ServiceError,
    events::{Event, EventSender},
    import::{DriverRow, MaterialRow, RouteRow, TruckRow},
};
use chrono::Utc;
use metrics::counter;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{non_negative, not_blank};

/// Builds a login handle from a driver's name: lowercase alphanumerics plus a
/// short random suffix so that drivers sharing a name stay distinct.
pub fn derive_username(name: &str) -> String {
    let slug: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect();
    let slug = if slug.is_empty() {
        "supir".to_string()
    } else {
        slug
    };
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("{}-{}", slug, suffix)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DriverInput {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub company_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<DriverRow> for DriverInput {
    fn from(row: DriverRow) -> Self {
        Self {
            name: row.name,
            company_name: row.company_name,
            username: row.username,
            is_active: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TruckInput {
    #[validate(custom = "not_blank")]
    pub plate_number: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<TruckRow> for TruckInput {
    fn from(row: TruckRow) -> Self {
        Self {
            plate_number: row.plate_number,
            is_active: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaterialInput {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub unit: String,
}

impl From<MaterialRow> for MaterialInput {
    fn from(row: MaterialRow) -> Self {
        Self {
            name: row.name,
            unit: row.unit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouteInput {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "non_negative")]
    pub allowance: Decimal,
}

impl From<RouteRow> for RouteInput {
    fn from(row: RouteRow) -> Self {
        Self {
            name: row.name,
            allowance: row.allowance,
        }
    }
}

/// Case-insensitive lookup tables over the master data, loaded once per import.
#[derive(Debug, Default, Clone)]
pub struct MasterDataSnapshot {
    trucks_by_plate: HashMap<String, truck::Model>,
    drivers_by_username: HashMap<String, driver::Model>,
    routes_by_name: HashMap<String, route::Model>,
    materials_by_name: HashMap<String, material::Model>,
}

impl MasterDataSnapshot {
    fn key(value: &str) -> String {
        value.trim().to_lowercase()
    }

    pub fn truck_by_plate(&self, plate: &str) -> Option<&truck::Model> {
        self.trucks_by_plate.get(&Self::key(plate))
    }

    pub fn driver_by_username(&self, username: &str) -> Option<&driver::Model> {
        self.drivers_by_username.get(&Self::key(username))
    }

    pub fn route_by_name(&self, name: &str) -> Option<&route::Model> {
        self.routes_by_name.get(&Self::key(name))
    }

    pub fn material_by_name(&self, name: &str) -> Option<&material::Model> {
        self.materials_by_name.get(&Self::key(name))
    }
}

/// Drivers, trucks, materials and routes.
#[derive(Clone)]
pub struct MasterDataService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MasterDataService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    // ---- drivers -------------------------------------------------------

    /// Lists drivers sorted by name, optionally only the active ones.
    #[instrument(skip(self))]
    pub async fn list_drivers(&self, active_only: bool) -> Result<Vec<driver::Model>, ServiceError> {
        let mut query = driver::Entity::find();
        if active_only {
            query = query.filter(driver::Column::IsActive.eq(true));
        }
        query
            .order_by_asc(driver::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_driver(&self, id: Uuid) -> Result<driver::Model, ServiceError> {
        driver::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Driver {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create_driver(&self, input: DriverInput) -> Result<driver::Model, ServiceError> {
        input.validate()?;
        let created = new_driver(input)
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        info!(driver_id = %created.id, username = %created.username, "Driver created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_driver(
        &self,
        id: Uuid,
        input: DriverInput,
    ) -> Result<driver::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_driver(id).await?;
        let mut model: driver::ActiveModel = existing.into();
        model.name = Set(input.name.trim().to_string());
        model.company_name = Set(input.company_name.trim().to_string());
        if let Some(username) = input.username.filter(|u| !u.trim().is_empty()) {
            model.username = Set(username.trim().to_string());
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        model.updated_at = Set(Utc::now());
        model
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_driver(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = driver::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Driver {} not found", id)));
        }
        Ok(())
    }

    /// Inserts all drivers in one transaction; nothing is stored if any insert fails.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn bulk_create_drivers(
        &self,
        inputs: Vec<DriverInput>,
    ) -> Result<Vec<driver::Model>, ServiceError> {
        for input in &inputs {
            input.validate()?;
        }
        let models = inputs.into_iter().map(new_driver).collect();
        let created = self.insert_all(models).await?;
        self.announce_import("drivers", created.len()).await;
        Ok(created)
    }

    // ---- trucks --------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_trucks(&self, active_only: bool) -> Result<Vec<truck::Model>, ServiceError> {
        let mut query = truck::Entity::find();
        if active_only {
            query = query.filter(truck::Column::IsActive.eq(true));
        }
        query
            .order_by_asc(truck::Column::PlateNumber)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_truck(&self, id: Uuid) -> Result<truck::Model, ServiceError> {
        truck::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Truck {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create_truck(&self, input: TruckInput) -> Result<truck::Model, ServiceError> {
        input.validate()?;
        new_truck(input)
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn update_truck(
        &self,
        id: Uuid,
        input: TruckInput,
    ) -> Result<truck::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_truck(id).await?;
        let mut model: truck::ActiveModel = existing.into();
        model.plate_number = Set(input.plate_number.trim().to_string());
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        model.updated_at = Set(Utc::now());
        model
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_truck(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = truck::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Truck {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn bulk_create_trucks(
        &self,
        inputs: Vec<TruckInput>,
    ) -> Result<Vec<truck::Model>, ServiceError> {
        for input in &inputs {
            input.validate()?;
        }
        let models = inputs.into_iter().map(new_truck).collect();
        let created = self.insert_all(models).await?;
        self.announce_import("trucks", created.len()).await;
        Ok(created)
    }

    // ---- materials -----------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_materials(&self) -> Result<Vec<material::Model>, ServiceError> {
        material::Entity::find()
            .order_by_asc(material::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_material(&self, id: Uuid) -> Result<material::Model, ServiceError> {
        material::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create_material(
        &self,
        input: MaterialInput,
    ) -> Result<material::Model, ServiceError> {
        input.validate()?;
        new_material(input)
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn update_material(
        &self,
        id: Uuid,
        input: MaterialInput,
    ) -> Result<material::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_material(id).await?;
        let mut model: material::ActiveModel = existing.into();
        model.name = Set(input.name.trim().to_string());
        model.unit = Set(input.unit.trim().to_string());
        model.updated_at = Set(Utc::now());
        model
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_material(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = material::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Material {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn bulk_create_materials(
        &self,
        inputs: Vec<MaterialInput>,
    ) -> Result<Vec<material::Model>, ServiceError> {
        for input in &inputs {
            input.validate()?;
        }
        let models = inputs.into_iter().map(new_material).collect();
        let created = self.insert_all(models).await?;
        self.announce_import("materials", created.len()).await;
        Ok(created)
    }

    // ---- routes --------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn list_routes(&self) -> Result<Vec<route::Model>, ServiceError> {
        route::Entity::find()
            .order_by_asc(route::Column::Name)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_route(&self, id: Uuid) -> Result<route::Model, ServiceError> {
        route::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Route {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create_route(&self, input: RouteInput) -> Result<route::Model, ServiceError> {
        input.validate()?;
        new_route(input)
            .insert(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Changing the allowance only affects notes created afterwards; existing
    /// notes keep their snapshot.
    #[instrument(skip(self))]
    pub async fn update_route(
        &self,
        id: Uuid,
        input: RouteInput,
    ) -> Result<route::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_route(id).await?;
        let mut model: route::ActiveModel = existing.into();
        model.name = Set(input.name.trim().to_string());
        model.allowance = Set(input.allowance);
        model.updated_at = Set(Utc::now());
        model
            .update(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_route(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = route::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Route {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn bulk_create_routes(
        &self,
        inputs: Vec<RouteInput>,
    ) -> Result<Vec<route::Model>, ServiceError> {
        for input in &inputs {
            input.validate()?;
        }
        let models = inputs.into_iter().map(new_route).collect();
        let created = self.insert_all(models).await?;
        self.announce_import("routes", created.len()).await;
        Ok(created)
    }

    // ---- lookups -------------------------------------------------------

    /// Loads the lookup tables used to resolve delivery-note imports.
    /// Only active drivers and trucks are resolvable; on duplicate keys the
    /// oldest record wins.
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> Result<MasterDataSnapshot, ServiceError> {
        let db = &*self.db_pool;
        let mut snapshot = MasterDataSnapshot::default();

        let trucks = truck::Entity::find()
            .filter(truck::Column::IsActive.eq(true))
            .order_by_asc(truck::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        for t in trucks {
            snapshot
                .trucks_by_plate
                .entry(MasterDataSnapshot::key(&t.plate_number))
                .or_insert(t);
        }

        let drivers = driver::Entity::find()
            .filter(driver::Column::IsActive.eq(true))
            .order_by_asc(driver::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        for d in drivers {
            snapshot
                .drivers_by_username
                .entry(MasterDataSnapshot::key(&d.username))
                .or_insert(d);
        }

        let routes = route::Entity::find()
            .order_by_asc(route::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        for r in routes {
            snapshot
                .routes_by_name
                .entry(MasterDataSnapshot::key(&r.name))
                .or_insert(r);
        }

        let materials = material::Entity::find()
            .order_by_asc(material::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        for m in materials {
            snapshot
                .materials_by_name
                .entry(MasterDataSnapshot::key(&m.name))
                .or_insert(m);
        }

        Ok(snapshot)
    }

    async fn insert_all<A>(
        &self,
        models: Vec<A>,
    ) -> Result<Vec<<A::Entity as EntityTrait>::Model>, ServiceError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let mut created = Vec::with_capacity(models.len());
        for model in models {
            created.push(model.insert(&txn).await.map_err(ServiceError::db_error)?);
        }
        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(created)
    }

    async fn announce_import(&self, entity: &str, created: usize) {
        counter!("surat_jalan_master_data_imported_total", created as u64, "entity" => entity.to_string());
        info!(entity, created, "Master data imported");
        self.event_sender
            .send_or_log(Event::MasterDataImported {
                entity: entity.to_string(),
                created,
            })
            .await;
    }
}

fn new_driver(input: DriverInput) -> driver::ActiveModel {
    let now = Utc::now();
    let name = input.name.trim().to_string();
    let username = input
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| derive_username(&name));
    driver::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        company_name: Set(input.company_name.trim().to_string()),
        username: Set(username),
        is_active: Set(input.is_active.unwrap_or(true)),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn new_truck(input: TruckInput) -> truck::ActiveModel {
    let now = Utc::now();
    truck::ActiveModel {
        id: Set(Uuid::new_v4()),
        plate_number: Set(input.plate_number.trim().to_string()),
        is_active: Set(input.is_active.unwrap_or(true)),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn new_material(input: MaterialInput) -> material::ActiveModel {
    let now = Utc::now();
    material::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.trim().to_string()),
        unit: Set(input.unit.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn new_route(input: RouteInput) -> route::ActiveModel {
    let now = Utc::now();
    route::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.trim().to_string()),
        allowance: Set(input.allowance),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn derived_usernames_are_slugged_and_unique() {
        let a = derive_username("Budi Santoso");
        let b = derive_username("Budi Santoso");
        assert!(a.starts_with("budisantoso-"));
        assert_eq!(a.len(), "budisantoso-".len() + 5);
        assert_ne!(a, b);
        assert!(derive_username("  ").starts_with("supir-"));
    }

    #[test]
    fn route_input_rejects_negative_allowance() {
        let input = RouteInput {
            name: "Jakarta-Bandung".into(),
            allowance: dec!(-1),
        };
        assert!(input.validate().is_err());
        let input = RouteInput {
            name: "Jakarta-Bandung".into(),
            allowance: dec!(0),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn blank_names_fail_validation() {
        let input = DriverInput {
            name: "   ".into(),
            company_name: "PT Aman".into(),
            username: None,
            is_active: None,
        };
        assert!(input.validate().is_err());
    }
}
