use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Back-office role. Each role unlocks one area of the dashboard; `Admin` unlocks all.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "input_surat_jalan")]
    InputSuratJalan,
    #[sea_orm(string_value = "input_kas")]
    InputKas,
    #[sea_orm(string_value = "input_invoice")]
    InputInvoice,
    #[sea_orm(string_value = "reader")]
    Reader,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_names_match_stored_values() {
        assert_eq!(UserRole::InputSuratJalan.to_string(), "input_surat_jalan");
        assert_eq!(UserRole::from_str("input_kas").unwrap(), UserRole::InputKas);
        assert_eq!(
            serde_json::to_string(&UserRole::Reader).unwrap(),
            "\"reader\""
        );
    }
}
