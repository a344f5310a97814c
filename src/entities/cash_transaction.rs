use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Direction of a cash movement.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransactionType {
    #[sea_orm(string_value = "terima")]
    #[serde(rename = "terima")]
    #[strum(serialize = "terima")]
    Inflow,
    #[sea_orm(string_value = "keluar")]
    #[serde(rename = "keluar")]
    #[strum(serialize = "keluar")]
    Outflow,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransactionCategory {
    /// Trip allowance paid automatically on delivery confirmation
    #[sea_orm(string_value = "uang_jalan")]
    #[serde(rename = "uang_jalan")]
    #[strum(serialize = "uang_jalan")]
    RouteAllowance,
    #[sea_orm(string_value = "manual")]
    #[serde(rename = "manual")]
    #[strum(serialize = "manual")]
    Manual,
}

/// Append-only cash log entry.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub date: NaiveDate,
    pub transaction_type: TransactionType,
    pub category: TransactionCategory,
    /// Always positive; the direction lives in `transaction_type`
    pub amount: Decimal,
    pub description: String,
    pub delivery_note_id: Option<Uuid>,
    pub delivery_note_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TransactionType {
    /// Sign applied to an amount of this type when computing the balance.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Inflow => amount,
            TransactionType::Outflow => -amount,
        }
    }
}

impl Model {
    /// Get signed amount (positive for inflow, negative for outflow)
    pub fn signed_amount(&self) -> Decimal {
        self.transaction_type.apply(self.amount)
    }
}
