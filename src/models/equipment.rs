//! Equipment model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::enums::{EquipmentCondition, EquipmentStatus};
use crate::lending::availability::TimeWindow;

/// Borrowable equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    /// Unique inventory code
    pub code: String,
    pub category_id: i32,
    pub lab_id: i32,
    pub description: String,
    /// Free-form technical specifications
    pub specifications: serde_json::Value,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price: Option<Decimal>,
    pub condition: EquipmentCondition,
    pub status: EquipmentStatus,
    /// Loans need a second approval by the lab head
    pub needs_head_approval: bool,
    pub quantity_total: i32,
    pub quantity_available: i32,
    pub max_loan_duration_days: Option<i32>,
    pub maintenance_interval_days: i32,
    pub last_maintenance_date: Option<DateTime<Utc>>,
    pub next_maintenance_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger view returned by `get_equipment_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentStatusView {
    pub status: EquipmentStatus,
    pub condition: EquipmentCondition,
    pub quantity_available: i32,
    pub quantity_total: i32,
}

impl From<&Equipment> for EquipmentStatusView {
    fn from(e: &Equipment) -> Self {
        Self {
            status: e.status,
            condition: e.condition,
            quantity_available: e.quantity_available,
            quantity_total: e.quantity_total,
        }
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub category_id: i32,
    pub lab_id: i32,
    #[serde(default)]
    pub description: String,
    pub specifications: Option<serde_json::Value>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub purchase_price: Option<Decimal>,
    pub condition: Option<EquipmentCondition>,
    #[serde(default)]
    pub needs_head_approval: bool,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity_total: Option<i32>,
    #[validate(range(min = 1))]
    pub max_loan_duration_days: Option<i32>,
    #[validate(range(min = 1))]
    pub maintenance_interval_days: Option<i32>,
}

/// Update equipment request.
///
/// Status and quantities are owned by the ledger and cannot be set here.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category_id: Option<i32>,
    pub lab_id: Option<i32>,
    pub description: Option<String>,
    pub specifications: Option<serde_json::Value>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub needs_head_approval: Option<bool>,
    #[validate(range(min = 1))]
    pub max_loan_duration_days: Option<i32>,
    #[validate(range(min = 1))]
    pub maintenance_interval_days: Option<i32>,
    pub is_active: Option<bool>,
}

/// Administratively blocked availability slot (maintenance blackout)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlockedSlot {
    pub id: i32,
    pub equipment_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BlockedSlot {
    /// UTC window covered by the slot
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.date.and_time(self.start_time).and_utc(),
            end: self.date.and_time(self.end_time).and_utc(),
        }
    }
}

/// Create blocked slot request
#[derive(Debug, Deserialize)]
pub struct CreateBlockedSlot {
    /// Date (YYYY-MM-DD)
    pub date: String,
    /// Start time (HH:MM)
    pub start_time: String,
    /// End time (HH:MM)
    pub end_time: String,
    pub block_reason: Option<String>,
}
