//! Maintenance record model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::enums::{EquipmentCondition, MaintenanceStatus, MaintenanceType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenanceRecord {
    pub id: i32,
    pub equipment_id: i32,
    pub maintenance_type: MaintenanceType,
    pub status: MaintenanceStatus,
    pub scheduled_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub performed_by: Option<String>,
    pub description: String,
    pub cost: Option<Decimal>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Schedule maintenance request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaintenance {
    pub equipment_id: i32,
    pub maintenance_type: MaintenanceType,
    pub scheduled_date: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(max = 100))]
    pub performed_by: Option<String>,
    pub cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Completion data for a maintenance record
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteMaintenance {
    pub completed_date: Option<DateTime<Utc>>,
    #[validate(length(max = 100))]
    pub performed_by: Option<String>,
    pub cost: Option<Decimal>,
    pub notes: Option<String>,
    /// Condition after service; left unchanged when absent
    pub condition: Option<EquipmentCondition>,
}

/// Maintenance record lifecycle step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceStep {
    Start,
    Complete,
    Cancel,
}

impl MaintenanceStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStep::Start => "start",
            MaintenanceStep::Complete => "complete",
            MaintenanceStep::Cancel => "cancel",
        }
    }

    /// Next record status, or None when the step is illegal from `from`
    pub fn next(&self, from: MaintenanceStatus) -> Option<MaintenanceStatus> {
        match (self, from) {
            (MaintenanceStep::Start, MaintenanceStatus::Scheduled) => Some(MaintenanceStatus::InProgress),
            (MaintenanceStep::Complete, MaintenanceStatus::Scheduled | MaintenanceStatus::InProgress) => {
                Some(MaintenanceStatus::Completed)
            }
            (MaintenanceStep::Cancel, MaintenanceStatus::Scheduled | MaintenanceStatus::InProgress) => {
                Some(MaintenanceStatus::Cancelled)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maintenance_steps() {
        assert_eq!(
            MaintenanceStep::Start.next(MaintenanceStatus::Scheduled),
            Some(MaintenanceStatus::InProgress)
        );
        assert_eq!(
            MaintenanceStep::Complete.next(MaintenanceStatus::InProgress),
            Some(MaintenanceStatus::Completed)
        );
        assert_eq!(MaintenanceStep::Start.next(MaintenanceStatus::InProgress), None);
        assert_eq!(MaintenanceStep::Cancel.next(MaintenanceStatus::Completed), None);
        assert_eq!(MaintenanceStep::Complete.next(MaintenanceStatus::Cancelled), None);
    }
}
