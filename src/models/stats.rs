//! Usage statistics shapes

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

/// Half-open reporting range over loan start times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl StatsRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<Self> {
        if from >= to {
            return Err(AppError::InvalidWindow("Statistics range must start before it ends".to_string()));
        }
        Ok(Self { from, to })
    }

    /// The 30 days before `now`
    pub fn last_30_days(now: DateTime<Utc>) -> Self {
        Self {
            from: now - Duration::days(30),
            to: now,
        }
    }

    pub fn hours(&self) -> f64 {
        (self.to - self.from).num_seconds() as f64 / 3600.0
    }
}

/// Grouping for period statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Month,
    Quarter,
    Year,
}

impl Interval {
    /// `DATE_TRUNC` unit
    pub fn trunc_unit(&self) -> &'static str {
        match self {
            Interval::Month => "month",
            Interval::Quarter => "quarter",
            Interval::Year => "year",
        }
    }

    /// `TO_CHAR` pattern giving labels like 2030-03, 2030-Q1, 2030
    pub fn label_format(&self) -> &'static str {
        match self {
            Interval::Month => "YYYY-MM",
            Interval::Quarter => "YYYY-\"Q\"Q",
            Interval::Year => "YYYY",
        }
    }
}

/// Per-equipment borrowing figures. Durations are in hours.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EquipmentUsageStats {
    pub equipment_id: i32,
    pub equipment_name: String,
    pub total_borrowings: i64,
    pub total_hours: f64,
    pub average_duration: f64,
    pub damage_reports: i64,
    pub overdue_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct UserBorrowingStats {
    pub user_id: i32,
    pub user_name: String,
    pub total_borrowings: i64,
    pub completed_borrowings: i64,
    pub overdue_count: i64,
    pub damage_reports: i64,
}

/// Lab totals; `utilization_rate` is the share of unit-hours spent checked out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabUsageStats {
    pub lab_id: i32,
    pub lab_name: String,
    pub total_equipment: i64,
    pub total_borrowings: i64,
    pub utilization_rate: f64,
    pub average_booking_duration: f64,
}

/// Raw lab aggregates before the utilization ratio is taken
#[derive(Debug, Clone, FromRow)]
pub struct LabUsageRow {
    pub lab_id: i32,
    pub lab_name: String,
    pub total_equipment: i64,
    pub total_units: i64,
    pub total_borrowings: i64,
    pub used_unit_hours: f64,
    pub average_booking_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PeriodStats {
    pub period: String,
    pub total_borrowings: i64,
    pub completed_borrowings: i64,
    pub overdue_count: i64,
    pub damage_reports: i64,
    pub unique_users: i64,
    pub unique_equipment: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_bounds() {
        let from = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(StatsRange::new(from, from), Err(AppError::InvalidWindow(_))));

        let range = StatsRange::new(from, from + Duration::days(2)).unwrap();
        assert_eq!(range.hours(), 48.0);
        assert_eq!(StatsRange::last_30_days(from).to, from);
    }
}
