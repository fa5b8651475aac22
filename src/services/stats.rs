//! Usage statistics service

use chrono::Utc;

use crate::{
    error::AppResult,
    models::stats::{
        EquipmentUsageStats, Interval, LabUsageRow, LabUsageStats, PeriodStats, StatsRange, UserBorrowingStats,
    },
    repository::Repository,
};

const MAX_ROWS: i64 = 500;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Most borrowed equipment first. Defaults to the last 30 days.
    #[tracing::instrument(skip(self))]
    pub async fn equipment_usage(
        &self,
        range: Option<StatsRange>,
        lab_id: Option<i32>,
        limit: i64,
    ) -> AppResult<Vec<EquipmentUsageStats>> {
        let range = range.unwrap_or_else(|| StatsRange::last_30_days(Utc::now()));
        self.repository
            .stats_equipment_usage(&range, lab_id, limit.clamp(1, MAX_ROWS))
            .await
    }

    /// Most active borrowers first
    #[tracing::instrument(skip(self))]
    pub async fn user_borrowing(&self, range: Option<StatsRange>, limit: i64) -> AppResult<Vec<UserBorrowingStats>> {
        let range = range.unwrap_or_else(|| StatsRange::last_30_days(Utc::now()));
        self.repository
            .stats_user_borrowing(&range, limit.clamp(1, MAX_ROWS))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn lab_usage(&self, range: Option<StatsRange>, lab_id: Option<i32>) -> AppResult<Vec<LabUsageStats>> {
        let now = Utc::now();
        let range = range.unwrap_or_else(|| StatsRange::last_30_days(now));
        let rows = self.repository.stats_lab_usage(&range, lab_id, now).await?;
        Ok(rows.into_iter().map(|row| lab_stats(row, range.hours())).collect())
    }

    /// Borrowings grouped by month, quarter or year of their start
    #[tracing::instrument(skip(self))]
    pub async fn by_period(&self, range: Option<StatsRange>, interval: Interval) -> AppResult<Vec<PeriodStats>> {
        let range = range.unwrap_or_else(|| StatsRange::last_30_days(Utc::now()));
        self.repository.stats_by_period(&range, interval).await
    }
}

/// Share of available unit-hours spent checked out, in `[0, 1]`
pub fn utilization_rate(used_unit_hours: f64, total_units: i64, range_hours: f64) -> f64 {
    let capacity = total_units as f64 * range_hours;
    if capacity <= 0.0 {
        return 0.0;
    }
    (used_unit_hours / capacity).clamp(0.0, 1.0)
}

fn lab_stats(row: LabUsageRow, range_hours: f64) -> LabUsageStats {
    LabUsageStats {
        lab_id: row.lab_id,
        lab_name: row.lab_name,
        total_equipment: row.total_equipment,
        total_borrowings: row.total_borrowings,
        utilization_rate: utilization_rate(row.used_unit_hours, row.total_units, range_hours),
        average_booking_duration: row.average_booking_duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_rate() {
        // 2 units over 10 hours, one unit out for 5
        assert_eq!(utilization_rate(5.0, 2, 10.0), 0.25);
        assert_eq!(utilization_rate(40.0, 2, 10.0), 1.0);
        assert_eq!(utilization_rate(3.0, 0, 10.0), 0.0);
    }

    #[test]
    fn test_lab_stats_keeps_counts() {
        let row = LabUsageRow {
            lab_id: 3,
            lab_name: "Chemistry".to_string(),
            total_equipment: 4,
            total_units: 6,
            total_borrowings: 9,
            used_unit_hours: 72.0,
            average_booking_duration: 2.5,
        };
        let stats = lab_stats(row, 24.0);
        assert_eq!(stats.total_borrowings, 9);
        assert_eq!(stats.utilization_rate, 0.5);
        assert_eq!(stats.average_booking_duration, 2.5);
    }
}
