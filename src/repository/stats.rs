//! Usage statistics aggregates over loans.
//!
//! A borrowing is a loan that reached checkout. Damage reports are returns
//! that carried a damage fee; overdue counts include loans that were overdue
//! at any point.

use chrono::{DateTime, Utc};

use super::Repository;
use crate::{
    error::AppResult,
    models::{
        enums::LoanStatus,
        stats::{EquipmentUsageStats, Interval, LabUsageRow, PeriodStats, StatsRange, UserBorrowingStats},
    },
};

impl Repository {
    /// Borrowing figures per equipment for loans starting in `range`
    pub async fn stats_equipment_usage(
        &self,
        range: &StatsRange,
        lab_id: Option<i32>,
        limit: i64,
    ) -> AppResult<Vec<EquipmentUsageStats>> {
        let rows = sqlx::query_as::<_, EquipmentUsageStats>(
            r#"
            SELECT
                e.id AS equipment_id,
                e.name AS equipment_name,
                COUNT(l.id) AS total_borrowings,
                COALESCE(SUM(EXTRACT(EPOCH FROM (l.checked_in_at - l.checked_out_at)) / 3600.0), 0)::float8 AS total_hours,
                COALESCE(AVG(EXTRACT(EPOCH FROM (l.checked_in_at - l.checked_out_at)) / 3600.0), 0)::float8 AS average_duration,
                COUNT(l.id) FILTER (WHERE l.damage_fee IS NOT NULL) AS damage_reports,
                COUNT(l.id) FILTER (WHERE l.overdue_at IS NOT NULL) AS overdue_count
            FROM equipment e
            LEFT JOIN loans l ON l.equipment_id = e.id
                AND l.checked_out_at IS NOT NULL
                AND l.start_datetime >= $1
                AND l.start_datetime < $2
            WHERE $3::int IS NULL OR e.lab_id = $3
            GROUP BY e.id, e.name
            ORDER BY total_borrowings DESC, e.id
            LIMIT $4
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(lab_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Borrowing figures per user for loans starting in `range`
    pub async fn stats_user_borrowing(&self, range: &StatsRange, limit: i64) -> AppResult<Vec<UserBorrowingStats>> {
        let rows = sqlx::query_as::<_, UserBorrowingStats>(
            r#"
            SELECT
                u.id AS user_id,
                u.full_name AS user_name,
                COUNT(l.id) AS total_borrowings,
                COUNT(l.id) FILTER (WHERE l.status = $3) AS completed_borrowings,
                COUNT(l.id) FILTER (WHERE l.overdue_at IS NOT NULL) AS overdue_count,
                COUNT(l.id) FILTER (WHERE l.damage_fee IS NOT NULL) AS damage_reports
            FROM users u
            JOIN loans l ON l.user_id = u.id
                AND l.checked_out_at IS NOT NULL
                AND l.start_datetime >= $1
                AND l.start_datetime < $2
            GROUP BY u.id, u.full_name
            ORDER BY total_borrowings DESC, u.id
            LIMIT $4
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(LoanStatus::CheckedIn)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Lab aggregates. Used unit-hours count checked-out time clipped to
    /// `range`; loans still out run until `now`.
    pub async fn stats_lab_usage(
        &self,
        range: &StatsRange,
        lab_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<LabUsageRow>> {
        let rows = sqlx::query_as::<_, LabUsageRow>(
            r#"
            SELECT
                lb.id AS lab_id,
                lb.name AS lab_name,
                COALESCE(eq.total_equipment, 0) AS total_equipment,
                COALESCE(eq.total_units, 0) AS total_units,
                COALESCE(bk.total_borrowings, 0) AS total_borrowings,
                COALESCE(us.used_unit_hours, 0)::float8 AS used_unit_hours,
                COALESCE(bk.average_booking_duration, 0)::float8 AS average_booking_duration
            FROM labs lb
            LEFT JOIN (
                SELECT lab_id, COUNT(*) AS total_equipment, SUM(quantity_total)::int8 AS total_units
                FROM equipment
                WHERE is_active
                GROUP BY lab_id
            ) eq ON eq.lab_id = lb.id
            LEFT JOIN (
                SELECT
                    e.lab_id,
                    COUNT(*) AS total_borrowings,
                    AVG(EXTRACT(EPOCH FROM (l.end_datetime - l.start_datetime)) / 3600.0) AS average_booking_duration
                FROM loans l
                JOIN equipment e ON e.id = l.equipment_id
                WHERE l.checked_out_at IS NOT NULL
                  AND l.start_datetime >= $1
                  AND l.start_datetime < $2
                GROUP BY e.lab_id
            ) bk ON bk.lab_id = lb.id
            LEFT JOIN (
                SELECT
                    e.lab_id,
                    SUM(
                        EXTRACT(EPOCH FROM (LEAST(COALESCE(l.checked_in_at, $3), $2) - GREATEST(l.checked_out_at, $1)))
                        / 3600.0 * l.quantity
                    ) AS used_unit_hours
                FROM loans l
                JOIN equipment e ON e.id = l.equipment_id
                WHERE l.checked_out_at IS NOT NULL
                  AND l.checked_out_at < $2
                  AND COALESCE(l.checked_in_at, $3) > $1
                GROUP BY e.lab_id
            ) us ON us.lab_id = lb.id
            WHERE $4::int IS NULL OR lb.id = $4
            ORDER BY lb.id
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(now)
        .bind(lab_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Borrowing figures bucketed by the loan start time
    pub async fn stats_by_period(&self, range: &StatsRange, interval: Interval) -> AppResult<Vec<PeriodStats>> {
        let bucket = format!("DATE_TRUNC('{}', l.start_datetime)", interval.trunc_unit());
        let query = format!(
            r#"
            SELECT
                TO_CHAR({bucket}, '{format}') AS period,
                COUNT(*) AS total_borrowings,
                COUNT(*) FILTER (WHERE l.status = $3) AS completed_borrowings,
                COUNT(*) FILTER (WHERE l.overdue_at IS NOT NULL) AS overdue_count,
                COUNT(*) FILTER (WHERE l.damage_fee IS NOT NULL) AS damage_reports,
                COUNT(DISTINCT l.user_id) AS unique_users,
                COUNT(DISTINCT l.equipment_id) AS unique_equipment
            FROM loans l
            WHERE l.checked_out_at IS NOT NULL
              AND l.start_datetime >= $1
              AND l.start_datetime < $2
            GROUP BY {bucket}
            ORDER BY {bucket}
            "#,
            bucket = bucket,
            format = interval.label_format(),
        );

        let rows = sqlx::query_as::<_, PeriodStats>(&query)
            .bind(range.from)
            .bind(range.to)
            .bind(LoanStatus::CheckedIn)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
