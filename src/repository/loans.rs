//! Loan domain methods on Repository

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    lending::TimeWindow,
    models::{enums::LoanStatus, loan::Loan},
};

impl Repository {
    /// Get loan by ID
    pub async fn loans_get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get loan by ID and hold its row lock
    pub async fn loans_lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Blocking loans of one equipment overlapping `window`
    pub async fn loans_blocking_overlapping(
        &self,
        conn: &mut PgConnection,
        equipment_id: i32,
        window: &TimeWindow,
    ) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE equipment_id = $1
              AND status = ANY($2)
              AND start_datetime < $4
              AND end_datetime > $3
            ORDER BY id
            "#,
        )
        .bind(equipment_id)
        .bind(LoanStatus::blocking_slugs())
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Insert a pending loan and return it with its id
    pub async fn loans_insert(&self, conn: &mut PgConnection, loan: &Loan) -> AppResult<Loan> {
        let row = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, equipment_id, quantity, status, start_datetime, end_datetime,
                               purpose, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.equipment_id)
        .bind(loan.quantity)
        .bind(loan.status)
        .bind(loan.start_datetime)
        .bind(loan.end_datetime)
        .bind(&loan.purpose)
        .bind(&loan.notes)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Persist every lifecycle-owned column of a loan
    pub async fn loans_save(&self, conn: &mut PgConnection, loan: &Loan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                status = $1,
                actual_return_datetime = $2,
                notes = $3,
                approved_by_assistant_id = $4,
                approved_by_assistant_at = $5,
                approved_by_head_id = $6,
                approved_by_head_at = $7,
                rejected_by_id = $8,
                rejected_at = $9,
                rejection_reason = $10,
                cancelled_by_id = $11,
                cancelled_at = $12,
                condition_before = $13,
                condition_after = $14,
                damage_report = $15,
                checked_out_at = $16,
                checked_out_by_id = $17,
                checked_in_at = $18,
                checked_in_by_id = $19,
                overdue_at = $20,
                late_fee = $21,
                damage_fee = $22,
                updated_at = $23
            WHERE id = $24
            RETURNING *
            "#,
        )
        .bind(loan.status)
        .bind(loan.actual_return_datetime)
        .bind(&loan.notes)
        .bind(loan.approved_by_assistant_id)
        .bind(loan.approved_by_assistant_at)
        .bind(loan.approved_by_head_id)
        .bind(loan.approved_by_head_at)
        .bind(loan.rejected_by_id)
        .bind(loan.rejected_at)
        .bind(&loan.rejection_reason)
        .bind(loan.cancelled_by_id)
        .bind(loan.cancelled_at)
        .bind(loan.condition_before)
        .bind(loan.condition_after)
        .bind(&loan.damage_report)
        .bind(loan.checked_out_at)
        .bind(loan.checked_out_by_id)
        .bind(loan.checked_in_at)
        .bind(loan.checked_in_by_id)
        .bind(loan.overdue_at)
        .bind(loan.late_fee)
        .bind(loan.damage_fee)
        .bind(loan.updated_at)
        .bind(loan.id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan.id)))
    }

    /// Loans of a user, newest first; terminal ones only when `include_closed`
    pub async fn loans_list_for_user(&self, user_id: i32, include_closed: bool) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE user_id = $1
              AND ($2 OR status NOT IN ('checked_in', 'rejected', 'cancelled'))
            ORDER BY start_datetime DESC
            "#,
        )
        .bind(user_id)
        .bind(include_closed)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Loans of an equipment, optionally in one status
    pub async fn loans_list_for_equipment(
        &self,
        equipment_id: i32,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE equipment_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY start_datetime
            "#,
        )
        .bind(equipment_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Ids of checked-out loans past their end time
    pub async fn loans_overdue_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT id FROM loans
            WHERE status = $1 AND end_datetime < $2 AND actual_return_datetime IS NULL
            ORDER BY end_datetime
            "#,
        )
        .bind(LoanStatus::CheckedOut)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
