//! Maintenance record methods on Repository

use sqlx::PgConnection;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::MaintenanceStatus,
        maintenance::{CreateMaintenance, MaintenanceRecord},
    },
};

impl Repository {
    pub async fn maintenance_get_by_id(&self, id: i32) -> AppResult<MaintenanceRecord> {
        sqlx::query_as::<_, MaintenanceRecord>("SELECT * FROM maintenance_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance record {} not found", id)))
    }

    pub async fn maintenance_lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<MaintenanceRecord> {
        sqlx::query_as::<_, MaintenanceRecord>("SELECT * FROM maintenance_records WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance record {} not found", id)))
    }

    pub async fn maintenance_list_for_equipment(&self, equipment_id: i32) -> AppResult<Vec<MaintenanceRecord>> {
        let rows = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT * FROM maintenance_records WHERE equipment_id = $1 ORDER BY scheduled_date DESC",
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn maintenance_create(&self, data: &CreateMaintenance) -> AppResult<MaintenanceRecord> {
        let row = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            INSERT INTO maintenance_records (equipment_id, maintenance_type, status, scheduled_date,
                                             performed_by, description, cost, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(data.equipment_id)
        .bind(data.maintenance_type)
        .bind(MaintenanceStatus::Scheduled)
        .bind(data.scheduled_date)
        .bind(&data.performed_by)
        .bind(&data.description)
        .bind(data.cost)
        .bind(data.notes.as_deref().unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn maintenance_save(&self, conn: &mut PgConnection, record: &MaintenanceRecord) -> AppResult<MaintenanceRecord> {
        let row = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            UPDATE maintenance_records
            SET status = $1, completed_date = $2, performed_by = $3, cost = $4, notes = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(record.status)
        .bind(record.completed_date)
        .bind(&record.performed_by)
        .bind(record.cost)
        .bind(&record.notes)
        .bind(record.id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}
