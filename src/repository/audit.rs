//! Audit log methods on Repository. Rows are only ever inserted.

use super::Repository;
use crate::{
    error::AppResult,
    models::audit::{AuditLog, NewAuditLog},
};

impl Repository {
    pub async fn audit_append(&self, entry: &NewAuditLog) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, old_values, new_values, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING id
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(&entry.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn audit_list_for_entity(&self, entity_type: &str, entity_id: i32) -> AppResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT * FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at, id
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
