//! Equipment category methods on Repository

use std::collections::HashMap;

use sqlx::PgConnection;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::category::{CreateCategory, EquipmentCategory},
};

impl Repository {
    pub async fn categories_get_by_id(&self, id: i32) -> AppResult<EquipmentCategory> {
        sqlx::query_as::<_, EquipmentCategory>("SELECT * FROM equipment_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    pub async fn categories_list(&self, lab_id: Option<i32>) -> AppResult<Vec<EquipmentCategory>> {
        let rows = sqlx::query_as::<_, EquipmentCategory>(
            "SELECT * FROM equipment_categories WHERE $1::int IS NULL OR lab_id = $1 ORDER BY name",
        )
        .bind(lab_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Every category id mapped to its parent. Rows stay locked until the
    /// transaction ends, so tree moves run one at a time.
    pub async fn categories_lock_parent_map(&self, conn: &mut PgConnection) -> AppResult<HashMap<i32, Option<i32>>> {
        let rows: Vec<(i32, Option<i32>)> =
            sqlx::query_as("SELECT id, parent_id FROM equipment_categories ORDER BY id FOR UPDATE")
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn categories_create(&self, data: &CreateCategory) -> AppResult<EquipmentCategory> {
        let row = sqlx::query_as::<_, EquipmentCategory>(
            r#"
            INSERT INTO equipment_categories (name, description, lab_id, parent_id, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.lab_id)
        .bind(data.parent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn categories_set_parent(
        &self,
        conn: &mut PgConnection,
        id: i32,
        parent_id: Option<i32>,
    ) -> AppResult<EquipmentCategory> {
        sqlx::query_as::<_, EquipmentCategory>(
            "UPDATE equipment_categories SET parent_id = $1 WHERE id = $2 RETURNING *",
        )
        .bind(parent_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }
}
