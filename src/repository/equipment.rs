//! Equipment domain methods on Repository

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::PgConnection;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{EquipmentCondition, EquipmentStatus},
        equipment::{BlockedSlot, CreateEquipment, Equipment, UpdateEquipment},
    },
};

impl Repository {
    /// List equipment, optionally for one lab
    pub async fn equipment_list(&self, lab_id: Option<i32>) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE $1::int IS NULL OR lab_id = $1 ORDER BY name",
        )
        .bind(lab_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn equipment_get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Get equipment by ID and hold its row lock until the transaction ends.
    ///
    /// Every check-then-reserve sequence for one equipment id goes through
    /// here, so they run one at a time per equipment.
    pub async fn equipment_lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Persist the ledger-owned columns of a locked row
    pub async fn equipment_save_ledger(&self, conn: &mut PgConnection, equipment: &Equipment) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment
            SET status = $1, condition = $2, quantity_available = $3,
                last_maintenance_date = $4, next_maintenance_date = $5, updated_at = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(equipment.status)
        .bind(equipment.condition)
        .bind(equipment.quantity_available)
        .bind(equipment.last_maintenance_date)
        .bind(equipment.next_maintenance_date)
        .bind(Utc::now())
        .bind(equipment.id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub async fn equipment_code_exists(&self, code: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create equipment; every unit starts available
    pub async fn equipment_create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let quantity = data.quantity_total.unwrap_or(1);
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (
                name, code, category_id, lab_id, description, specifications,
                brand, model, serial_number, purchase_date, purchase_price,
                condition, status, needs_head_approval, quantity_total, quantity_available,
                max_loan_duration_days, maintenance_interval_days, is_active, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $15, $16, $17, TRUE, NOW(), NOW()
            )
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.code)
        .bind(data.category_id)
        .bind(data.lab_id)
        .bind(&data.description)
        .bind(data.specifications.clone().unwrap_or_else(|| serde_json::json!({})))
        .bind(&data.brand)
        .bind(&data.model)
        .bind(&data.serial_number)
        .bind(data.purchase_date)
        .bind(data.purchase_price)
        .bind(data.condition.unwrap_or(EquipmentCondition::Good))
        .bind(EquipmentStatus::Available)
        .bind(data.needs_head_approval)
        .bind(quantity)
        .bind(data.max_loan_duration_days)
        .bind(data.maintenance_interval_days.unwrap_or(365))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update descriptive fields
    pub async fn equipment_update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.category_id, "category_id");
        add_field!(data.lab_id, "lab_id");
        add_field!(data.description, "description");
        add_field!(data.specifications, "specifications");
        add_field!(data.brand, "brand");
        add_field!(data.model, "model");
        add_field!(data.serial_number, "serial_number");
        add_field!(data.needs_head_approval, "needs_head_approval");
        add_field!(data.max_loan_duration_days, "max_loan_duration_days");
        add_field!(data.maintenance_interval_days, "maintenance_interval_days");
        add_field!(data.is_active, "is_active");

        let query = format!("UPDATE equipment SET {} WHERE id = ${} RETURNING *", sets.join(", "), idx);

        let mut builder = sqlx::query_as::<_, Equipment>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.category_id);
        bind_field!(data.lab_id);
        bind_field!(data.description);
        bind_field!(data.specifications);
        bind_field!(data.brand);
        bind_field!(data.model);
        bind_field!(data.serial_number);
        bind_field!(data.needs_head_approval);
        bind_field!(data.max_loan_duration_days);
        bind_field!(data.maintenance_interval_days);
        bind_field!(data.is_active);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Blocked slots of one equipment on the days `from..=to`
    pub async fn equipment_blocked_slots_between(
        &self,
        conn: &mut PgConnection,
        equipment_id: i32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<BlockedSlot>> {
        let rows = sqlx::query_as::<_, BlockedSlot>(
            r#"
            SELECT * FROM equipment_availability
            WHERE equipment_id = $1 AND is_blocked AND date BETWEEN $2 AND $3
            ORDER BY date, start_time
            "#,
        )
        .bind(equipment_id)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn equipment_list_blocked_slots(&self, equipment_id: i32) -> AppResult<Vec<BlockedSlot>> {
        let rows = sqlx::query_as::<_, BlockedSlot>(
            "SELECT * FROM equipment_availability WHERE equipment_id = $1 ORDER BY date, start_time",
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn equipment_add_blocked_slot(
        &self,
        equipment_id: i32,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        reason: Option<&str>,
    ) -> AppResult<BlockedSlot> {
        let row = sqlx::query_as::<_, BlockedSlot>(
            r#"
            INSERT INTO equipment_availability (equipment_id, date, start_time, end_time, is_blocked, block_reason, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(equipment_id)
        .bind(date)
        .bind(start_time)
        .bind(end_time)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn equipment_remove_blocked_slot(&self, equipment_id: i32, slot_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipment_availability WHERE id = $1 AND equipment_id = $2")
            .bind(slot_id)
            .bind(equipment_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Blocked slot {} not found for equipment {}",
                slot_id, equipment_id
            )));
        }
        Ok(())
    }
}
