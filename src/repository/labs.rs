//! Lab and lab roster methods on Repository

use chrono::Utc;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::LabMemberRole,
        lab::{CreateLab, Lab, LabMember, UpdateLab},
    },
};

impl Repository {
    /// Get lab by ID
    pub async fn labs_get_by_id(&self, id: i32) -> AppResult<Lab> {
        sqlx::query_as::<_, Lab>("SELECT * FROM labs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lab {} not found", id)))
    }

    /// List labs, active ones only unless `include_inactive`
    pub async fn labs_list(&self, include_inactive: bool) -> AppResult<Vec<Lab>> {
        let rows = sqlx::query_as::<_, Lab>(
            "SELECT * FROM labs WHERE is_active OR $1 ORDER BY name",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn labs_code_exists(&self, code: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM labs WHERE UPPER(code) = UPPER($1) AND id IS DISTINCT FROM $2)",
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create lab
    pub async fn labs_create(&self, data: &CreateLab) -> AppResult<Lab> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, Lab>(
            r#"
            INSERT INTO labs (name, code, description, location, capacity, operating_hours,
                              contact_email, contact_phone, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $9)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.code)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.capacity)
        .bind(&data.operating_hours)
        .bind(&data.contact_email)
        .bind(&data.contact_phone)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update lab
    pub async fn labs_update(&self, id: i32, data: &UpdateLab) -> AppResult<Lab> {
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
        add_field!(data.code, "code");
        add_field!(data.description, "description");
        add_field!(data.location, "location");
        add_field!(data.capacity, "capacity");
        add_field!(data.operating_hours, "operating_hours");
        add_field!(data.contact_email, "contact_email");
        add_field!(data.contact_phone, "contact_phone");
        add_field!(data.is_active, "is_active");

        let query = format!("UPDATE labs SET {} WHERE id = ${} RETURNING *", sets.join(", "), idx);
        let mut builder = sqlx::query_as::<_, Lab>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.code);
        bind_field!(data.description);
        bind_field!(data.location);
        bind_field!(data.capacity);
        bind_field!(data.operating_hours);
        bind_field!(data.contact_email);
        bind_field!(data.contact_phone);
        bind_field!(data.is_active);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lab {} not found", id)))
    }

    /// Add or re-role a roster entry
    pub async fn labs_upsert_member(&self, lab_id: i32, user_id: i32, role: LabMemberRole) -> AppResult<LabMember> {
        let row = sqlx::query_as::<_, LabMember>(
            r#"
            INSERT INTO lab_members (lab_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (lab_id, user_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING *
            "#,
        )
        .bind(lab_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn labs_remove_member(&self, lab_id: i32, user_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM lab_members WHERE lab_id = $1 AND user_id = $2")
            .bind(lab_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of lab {}",
                user_id, lab_id
            )));
        }
        Ok(())
    }

    pub async fn labs_list_members(&self, lab_id: i32) -> AppResult<Vec<LabMember>> {
        let rows = sqlx::query_as::<_, LabMember>(
            "SELECT * FROM lab_members WHERE lab_id = $1 ORDER BY joined_at",
        )
        .bind(lab_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// User ids of the lab's heads and laborans
    pub async fn labs_staff_ids(&self, lab_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT user_id FROM lab_members
            WHERE lab_id = $1 AND role IN ($2, $3)
            ORDER BY user_id
            "#,
        )
        .bind(lab_id)
        .bind(LabMemberRole::Head)
        .bind(LabMemberRole::Laboran)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
