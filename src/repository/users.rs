//! User domain methods on Repository

use chrono::{DateTime, Utc};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{UserRole, UserStatus},
        user::{CreateUser, UpdateUser, User, UserQuery},
    },
};

impl Repository {
    /// Get user by ID
    pub async fn users_get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Check if email already exists
    pub async fn users_email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// List users with optional role/status filters and pagination
    pub async fn users_list(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20);
        let offset = (page - 1) * per_page;

        let mut conditions = Vec::new();
        let mut params: Vec<&'static str> = Vec::new();

        if let Some(role) = query.role {
            params.push(role.as_str());
            conditions.push(format!("role = ${}", params.len()));
        }
        if let Some(status) = query.status {
            params.push(status.as_str());
            conditions.push(format!("status = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(*param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT * FROM users {} ORDER BY full_name LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query_as::<_, User>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(*param);
        }
        let users = select_builder.fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Create a new user; accounts start pending verification
    pub async fn users_create(&self, user: &CreateUser) -> AppResult<User> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, nim_nik, role, status, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.nim_nik)
        .bind(user.role.unwrap_or(UserRole::Student))
        .bind(UserStatus::Pending)
        .bind(&user.phone)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update profile fields
    pub async fn users_update(&self, id: i32, user: &UpdateUser) -> AppResult<User> {
        let now = Utc::now();

        let mut sets = vec!["updated_at = $1".to_string()];
        let mut param_idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(user.email, "email");
        add_field!(user.full_name, "full_name");
        add_field!(user.nim_nik, "nim_nik");
        add_field!(user.phone, "phone");
        add_field!(user.role, "role");

        let query = format!(
            "UPDATE users SET {} WHERE id = ${} RETURNING *",
            sets.join(", "),
            param_idx
        );

        let mut builder = sqlx::query_as::<_, User>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(user.email);
        bind_field!(user.full_name);
        bind_field!(user.nim_nik);
        bind_field!(user.phone);
        bind_field!(user.role);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Mark a user verified by `verifier_id`
    pub async fn users_mark_verified(&self, id: i32, verifier_id: i32, at: DateTime<Utc>) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET status = $1, verified_at = $2, verified_by_id = $3, updated_at = $2
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(UserStatus::Verified)
        .bind(at)
        .bind(verifier_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Overwrite account status
    pub async fn users_set_status(&self, id: i32, status: UserStatus) -> AppResult<User> {
        sqlx::query_as::<_, User>("UPDATE users SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Ids of every user holding one of `roles`
    pub async fn users_ids_with_roles(&self, roles: &[UserRole]) -> AppResult<Vec<i32>> {
        let slugs: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM users WHERE role = ANY($1) AND status = $2 ORDER BY id",
        )
        .bind(slugs)
        .bind(UserStatus::Verified)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
