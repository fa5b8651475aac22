//! Content pages and help tickets on Repository

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        content::{AppContent, CreateTicket, HelpTicket, UpdateTicket, UpsertContent},
        enums::{TicketPriority, TicketStatus},
    },
};

impl Repository {
    pub async fn content_get(&self, key: &str) -> AppResult<AppContent> {
        sqlx::query_as::<_, AppContent>("SELECT * FROM app_content WHERE key = $1 AND is_active")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Content '{}' not found", key)))
    }

    pub async fn content_upsert(&self, data: &UpsertContent, editor_id: i32) -> AppResult<AppContent> {
        let row = sqlx::query_as::<_, AppContent>(
            r#"
            INSERT INTO app_content (key, content, content_type, is_active, created_at, updated_at, updated_by_id)
            VALUES ($1, $2, $3, $4, NOW(), NOW(), $5)
            ON CONFLICT (key) DO UPDATE SET
                content = EXCLUDED.content,
                content_type = EXCLUDED.content_type,
                is_active = EXCLUDED.is_active,
                updated_at = NOW(),
                updated_by_id = EXCLUDED.updated_by_id
            RETURNING *
            "#,
        )
        .bind(&data.key)
        .bind(&data.content)
        .bind(data.content_type.as_deref().unwrap_or("markdown"))
        .bind(data.is_active.unwrap_or(true))
        .bind(editor_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn tickets_get_by_id(&self, id: i32) -> AppResult<HelpTicket> {
        sqlx::query_as::<_, HelpTicket>("SELECT * FROM help_tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", id)))
    }

    pub async fn tickets_create(&self, user_id: i32, data: &CreateTicket) -> AppResult<HelpTicket> {
        let row = sqlx::query_as::<_, HelpTicket>(
            r#"
            INSERT INTO help_tickets (user_id, subject, message, status, priority, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&data.subject)
        .bind(&data.message)
        .bind(TicketStatus::Open)
        .bind(data.priority.unwrap_or(TicketPriority::Normal))
        .bind(data.category.as_deref().unwrap_or("general"))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Apply a status/assignment change; `resolved_at` is stamped on the first move to resolved
    pub async fn tickets_update(&self, id: i32, data: &UpdateTicket) -> AppResult<HelpTicket> {
        sqlx::query_as::<_, HelpTicket>(
            r#"
            UPDATE help_tickets SET
                status = COALESCE($1, status),
                assigned_to_id = COALESCE($2, assigned_to_id),
                resolved_at = CASE
                    WHEN $1 = 'resolved' AND resolved_at IS NULL THEN NOW()
                    ELSE resolved_at
                END,
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(data.status)
        .bind(data.assigned_to_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", id)))
    }

    pub async fn tickets_list(&self, user_id: Option<i32>) -> AppResult<Vec<HelpTicket>> {
        let rows = sqlx::query_as::<_, HelpTicket>(
            "SELECT * FROM help_tickets WHERE $1::int IS NULL OR user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
