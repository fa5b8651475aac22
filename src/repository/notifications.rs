//! Notification methods on Repository

use super::Repository;
use crate::{
    error::AppResult,
    models::{
        enums::NotificationStatus,
        notification::{NewNotification, Notification},
    },
};

impl Repository {
    pub async fn notifications_insert(&self, data: &NewNotification) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, type, title, message, status, related_id, related_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.kind)
        .bind(&data.title)
        .bind(&data.message)
        .bind(NotificationStatus::Unread)
        .bind(data.related_id)
        .bind(&data.related_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn notifications_list_for_user(&self, user_id: i32, unread_only: bool) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR status = $3)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(NotificationStatus::Unread)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Mark one notification read; keeps the first `read_at`
    pub async fn notifications_mark_read(&self, id: i32, user_id: i32) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET status = $1, read_at = COALESCE(read_at, NOW())
            WHERE id = $2 AND user_id = $3
            RETURNING *
            "#,
        )
        .bind(NotificationStatus::Read)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn notifications_mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = $1, read_at = NOW() WHERE user_id = $2 AND status = $3",
        )
        .bind(NotificationStatus::Read)
        .bind(user_id)
        .bind(NotificationStatus::Unread)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn notifications_unread_count(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(NotificationStatus::Unread)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
