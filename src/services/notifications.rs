//! Notification inbox service

use crate::{
    error::{AppError, AppResult},
    models::Notification,
    repository::Repository,
};

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
}

impl NotificationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_for_user(&self, user_id: i32, unread_only: bool) -> AppResult<Vec<Notification>> {
        self.repository.notifications_list_for_user(user_id, unread_only).await
    }

    /// Mark read; marking twice keeps the first read time
    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<Notification> {
        self.repository
            .notifications_mark_read(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }

    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        self.repository.notifications_mark_all_read(user_id).await
    }

    pub async fn unread_count(&self, user_id: i32) -> AppResult<i64> {
        self.repository.notifications_unread_count(user_id).await
    }
}
