//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::enums::{NotificationStatus, NotificationType};

/// Message addressed to one user; only the read state ever changes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    /// Id of the entity that produced the notification
    pub related_id: Option<i32>,
    /// Entity type of `related_id` ("loan", "equipment", ...)
    pub related_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Notification to be written by the event sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: i32,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<i32>,
    pub related_type: Option<String>,
}
