//! Static content pages and help tickets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::enums::{TicketPriority, TicketStatus};

/// Keyed content page (landing page, about us, ...)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppContent {
    pub id: i32,
    pub key: String,
    /// Markdown body
    pub content: String,
    pub content_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertContent {
    #[validate(length(min = 1, max = 100))]
    pub key: String,
    pub content: String,
    #[validate(length(max = 20))]
    pub content_type: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HelpTicket {
    pub id: i32,
    pub user_id: i32,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    /// general, password_reset, account, technical
    pub category: String,
    pub assigned_to_id: Option<i32>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicket {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub message: String,
    pub priority: Option<TicketPriority>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicket {
    pub status: Option<TicketStatus>,
    pub assigned_to_id: Option<i32>,
}
