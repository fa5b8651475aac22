//! Append-only audit log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::enums::AuditAction;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: i64,
    /// Acting user; None for system sweeps
    pub user_id: Option<i32>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<i32>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Audit row to be appended by the event sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditLog {
    pub user_id: Option<i32>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<i32>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub description: String,
}

impl NewAuditLog {
    /// Snapshot-based audit entry for one entity
    pub fn snapshot<T: Serialize>(
        user_id: Option<i32>,
        action: AuditAction,
        entity_type: &str,
        entity_id: i32,
        before: Option<&T>,
        after: Option<&T>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            action,
            entity_type: entity_type.to_string(),
            entity_id: Some(entity_id),
            old_values: before.and_then(|v| serde_json::to_value(v).ok()),
            new_values: after.and_then(|v| serde_json::to_value(v).ok()),
            description: description.into(),
        }
    }
}
