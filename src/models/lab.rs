//! Lab and lab roster models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::enums::LabMemberRole;

/// Physical lab owning equipment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lab {
    pub id: i32,
    pub name: String,
    /// Short unique code (e.g. "CHEM-01")
    pub code: String,
    pub description: String,
    pub location: String,
    pub capacity: i32,
    pub operating_hours: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LabMember {
    pub id: i32,
    pub lab_id: i32,
    pub user_id: i32,
    pub role: LabMemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Create lab request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLab {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[serde(default)]
    pub capacity: i32,
    #[serde(default)]
    pub operating_hours: String,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(length(max = 20))]
    pub contact_phone: Option<String>,
}

/// Update lab request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLab {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub operating_hours: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[validate(length(max = 20))]
    pub contact_phone: Option<String>,
    pub is_active: Option<bool>,
}
