//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::enums::{UserRole, UserStatus};

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    /// Student number or staff number
    pub nim_nik: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    /// Back-reference to the verifying user, lookup only
    pub verified_by_id: Option<i32>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.status == UserStatus::Verified
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(email(message = "Invalid email format"), length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: String,
    #[validate(length(max = 50))]
    pub nim_nik: Option<String>,
    pub role: Option<UserRole>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

/// Update user request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(max = 50))]
    pub nim_nik: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

/// User query parameters
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
