//! Error types for the lab lending core

use thiserror::Error;

use crate::models::enums::{LoanStatus, MaintenanceStatus};

/// Stable numeric error codes exposed to the API layer built on top of the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    Forbidden = 2,
    DbFailure = 3,
    NotFound = 4,
    InvalidWindow = 5,
    DurationExceeded = 6,
    Conflict = 7,
    EquipmentUnavailable = 8,
    InsufficientStock = 9,
    InvalidTransition = 10,
    BadValue = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Loan duration of {requested_days} days exceeds the maximum of {max_days} days")]
    DurationExceeded { requested_days: i64, max_days: i64 },

    #[error("Conflict with loans {loan_ids:?} and blocked slots {blocked_slot_ids:?}")]
    Conflict {
        loan_ids: Vec<i32>,
        blocked_slot_ids: Vec<i32>,
    },

    #[error("Equipment unavailable: {0}")]
    EquipmentUnavailable(String),

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Invalid transition: cannot {event} a loan in state {from}")]
    InvalidTransition { from: LoanStatus, event: String },

    #[error("Invalid maintenance transition: cannot {event} a record in state {from}")]
    InvalidMaintenanceTransition { from: MaintenanceStatus, event: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Code reported to callers of the core
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidWindow(_) => ErrorCode::InvalidWindow,
            AppError::DurationExceeded { .. } => ErrorCode::DurationExceeded,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::EquipmentUnavailable(_) => ErrorCode::EquipmentUnavailable,
            AppError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            AppError::InvalidTransition { .. } | AppError::InvalidMaintenanceTransition { .. } => {
                ErrorCode::InvalidTransition
            }
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ErrorCode::DbFailure
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorCode::Failure
            }
        }
    }

    /// Validation failures that leave no state behind
    pub fn is_guard_failure(&self) -> bool {
        matches!(
            self,
            AppError::InvalidTransition { .. }
                | AppError::InvalidMaintenanceTransition { .. }
                | AppError::Forbidden(_)
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let conflict = AppError::Conflict { loan_ids: vec![1, 2], blocked_slot_ids: vec![] };
        assert_eq!(conflict.code(), ErrorCode::Conflict);
        assert_eq!(
            AppError::InsufficientStock { requested: 2, available: 1 }.code(),
            ErrorCode::InsufficientStock
        );
        assert_eq!(AppError::NotFound("loan 4".into()).code() as u32, 4);
    }

    #[test]
    fn test_guard_failures() {
        let err = AppError::InvalidTransition {
            from: LoanStatus::Cancelled,
            event: "cancel".into(),
        };
        assert!(err.is_guard_failure());
        assert_eq!(err.to_string(), "Invalid transition: cannot cancel a loan in state cancelled");
        assert!(!AppError::NotFound("loan 1".into()).is_guard_failure());
    }
}
