//! Loan (borrowing request) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::enums::{EquipmentCondition, LoanStatus};
use crate::lending::availability::TimeWindow;

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub quantity: i32,
    pub status: LoanStatus,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub actual_return_datetime: Option<DateTime<Utc>>,
    pub purpose: String,
    pub notes: String,

    pub approved_by_assistant_id: Option<i32>,
    pub approved_by_assistant_at: Option<DateTime<Utc>>,
    pub approved_by_head_id: Option<i32>,
    pub approved_by_head_at: Option<DateTime<Utc>>,
    pub rejected_by_id: Option<i32>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub cancelled_by_id: Option<i32>,
    pub cancelled_at: Option<DateTime<Utc>>,

    pub condition_before: Option<EquipmentCondition>,
    pub condition_after: Option<EquipmentCondition>,
    pub damage_report: Option<String>,

    pub checked_out_at: Option<DateTime<Utc>>,
    pub checked_out_by_id: Option<i32>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by_id: Option<i32>,
    pub overdue_at: Option<DateTime<Utc>>,

    /// Computed once at check-in
    pub late_fee: Option<Decimal>,
    pub damage_fee: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_datetime,
            end: self.end_datetime,
        }
    }

    /// Unsaved pending loan; the id is assigned on insert
    pub fn new_pending(request: &CreateLoan, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id: request.user_id,
            equipment_id: request.equipment_id,
            quantity: request.quantity,
            status: LoanStatus::Pending,
            start_datetime: request.start_datetime,
            end_datetime: request.end_datetime,
            actual_return_datetime: None,
            purpose: request.purpose.clone(),
            notes: request.notes.clone().unwrap_or_default(),
            approved_by_assistant_id: None,
            approved_by_assistant_at: None,
            approved_by_head_id: None,
            approved_by_head_at: None,
            rejected_by_id: None,
            rejected_at: None,
            rejection_reason: None,
            cancelled_by_id: None,
            cancelled_at: None,
            condition_before: None,
            condition_after: None,
            damage_report: None,
            checked_out_at: None,
            checked_out_by_id: None,
            checked_in_at: None,
            checked_in_by_id: None,
            overdue_at: None,
            late_fee: None,
            damage_fee: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLoan {
    pub user_id: i32,
    pub equipment_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    #[validate(length(min = 1, max = 500, message = "Purpose must be 1-500 characters"))]
    pub purpose: String,
    pub notes: Option<String>,
}

/// Extra data carried by a lifecycle event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitionPayload {
    /// Rejection or cancellation reason
    pub reason: Option<String>,
    /// Condition observed at checkout or check-in
    pub condition: Option<EquipmentCondition>,
    pub damage_report: Option<String>,
    /// Overrides the configured damage fee
    pub damage_fee: Option<Decimal>,
    pub notes: Option<String>,
}
