//! Loan lifecycle state machine.
//!
//! `admit` validates a new request and `apply` runs one event against a
//! loan and its (locked) equipment row. Both are pure: the caller persists
//! the returned loan and equipment inside one transaction, then hands the
//! audit row and notices to the event sink.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    availability::{self, TimeWindow},
    fees,
    ledger::{self, StatusChange},
    permissions::{self, Action},
};
use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        enums::{AuditAction, EquipmentCondition, EquipmentStatus, LoanStatus, NotificationType},
        BlockedSlot, CreateLoan, Equipment, Loan, NewAuditLog, TransitionPayload, User,
    },
};

/// Event driving a loan from one state to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanEvent {
    Approve,
    Reject,
    Cancel,
    Checkout,
    Checkin,
    MarkOverdue,
}

impl LoanEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanEvent::Approve => "approve",
            LoanEvent::Reject => "reject",
            LoanEvent::Cancel => "cancel",
            LoanEvent::Checkout => "checkout",
            LoanEvent::Checkin => "checkin",
            LoanEvent::MarkOverdue => "mark_overdue",
        }
    }
}

impl std::fmt::Display for LoanEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who a notice is addressed to; resolved to user ids by the service layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Requester,
    /// Heads and laborans of the equipment's lab
    LabStaff,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub recipient: Recipient,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
}

/// Everything one transition produced
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub loan: Loan,
    pub equipment_change: Option<StatusChange>,
    pub audit: NewAuditLog,
    pub notices: Vec<Notice>,
}

/// Validate a new request and build the pending loan.
///
/// `loans` and `blocked` are the equipment's current reservations and
/// blocked slots, read under the equipment lock.
pub fn admit(
    request: &CreateLoan,
    requester: &User,
    equipment: &Equipment,
    loans: &[Loan],
    blocked: &[BlockedSlot],
    now: DateTime<Utc>,
    policy: &LendingConfig,
) -> AppResult<Loan> {
    permissions::require(requester, Action::RequestLoan)?;
    if !requester.is_verified() {
        return Err(AppError::Forbidden(format!(
            "User {} is {} and may not borrow",
            requester.id, requester.status
        )));
    }

    let window = TimeWindow {
        start: request.start_datetime,
        end: request.end_datetime,
    };
    availability::check_request(
        equipment,
        &window,
        request.quantity,
        now,
        policy.default_max_loan_days,
        loans,
        blocked,
        None,
    )?
    .into_result()?;

    Ok(Loan::new_pending(request, now))
}

fn invalid(loan: &Loan, event: LoanEvent) -> AppError {
    AppError::InvalidTransition {
        from: loan.status,
        event: event.as_str().to_string(),
    }
}

fn require_actor(actor: Option<&User>, event: LoanEvent) -> AppResult<&User> {
    actor.ok_or_else(|| AppError::Forbidden(format!("{} requires an acting user", event)))
}

/// Apply `event` to `loan`.
///
/// On success `equipment` carries the ledger effects; on any error neither
/// the loan nor the equipment row is changed.
pub fn apply(
    loan: &Loan,
    equipment: &mut Equipment,
    event: LoanEvent,
    actor: Option<&User>,
    payload: &TransitionPayload,
    now: DateTime<Utc>,
    policy: &LendingConfig,
) -> AppResult<TransitionOutcome> {
    let mut next = loan.clone();
    let mut ledger_row = equipment.clone();
    let mut equipment_change = None;
    let mut notices = Vec::new();
    let actor_id = actor.map(|a| a.id);

    let action = match (event, loan.status) {
        (LoanEvent::Approve, LoanStatus::Pending) => {
            let actor = require_actor(actor, event)?;
            permissions::require(actor, Action::ApproveFirstStage)?;
            next.status = LoanStatus::ApprovedByAssistant;
            next.approved_by_assistant_id = Some(actor.id);
            next.approved_by_assistant_at = Some(now);

            let message = if equipment.needs_head_approval {
                format!("Loan #{} was approved by lab staff and awaits the lab head.", loan.id)
            } else {
                format!("Loan #{} was approved and can be picked up.", loan.id)
            };
            notices.push(requester_notice(NotificationType::BorrowingApproved, "Loan approved", message));
            AuditAction::Approve
        }
        (LoanEvent::Approve, LoanStatus::ApprovedByAssistant) if equipment.needs_head_approval => {
            let actor = require_actor(actor, event)?;
            permissions::require(actor, Action::ApproveHeadStage)?;
            next.status = LoanStatus::ApprovedByHead;
            next.approved_by_head_id = Some(actor.id);
            next.approved_by_head_at = Some(now);
            notices.push(requester_notice(
                NotificationType::BorrowingApproved,
                "Loan approved by lab head",
                format!("Loan #{} was approved by the lab head and can be picked up.", loan.id),
            ));
            AuditAction::Approve
        }
        (
            LoanEvent::Reject,
            LoanStatus::Pending | LoanStatus::ApprovedByAssistant | LoanStatus::ApprovedByHead,
        ) => {
            let actor = require_actor(actor, event)?;
            permissions::require(actor, Action::Reject)?;
            next.status = LoanStatus::Rejected;
            next.rejected_by_id = Some(actor.id);
            next.rejected_at = Some(now);
            next.rejection_reason = payload.reason.clone();

            let reason = payload.reason.as_deref().unwrap_or("no reason given");
            notices.push(requester_notice(
                NotificationType::BorrowingRejected,
                "Loan rejected",
                format!("Loan #{} was rejected: {}", loan.id, reason),
            ));
            AuditAction::Reject
        }
        (
            LoanEvent::Cancel,
            LoanStatus::Pending | LoanStatus::ApprovedByAssistant | LoanStatus::ApprovedByHead,
        ) => {
            let actor = require_actor(actor, event)?;
            if actor.id != loan.user_id {
                permissions::require(actor, Action::CancelAny)?;
            }
            // Nothing is held in the ledger before checkout; leaving the
            // blocking set frees the window.
            next.status = LoanStatus::Cancelled;
            next.cancelled_by_id = Some(actor.id);
            next.cancelled_at = Some(now);
            if let Some(reason) = &payload.reason {
                next.notes = append_note(&next.notes, &format!("Cancelled: {}", reason));
            }
            AuditAction::Update
        }
        (LoanEvent::Checkout, LoanStatus::ApprovedByHead)
        | (LoanEvent::Checkout, LoanStatus::ApprovedByAssistant) => {
            if loan.status == LoanStatus::ApprovedByAssistant && equipment.needs_head_approval {
                return Err(invalid(loan, event));
            }
            let actor = require_actor(actor, event)?;
            permissions::require(actor, Action::Checkout)?;

            let opens_at = loan.start_datetime - Duration::minutes(policy.checkout_tolerance_minutes);
            if now < opens_at || now >= loan.end_datetime {
                return Err(AppError::InvalidWindow(format!(
                    "Loan #{} can only be checked out between {} and {}",
                    loan.id, opens_at, loan.end_datetime
                )));
            }

            ledger::reserve(&mut ledger_row, loan.quantity)?;
            equipment_change = ledger::set_status(&mut ledger_row, EquipmentStatus::InUse);

            next.status = LoanStatus::CheckedOut;
            next.checked_out_at = Some(now);
            next.checked_out_by_id = Some(actor.id);
            next.condition_before = Some(payload.condition.unwrap_or(equipment.condition));
            if let Some(notes) = &payload.notes {
                next.notes = append_note(&next.notes, notes);
            }
            AuditAction::Checkout
        }
        (LoanEvent::MarkOverdue, LoanStatus::CheckedOut) => {
            if let Some(actor) = actor {
                permissions::require(actor, Action::MarkOverdue)?;
            }
            if now <= loan.end_datetime || loan.actual_return_datetime.is_some() {
                return Err(AppError::InvalidWindow(format!(
                    "Loan #{} is not past due until {}",
                    loan.id, loan.end_datetime
                )));
            }
            next.status = LoanStatus::Overdue;
            next.overdue_at = Some(now);

            let message = format!(
                "Loan #{} for {} was due at {} and has not been returned.",
                loan.id, equipment.name, loan.end_datetime
            );
            notices.push(requester_notice(NotificationType::EquipmentOverdue, "Loan overdue", message.clone()));
            notices.push(Notice {
                recipient: Recipient::LabStaff,
                kind: NotificationType::EquipmentOverdue,
                title: "Loan overdue".to_string(),
                message,
            });
            AuditAction::Update
        }
        (LoanEvent::Checkin, LoanStatus::CheckedOut | LoanStatus::Overdue) => {
            let actor = require_actor(actor, event)?;
            permissions::require(actor, Action::Checkin)?;

            ledger::release(&mut ledger_row, loan.quantity);

            let before = loan.condition_before.unwrap_or(equipment.condition);
            let after = payload.condition.unwrap_or(before);
            let damaged = payload.damage_report.is_some()
                || after == EquipmentCondition::Damaged
                || after.is_worse_than(before);
            ledger::record_condition(&mut ledger_row, after);

            let new_status = if damaged {
                Some(EquipmentStatus::Damaged)
            } else if ledger_row.status == EquipmentStatus::InUse
                && ledger_row.quantity_available == ledger_row.quantity_total
            {
                Some(EquipmentStatus::Available)
            } else {
                None
            };
            equipment_change = new_status.and_then(|s| ledger::set_status(&mut ledger_row, s));

            next.status = LoanStatus::CheckedIn;
            next.actual_return_datetime = Some(now);
            next.checked_in_at = Some(now);
            next.checked_in_by_id = Some(actor.id);
            next.condition_after = Some(after);
            next.damage_report = payload.damage_report.clone();
            next.late_fee = fees::late_fee(policy.late_fee_per_day, loan.end_datetime, now);
            next.damage_fee = if damaged {
                Some(payload.damage_fee.unwrap_or(policy.damage_fee))
            } else {
                None
            };

            notices.push(requester_notice(
                NotificationType::EquipmentReturned,
                "Equipment returned",
                match next.late_fee {
                    Some(fee) => format!("Loan #{} was returned late; a fee of {} applies.", loan.id, fee),
                    None => format!("Loan #{} was returned. Thank you.", loan.id),
                },
            ));
            if damaged {
                notices.push(Notice {
                    recipient: Recipient::LabStaff,
                    kind: NotificationType::EquipmentDamaged,
                    title: "Equipment returned damaged".to_string(),
                    message: format!(
                        "{} came back from loan #{} in {} condition: {}",
                        equipment.name,
                        loan.id,
                        after,
                        payload.damage_report.as_deref().unwrap_or("no report")
                    ),
                });
            }
            AuditAction::Checkin
        }
        _ => return Err(invalid(loan, event)),
    };

    next.updated_at = now;

    let mut new_values = serde_json::to_value(&next).ok();
    if let (Some(serde_json::Value::Object(map)), Some(change)) = (new_values.as_mut(), equipment_change) {
        if let Ok(value) = serde_json::to_value(change) {
            map.insert("equipment_status_change".to_string(), value);
        }
    }
    let audit = NewAuditLog {
        user_id: actor_id,
        action,
        entity_type: "loan".to_string(),
        entity_id: Some(loan.id),
        old_values: serde_json::to_value(loan).ok(),
        new_values,
        description: format!("{}: {} -> {}", event, loan.status, next.status),
    };

    *equipment = ledger_row;
    Ok(TransitionOutcome {
        loan: next,
        equipment_change,
        audit,
        notices,
    })
}

fn requester_notice(kind: NotificationType, title: &str, message: String) -> Notice {
    Notice {
        recipient: Recipient::Requester,
        kind,
        title: title.to_string(),
        message,
    }
}

fn append_note(notes: &str, line: &str) -> String {
    if notes.is_empty() {
        line.to_string()
    } else {
        format!("{}\n{}", notes, line)
    }
}
