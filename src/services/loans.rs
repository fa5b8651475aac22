//! Loan lifecycle service.
//!
//! Every state change runs in one transaction holding the equipment row
//! lock, so check-then-reserve is serialized per equipment. Audit rows and
//! notifications go out after commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use super::events::Emitter;
use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    lending::{
        availability::{self, Availability, TimeWindow},
        lifecycle::{self, LoanEvent, Notice, Recipient},
    },
    models::{
        enums::{AuditAction, EquipmentCondition, EquipmentStatus, LoanStatus, NotificationType, UserRole},
        CreateLoan, Equipment, Loan, NewAuditLog, NewNotification, TransitionPayload,
    },
    repository::Repository,
};

/// Outcome of one overdue sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub marked: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    emitter: Emitter,
    policy: LendingConfig,
}

impl LoansService {
    pub fn new(repository: Repository, emitter: Emitter, policy: LendingConfig) -> Self {
        Self {
            repository,
            emitter,
            policy,
        }
    }

    /// Create a pending loan request
    #[tracing::instrument(skip(self, request), fields(user_id = request.user_id, equipment_id = request.equipment_id))]
    pub async fn create_loan_request(&self, request: CreateLoan) -> AppResult<Loan> {
        request.validate()?;
        let requester = self.repository.users_get_by_id(request.user_id).await?;
        let window = TimeWindow {
            start: request.start_datetime,
            end: request.end_datetime,
        };

        let mut tx = self.repository.begin().await?;
        let equipment = self.repository.equipment_lock(&mut tx, request.equipment_id).await?;
        let loans = self
            .repository
            .loans_blocking_overlapping(&mut tx, equipment.id, &window)
            .await?;
        let blocked = self
            .repository
            .equipment_blocked_slots_between(&mut tx, equipment.id, window.start.date_naive(), window.end.date_naive())
            .await?;

        let pending = lifecycle::admit(&request, &requester, &equipment, &loans, &blocked, Utc::now(), &self.policy)
            .map_err(|e| {
                tracing::debug!(error = %e, "Loan request refused");
                e
            })?;
        let loan = self.repository.loans_insert(&mut tx, &pending).await?;
        tx.commit().await?;

        tracing::info!(loan_id = loan.id, quantity = loan.quantity, "Loan request created");

        let audit = NewAuditLog::snapshot(
            Some(requester.id),
            AuditAction::Create,
            "loan",
            loan.id,
            None,
            Some(&loan),
            format!("create: {} requested {} x {}", requester.full_name, loan.quantity, equipment.name),
        );
        let notice = Notice {
            recipient: Recipient::LabStaff,
            kind: NotificationType::BorrowingRequest,
            title: "New loan request".to_string(),
            message: format!(
                "{} requested {} x {} from {} to {}: {}",
                requester.full_name, loan.quantity, equipment.name, loan.start_datetime, loan.end_datetime, loan.purpose
            ),
        };
        let notifications = self.resolve_notices(&loan, &equipment, &[notice]).await;
        self.emitter.emit(Some(audit), notifications).await;

        Ok(loan)
    }

    /// Apply a lifecycle event to a loan.
    ///
    /// `actor_id` is None only for system events (the overdue sweep).
    #[tracing::instrument(skip(self, payload))]
    pub async fn transition(
        &self,
        loan_id: i32,
        event: LoanEvent,
        actor_id: Option<i32>,
        payload: TransitionPayload,
    ) -> AppResult<Loan> {
        let actor = match actor_id {
            Some(id) => Some(self.repository.users_get_by_id(id).await?),
            None => None,
        };
        // Equipment id never changes; read it unlocked to take locks in equipment -> loan order
        let equipment_id = self.repository.loans_get_by_id(loan_id).await?.equipment_id;

        let mut tx = self.repository.begin().await?;
        let mut equipment = self.repository.equipment_lock(&mut tx, equipment_id).await?;
        let loan = self.repository.loans_lock(&mut tx, loan_id).await?;
        let before = ledger_fields(&equipment);

        let outcome = lifecycle::apply(
            &loan,
            &mut equipment,
            event,
            actor.as_ref(),
            &payload,
            Utc::now(),
            &self.policy,
        )
        .map_err(|e| {
            if e.is_guard_failure() {
                tracing::debug!(error = %e, from = %loan.status, "Transition refused");
            } else {
                tracing::info!(error = %e, from = %loan.status, "Transition failed");
            }
            e
        })?;

        if ledger_fields(&equipment) != before {
            self.repository.equipment_save_ledger(&mut tx, &equipment).await?;
        }
        let saved = self.repository.loans_save(&mut tx, &outcome.loan).await?;
        tx.commit().await?;

        tracing::info!(
            loan_id,
            event = %event,
            from = %loan.status,
            to = %saved.status,
            quantity_available = equipment.quantity_available,
            "Loan transitioned"
        );

        let notifications = self.resolve_notices(&saved, &equipment, &outcome.notices).await;
        self.emitter.emit(Some(outcome.audit), notifications).await;

        Ok(saved)
    }

    /// Check whether `quantity` units are free in `[start, end)`, applying
    /// the same window and status rules as a new request
    pub async fn check_availability(
        &self,
        equipment_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        quantity: i32,
    ) -> AppResult<Availability> {
        let window = TimeWindow::new(start, end)?;
        let equipment = self.repository.equipment_get_by_id(equipment_id).await?;

        let mut conn = self.repository.pool.acquire().await?;
        let loans = self
            .repository
            .loans_blocking_overlapping(&mut conn, equipment_id, &window)
            .await?;
        let blocked = self
            .repository
            .equipment_blocked_slots_between(&mut conn, equipment_id, start.date_naive(), end.date_naive())
            .await?;

        availability::check_request(
            &equipment,
            &window,
            quantity,
            Utc::now(),
            self.policy.default_max_loan_days,
            &loans,
            &blocked,
            None,
        )
    }

    /// System-driven move to overdue
    pub async fn mark_overdue(&self, loan_id: i32) -> AppResult<Loan> {
        self.transition(loan_id, LoanEvent::MarkOverdue, None, TransitionPayload::default())
            .await
    }

    /// Mark every checked-out loan past due at `now`; failures are logged and skipped
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let candidates = self.repository.loans_overdue_candidates(now).await?;
        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for loan_id in candidates {
            match self.mark_overdue(loan_id).await {
                Ok(_) => report.marked += 1,
                // Returned or already marked since the candidate query
                Err(AppError::InvalidTransition { .. }) | Err(AppError::InvalidWindow(_)) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(loan_id, error = %e, "Failed to mark loan overdue");
                }
            }
        }

        if report.marked > 0 || report.failed > 0 {
            tracing::info!(examined = report.examined, marked = report.marked, failed = report.failed, "Overdue sweep finished");
        }
        Ok(report)
    }

    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.repository.loans_get_by_id(loan_id).await
    }

    /// Loans of a user; open ones only unless `include_closed`
    pub async fn list_user_loans(&self, user_id: i32, include_closed: bool) -> AppResult<Vec<Loan>> {
        self.repository.users_get_by_id(user_id).await?;
        self.repository.loans_list_for_user(user_id, include_closed).await
    }

    pub async fn list_equipment_loans(&self, equipment_id: i32, status: Option<LoanStatus>) -> AppResult<Vec<Loan>> {
        self.repository.equipment_get_by_id(equipment_id).await?;
        self.repository.loans_list_for_equipment(equipment_id, status).await
    }

    pub async fn find_overdue_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<i32>> {
        self.repository.loans_overdue_candidates(now).await
    }

    /// Turn notices into per-user notifications. Lookup failures only cost
    /// the staff copies.
    async fn resolve_notices(&self, loan: &Loan, equipment: &Equipment, notices: &[Notice]) -> Vec<NewNotification> {
        let mut notifications = Vec::new();
        let mut staff: Option<Vec<i32>> = None;

        for notice in notices {
            let user_ids = match notice.recipient {
                Recipient::Requester => vec![loan.user_id],
                Recipient::LabStaff => {
                    if staff.is_none() {
                        staff = Some(self.lab_staff(equipment.lab_id).await);
                    }
                    staff.clone().unwrap_or_default()
                }
            };
            for user_id in user_ids {
                notifications.push(NewNotification {
                    user_id,
                    kind: notice.kind,
                    title: notice.title.clone(),
                    message: notice.message.clone(),
                    related_id: Some(loan.id),
                    related_type: Some("loan".to_string()),
                });
            }
        }

        notifications
    }

    /// Lab roster staff, or every lab head and laboran when the roster is empty
    async fn lab_staff(&self, lab_id: i32) -> Vec<i32> {
        let roster = match self.repository.labs_staff_ids(lab_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(lab_id, error = %e, "Failed to load lab staff");
                return Vec::new();
            }
        };
        if !roster.is_empty() {
            return roster;
        }
        self.repository
            .users_ids_with_roles(&[UserRole::HeadLab, UserRole::Laboran])
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(lab_id, error = %e, "Failed to load staff users");
                Vec::new()
            })
    }
}

fn ledger_fields(equipment: &Equipment) -> (EquipmentStatus, EquipmentCondition, i32) {
    (equipment.status, equipment.condition, equipment.quantity_available)
}
