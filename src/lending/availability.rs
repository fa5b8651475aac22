//! Availability checker for reservation windows

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{BlockedSlot, Equipment, Loan},
};

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::InvalidWindow("start must be before end".to_string()));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Result of an availability check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Conflict {
        /// Blocking loan requests over capacity in the window
        loan_ids: Vec<i32>,
        /// Blocked slots overlapping the window
        blocked_slot_ids: Vec<i32>,
    },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    pub fn into_result(self) -> AppResult<()> {
        match self {
            Availability::Available => Ok(()),
            Availability::Conflict { loan_ids, blocked_slot_ids } => {
                Err(AppError::Conflict { loan_ids, blocked_slot_ids })
            }
        }
    }
}

/// Reject empty, past or too long windows
pub fn validate_window(window: &TimeWindow, now: DateTime<Utc>, max_days: Option<i64>) -> AppResult<()> {
    if window.start >= window.end {
        return Err(AppError::InvalidWindow("start must be before end".to_string()));
    }
    if window.start < now {
        return Err(AppError::InvalidWindow("start is in the past".to_string()));
    }
    if let Some(max_days) = max_days {
        let duration = window.duration();
        if duration > Duration::days(max_days) {
            let whole_days = duration.num_days();
            let requested_days = if duration > Duration::days(whole_days) {
                whole_days + 1
            } else {
                whole_days
            };
            return Err(AppError::DurationExceeded { requested_days, max_days });
        }
    }
    Ok(())
}

/// Decide whether `quantity` units fit in `window`.
///
/// `loans` and `blocked` may contain rows for other equipment or in any
/// status; only blocking loans and blocked slots of this equipment count.
pub fn check(
    equipment: &Equipment,
    window: &TimeWindow,
    quantity: i32,
    loans: &[Loan],
    blocked: &[BlockedSlot],
    exclude_request_id: Option<i32>,
) -> Availability {
    let blocked_slot_ids: Vec<i32> = blocked
        .iter()
        .filter(|slot| slot.equipment_id == equipment.id && slot.is_blocked)
        .filter(|slot| slot.window().overlaps(window))
        .map(|slot| slot.id)
        .collect();

    let overlapping: Vec<&Loan> = loans
        .iter()
        .filter(|loan| loan.equipment_id == equipment.id)
        .filter(|loan| Some(loan.id) != exclude_request_id)
        .filter(|loan| loan.status.is_blocking())
        .filter(|loan| loan.window().overlaps(window))
        .collect();

    let committed: i64 = overlapping.iter().map(|loan| i64::from(loan.quantity)).sum();
    let over_capacity = committed + i64::from(quantity) > i64::from(equipment.quantity_total);

    if blocked_slot_ids.is_empty() && !over_capacity {
        return Availability::Available;
    }

    let loan_ids = if over_capacity {
        overlapping.iter().map(|loan| loan.id).collect()
    } else {
        Vec::new()
    };

    Availability::Conflict { loan_ids, blocked_slot_ids }
}

/// Full check for a new request: window rules, equipment status, then capacity
#[allow(clippy::too_many_arguments)]
pub fn check_request(
    equipment: &Equipment,
    window: &TimeWindow,
    quantity: i32,
    now: DateTime<Utc>,
    default_max_days: Option<i64>,
    loans: &[Loan],
    blocked: &[BlockedSlot],
    exclude_request_id: Option<i32>,
) -> AppResult<Availability> {
    let max_days = equipment
        .max_loan_duration_days
        .map(i64::from)
        .or(default_max_days);
    validate_window(window, now, max_days)?;

    if !equipment.is_active || equipment.status.blocks_lending() {
        return Err(AppError::EquipmentUnavailable(format!(
            "Equipment {} is not lendable ({})",
            equipment.id, equipment.status
        )));
    }
    if quantity > equipment.quantity_total {
        return Err(AppError::InsufficientStock {
            requested: quantity,
            available: equipment.quantity_total,
        });
    }

    Ok(check(equipment, window, quantity, loans, blocked, exclude_request_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lending::ledger::tests::equipment;
    use crate::models::{enums::LoanStatus, CreateLoan};
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 4, hour, minute, 0).unwrap()
    }

    fn loan(id: i32, start: DateTime<Utc>, end: DateTime<Utc>, status: LoanStatus) -> Loan {
        let request = CreateLoan {
            user_id: 7,
            equipment_id: 1,
            quantity: 1,
            start_datetime: start,
            end_datetime: end,
            purpose: "lab work".to_string(),
            notes: None,
        };
        let mut loan = Loan::new_pending(&request, at(0, 0));
        loan.id = id;
        loan.status = status;
        loan
    }

    #[test]
    fn test_half_open_overlap() {
        let a = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
        let b = TimeWindow::new(at(10, 30), at(11, 30)).unwrap();
        let c = TimeWindow::new(at(11, 0), at(12, 0)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn test_conflict_on_single_unit() {
        let eq = equipment(1);
        let existing = vec![loan(1, at(10, 0), at(11, 0), LoanStatus::Pending)];

        let overlapping = TimeWindow::new(at(10, 30), at(11, 30)).unwrap();
        assert_eq!(
            check(&eq, &overlapping, 1, &existing, &[], None),
            Availability::Conflict { loan_ids: vec![1], blocked_slot_ids: vec![] }
        );

        let adjacent = TimeWindow::new(at(11, 0), at(12, 0)).unwrap();
        assert!(check(&eq, &adjacent, 1, &existing, &[], None).is_available());
    }

    #[test]
    fn test_capacity_counts_quantities() {
        let eq = equipment(3);
        let mut existing = vec![
            loan(1, at(9, 0), at(12, 0), LoanStatus::CheckedOut),
            loan(2, at(10, 0), at(11, 0), LoanStatus::ApprovedByHead),
        ];
        let window = TimeWindow::new(at(10, 0), at(10, 30)).unwrap();
        assert!(check(&eq, &window, 1, &existing, &[], None).is_available());
        assert!(!check(&eq, &window, 2, &existing, &[], None).is_available());

        existing[1].quantity = 2;
        match check(&eq, &window, 1, &existing, &[], None) {
            Availability::Conflict { loan_ids, .. } => assert_eq!(loan_ids, vec![1, 2]),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_terminal_and_excluded_loans_do_not_block() {
        let eq = equipment(1);
        let existing = vec![
            loan(1, at(10, 0), at(11, 0), LoanStatus::Cancelled),
            loan(2, at(10, 0), at(11, 0), LoanStatus::Rejected),
            loan(3, at(10, 0), at(11, 0), LoanStatus::CheckedIn),
            loan(4, at(10, 0), at(11, 0), LoanStatus::Pending),
        ];
        let window = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
        assert!(!check(&eq, &window, 1, &existing, &[], None).is_available());
        assert!(check(&eq, &window, 1, &existing, &[], Some(4)).is_available());
    }

    #[test]
    fn test_blocked_slot_is_unconditional_conflict() {
        let eq = equipment(10);
        let slot = BlockedSlot {
            id: 5,
            equipment_id: 1,
            date: NaiveDate::from_ymd_opt(2030, 3, 4).unwrap(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            is_blocked: true,
            block_reason: Some("calibration".to_string()),
            created_at: at(0, 0),
        };
        let window = TimeWindow::new(at(9, 0), at(11, 0)).unwrap();
        assert_eq!(
            check(&eq, &window, 1, &[], std::slice::from_ref(&slot), None),
            Availability::Conflict { loan_ids: vec![], blocked_slot_ids: vec![5] }
        );

        let after = TimeWindow::new(at(10, 0), at(11, 0)).unwrap();
        assert!(check(&eq, &after, 1, &[], &[slot.clone()], None).is_available());

        let mut open = slot;
        open.is_blocked = false;
        assert!(check(&eq, &window, 1, &[], &[open], None).is_available());
    }

    #[test]
    fn test_validate_window() {
        let now = at(8, 0);
        let ok = TimeWindow { start: at(9, 0), end: at(10, 0) };
        assert!(validate_window(&ok, now, Some(1)).is_ok());

        let inverted = TimeWindow { start: at(10, 0), end: at(9, 0) };
        assert!(matches!(validate_window(&inverted, now, None), Err(AppError::InvalidWindow(_))));

        let past = TimeWindow { start: at(7, 0), end: at(9, 0) };
        assert!(matches!(validate_window(&past, now, None), Err(AppError::InvalidWindow(_))));

        let long = TimeWindow { start: at(9, 0), end: at(9, 0) + Duration::days(3) + Duration::hours(1) };
        assert!(matches!(
            validate_window(&long, now, Some(3)),
            Err(AppError::DurationExceeded { requested_days: 4, max_days: 3 })
        ));
    }

    #[test]
    fn test_check_request_rejects_unlendable_equipment() {
        let mut eq = equipment(1);
        eq.status = crate::models::EquipmentStatus::Damaged;
        let window = TimeWindow { start: at(9, 0), end: at(10, 0) };
        let err = check_request(&eq, &window, 1, at(8, 0), None, &[], &[], None).unwrap_err();
        assert!(matches!(err, AppError::EquipmentUnavailable(_)));
    }

    #[test]
    fn test_check_request_uses_equipment_limit_first() {
        let mut eq = equipment(1);
        eq.max_loan_duration_days = Some(1);
        let window = TimeWindow { start: at(9, 0), end: at(9, 0) + Duration::days(2) };
        let err = check_request(&eq, &window, 1, at(8, 0), Some(30), &[], &[], None).unwrap_err();
        assert!(matches!(err, AppError::DurationExceeded { max_days: 1, .. }));
    }
}
