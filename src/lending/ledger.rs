//! Equipment ledger: status, condition and quantity counters.
//!
//! Every function works on an in-memory `Equipment` row that the caller has
//! locked; persisting the row is the caller's job. Failures leave the row
//! untouched.

use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{EquipmentCondition, EquipmentStatus},
        Equipment,
    },
};

/// Status overwrite, handed to the audit emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub from: EquipmentStatus,
    pub to: EquipmentStatus,
}

/// Take `qty` units out of the available pool
pub fn reserve(equipment: &mut Equipment, qty: i32) -> AppResult<()> {
    if qty < 1 {
        return Err(AppError::Validation("Quantity must be at least 1".to_string()));
    }
    if !equipment.is_active || equipment.status.blocks_lending() {
        return Err(AppError::EquipmentUnavailable(format!(
            "Equipment {} is {}",
            equipment.id,
            if equipment.is_active { equipment.status.as_str() } else { "inactive" }
        )));
    }

    let remaining = equipment.quantity_available - qty;
    if remaining < 0 {
        return Err(AppError::InsufficientStock {
            requested: qty,
            available: equipment.quantity_available,
        });
    }

    equipment.quantity_available = remaining;
    Ok(())
}

/// Put `qty` units back, capped at `quantity_total`
pub fn release(equipment: &mut Equipment, qty: i32) {
    let restored = equipment.quantity_available.saturating_add(qty.max(0));
    equipment.quantity_available = restored.min(equipment.quantity_total);
}

/// Unconditional status overwrite. Returns the change when the status moved.
pub fn set_status(equipment: &mut Equipment, new_status: EquipmentStatus) -> Option<StatusChange> {
    if equipment.status == new_status {
        return None;
    }
    let change = StatusChange {
        from: equipment.status,
        to: new_status,
    };
    equipment.status = new_status;
    Some(change)
}

/// Status for units back in the pool: in use while some are still out
pub fn pool_status(equipment: &Equipment) -> EquipmentStatus {
    if equipment.quantity_available < equipment.quantity_total {
        EquipmentStatus::InUse
    } else {
        EquipmentStatus::Available
    }
}

/// Bring equipment out of maintenance or repair back into the pool.
/// Any other status, retired included, is kept.
pub fn return_to_pool(equipment: &mut Equipment) -> Option<StatusChange> {
    match equipment.status {
        EquipmentStatus::Maintenance | EquipmentStatus::Damaged => {
            let status = pool_status(equipment);
            set_status(equipment, status)
        }
        _ => None,
    }
}

/// Overwrite the condition; status is left alone
pub fn record_condition(equipment: &mut Equipment, condition: EquipmentCondition) -> EquipmentCondition {
    std::mem::replace(&mut equipment.condition, condition)
}

/// `0 <= quantity_available <= quantity_total`
pub fn quantities_consistent(equipment: &Equipment) -> bool {
    (0..=equipment.quantity_total).contains(&equipment.quantity_available)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn equipment(quantity: i32) -> Equipment {
        let now = Utc::now();
        Equipment {
            id: 1,
            name: "Oscilloscope".to_string(),
            code: "OSC-01".to_string(),
            category_id: 1,
            lab_id: 1,
            description: String::new(),
            specifications: serde_json::json!({}),
            brand: None,
            model: None,
            serial_number: None,
            purchase_date: None,
            purchase_price: None,
            condition: EquipmentCondition::Good,
            status: EquipmentStatus::Available,
            needs_head_approval: false,
            quantity_total: quantity,
            quantity_available: quantity,
            max_loan_duration_days: None,
            maintenance_interval_days: 365,
            last_maintenance_date: None,
            next_maintenance_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reserve_and_release() {
        let mut eq = equipment(3);
        reserve(&mut eq, 2).unwrap();
        assert_eq!(eq.quantity_available, 1);
        release(&mut eq, 2);
        assert_eq!(eq.quantity_available, 3);
        assert!(quantities_consistent(&eq));
    }

    #[test]
    fn test_reserve_insufficient_stock_leaves_row_untouched() {
        let mut eq = equipment(1);
        reserve(&mut eq, 1).unwrap();
        let err = reserve(&mut eq, 1).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { requested: 1, available: 0 }));
        assert_eq!(eq.quantity_available, 0);
    }

    #[test]
    fn test_reserve_blocked_statuses() {
        for status in [EquipmentStatus::Maintenance, EquipmentStatus::Damaged, EquipmentStatus::Retired] {
            let mut eq = equipment(2);
            eq.status = status;
            assert!(matches!(reserve(&mut eq, 1), Err(AppError::EquipmentUnavailable(_))));
            assert_eq!(eq.quantity_available, 2);
        }

        // A multi-unit item already in use can still lend its other units
        let mut eq = equipment(2);
        eq.status = EquipmentStatus::InUse;
        assert!(reserve(&mut eq, 1).is_ok());
    }

    #[test]
    fn test_release_is_capped() {
        let mut eq = equipment(2);
        release(&mut eq, 5);
        assert_eq!(eq.quantity_available, 2);
        assert!(quantities_consistent(&eq));
    }

    #[test]
    fn test_set_status_reports_change() {
        let mut eq = equipment(1);
        assert_eq!(set_status(&mut eq, EquipmentStatus::Available), None);
        let change = set_status(&mut eq, EquipmentStatus::Maintenance).unwrap();
        assert_eq!(change.from, EquipmentStatus::Available);
        assert_eq!(change.to, EquipmentStatus::Maintenance);
    }

    #[test]
    fn test_return_to_pool() {
        let mut eq = equipment(2);
        eq.status = EquipmentStatus::Maintenance;
        eq.quantity_available = 1;
        let change = return_to_pool(&mut eq).unwrap();
        assert_eq!(change.to, EquipmentStatus::InUse);

        eq.status = EquipmentStatus::Damaged;
        eq.quantity_available = 2;
        return_to_pool(&mut eq);
        assert_eq!(eq.status, EquipmentStatus::Available);
    }

    #[test]
    fn test_return_to_pool_keeps_retired() {
        let mut eq = equipment(1);
        eq.status = EquipmentStatus::Retired;
        assert_eq!(return_to_pool(&mut eq), None);
        assert_eq!(eq.status, EquipmentStatus::Retired);
        assert!(reserve(&mut eq, 1).is_err());
    }

    #[test]
    fn test_record_condition_keeps_status() {
        let mut eq = equipment(1);
        let previous = record_condition(&mut eq, EquipmentCondition::Poor);
        assert_eq!(previous, EquipmentCondition::Good);
        assert_eq!(eq.status, EquipmentStatus::Available);
    }
}
