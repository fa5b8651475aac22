//! Equipment administration and ledger service

use chrono::{NaiveDate, NaiveTime};
use validator::Validate;

use super::events::Emitter;
use crate::{
    error::{AppError, AppResult},
    lending::{
        ledger,
        permissions::{self, Action},
    },
    models::{
        enums::{AuditAction, EquipmentCondition, EquipmentStatus},
        equipment::{CreateBlockedSlot, CreateEquipment, UpdateEquipment},
        BlockedSlot, Equipment, EquipmentStatusView, NewAuditLog,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    emitter: Emitter,
}

impl EquipmentService {
    pub fn new(repository: Repository, emitter: Emitter) -> Self {
        Self { repository, emitter }
    }

    pub async fn list(&self, lab_id: Option<i32>) -> AppResult<Vec<Equipment>> {
        self.repository.equipment_list(lab_id).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment_get_by_id(id).await
    }

    /// Current ledger values
    pub async fn get_equipment_status(&self, id: i32) -> AppResult<EquipmentStatusView> {
        let equipment = self.repository.equipment_get_by_id(id).await?;
        Ok(EquipmentStatusView::from(&equipment))
    }

    pub async fn create(&self, actor_id: i32, data: &CreateEquipment) -> AppResult<Equipment> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;
        data.validate()?;

        self.repository.labs_get_by_id(data.lab_id).await?;
        self.repository.categories_get_by_id(data.category_id).await?;
        if self.repository.equipment_code_exists(&data.code).await? {
            return Err(AppError::Validation(format!("Equipment code {} already exists", data.code)));
        }

        let equipment = self.repository.equipment_create(data).await?;
        tracing::info!(equipment_id = equipment.id, code = %equipment.code, "Equipment created");

        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Create,
            "equipment",
            equipment.id,
            None,
            Some(&equipment),
            format!("create equipment {}", equipment.code),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(equipment)
    }

    /// Update descriptive fields; status and quantities stay with the ledger
    pub async fn update(&self, actor_id: i32, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;
        data.validate()?;

        let before = self.repository.equipment_get_by_id(id).await?;
        let after = self.repository.equipment_update(id, data).await?;

        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Update,
            "equipment",
            id,
            Some(&before),
            Some(&after),
            format!("update equipment {}", after.code),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(after)
    }

    /// Administrative status overwrite through the ledger
    pub async fn set_status(&self, actor_id: i32, id: i32, status: EquipmentStatus) -> AppResult<Equipment> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;

        let mut tx = self.repository.begin().await?;
        let mut equipment = self.repository.equipment_lock(&mut tx, id).await?;
        let before = equipment.clone();
        let Some(change) = ledger::set_status(&mut equipment, status) else {
            return Ok(equipment);
        };
        let saved = self.repository.equipment_save_ledger(&mut tx, &equipment).await?;
        tx.commit().await?;

        tracing::info!(equipment_id = id, from = %change.from, to = %change.to, "Equipment status changed");

        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Update,
            "equipment",
            id,
            Some(&before),
            Some(&saved),
            format!("status: {} -> {}", change.from, change.to),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(saved)
    }

    /// Overwrite condition; status is left alone
    pub async fn record_condition(&self, actor_id: i32, id: i32, condition: EquipmentCondition) -> AppResult<Equipment> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;

        let mut tx = self.repository.begin().await?;
        let mut equipment = self.repository.equipment_lock(&mut tx, id).await?;
        let before = equipment.clone();
        let previous = ledger::record_condition(&mut equipment, condition);
        if previous == condition {
            return Ok(equipment);
        }
        let saved = self.repository.equipment_save_ledger(&mut tx, &equipment).await?;
        tx.commit().await?;

        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Update,
            "equipment",
            id,
            Some(&before),
            Some(&saved),
            format!("condition: {} -> {}", previous, condition),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(saved)
    }

    pub async fn list_blocked_slots(&self, equipment_id: i32) -> AppResult<Vec<BlockedSlot>> {
        self.repository.equipment_get_by_id(equipment_id).await?;
        self.repository.equipment_list_blocked_slots(equipment_id).await
    }

    /// Block a time slot for all lending
    pub async fn add_blocked_slot(&self, actor_id: i32, equipment_id: i32, data: &CreateBlockedSlot) -> AppResult<BlockedSlot> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;
        self.repository.equipment_get_by_id(equipment_id).await?;

        let (date, start, end) = parse_slot(data)?;
        let slot = self
            .repository
            .equipment_add_blocked_slot(equipment_id, date, start, end, data.block_reason.as_deref())
            .await?;

        tracing::info!(equipment_id, slot_id = slot.id, %date, "Blocked slot added");
        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Create,
            "equipment_availability",
            slot.id,
            None,
            Some(&slot),
            format!("block equipment {} on {} {}-{}", equipment_id, date, start, end),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(slot)
    }

    pub async fn remove_blocked_slot(&self, actor_id: i32, equipment_id: i32, slot_id: i32) -> AppResult<()> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;
        self.repository.equipment_remove_blocked_slot(equipment_id, slot_id).await?;

        let audit = NewAuditLog {
            user_id: Some(actor.id),
            action: AuditAction::Delete,
            entity_type: "equipment_availability".to_string(),
            entity_id: Some(slot_id),
            old_values: None,
            new_values: None,
            description: format!("unblock slot {} of equipment {}", slot_id, equipment_id),
        };
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(())
    }
}

/// Parse YYYY-MM-DD and HH:MM strings of a slot request
fn parse_slot(data: &CreateBlockedSlot) -> AppResult<(NaiveDate, NaiveTime, NaiveTime)> {
    let date = NaiveDate::parse_from_str(&data.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", data.date)))?;
    let parse_time = |s: &str| {
        NaiveTime::parse_from_str(s, "%H:%M")
            .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM", s)))
    };
    let start = parse_time(&data.start_time)?;
    let end = parse_time(&data.end_time)?;
    if start >= end {
        return Err(AppError::InvalidWindow("slot start must be before its end".to_string()));
    }
    Ok((date, start, end))
}
