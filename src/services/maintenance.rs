//! Maintenance scheduling service.
//!
//! Starting a record takes the equipment out of the lending pool; completing
//! or cancelling it puts the equipment back.

use chrono::{Duration, Utc};
use validator::Validate;

use super::events::Emitter;
use crate::{
    error::{AppError, AppResult},
    lending::{
        ledger,
        permissions::{self, Action},
    },
    models::{
        enums::{AuditAction, EquipmentStatus, MaintenanceStatus, NotificationType},
        maintenance::{CompleteMaintenance, CreateMaintenance, MaintenanceStep},
        MaintenanceRecord, NewAuditLog, NewNotification,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
    emitter: Emitter,
}

impl MaintenanceService {
    pub fn new(repository: Repository, emitter: Emitter) -> Self {
        Self { repository, emitter }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<MaintenanceRecord> {
        self.repository.maintenance_get_by_id(id).await
    }

    pub async fn list_for_equipment(&self, equipment_id: i32) -> AppResult<Vec<MaintenanceRecord>> {
        self.repository.equipment_get_by_id(equipment_id).await?;
        self.repository.maintenance_list_for_equipment(equipment_id).await
    }

    /// Schedule a record and notify the lab staff
    pub async fn schedule(&self, actor_id: i32, data: &CreateMaintenance) -> AppResult<MaintenanceRecord> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageMaintenance)?;
        data.validate()?;

        let equipment = self.repository.equipment_get_by_id(data.equipment_id).await?;
        let record = self.repository.maintenance_create(data).await?;
        tracing::info!(
            maintenance_id = record.id,
            equipment_id = equipment.id,
            kind = %record.maintenance_type,
            "Maintenance scheduled"
        );

        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Create,
            "maintenance",
            record.id,
            None,
            Some(&record),
            format!("schedule {} maintenance of {}", record.maintenance_type, equipment.code),
        );
        let staff = self.repository.labs_staff_ids(equipment.lab_id).await.unwrap_or_else(|e| {
            tracing::warn!(lab_id = equipment.lab_id, error = %e, "Failed to load lab staff");
            Vec::new()
        });
        let notifications = staff
            .into_iter()
            .map(|user_id| NewNotification {
                user_id,
                kind: NotificationType::MaintenanceScheduled,
                title: "Maintenance scheduled".to_string(),
                message: format!(
                    "{} maintenance of {} is scheduled for {}: {}",
                    record.maintenance_type, equipment.name, record.scheduled_date, record.description
                ),
                related_id: Some(record.id),
                related_type: Some("maintenance".to_string()),
            })
            .collect();
        self.emitter.emit(Some(audit), notifications).await;

        Ok(record)
    }

    /// Record in progress, equipment under maintenance
    pub async fn start(&self, actor_id: i32, id: i32) -> AppResult<MaintenanceRecord> {
        self.step(actor_id, id, MaintenanceStep::Start, CompleteMaintenance::default())
            .await
    }

    /// Record completed, equipment back in the pool with fresh maintenance dates
    pub async fn complete(&self, actor_id: i32, id: i32, data: CompleteMaintenance) -> AppResult<MaintenanceRecord> {
        data.validate()?;
        self.step(actor_id, id, MaintenanceStep::Complete, data).await
    }

    pub async fn cancel(&self, actor_id: i32, id: i32) -> AppResult<MaintenanceRecord> {
        self.step(actor_id, id, MaintenanceStep::Cancel, CompleteMaintenance::default())
            .await
    }

    async fn step(
        &self,
        actor_id: i32,
        id: i32,
        step: MaintenanceStep,
        data: CompleteMaintenance,
    ) -> AppResult<MaintenanceRecord> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageMaintenance)?;
        let equipment_id = self.repository.maintenance_get_by_id(id).await?.equipment_id;

        let mut tx = self.repository.begin().await?;
        let mut equipment = self.repository.equipment_lock(&mut tx, equipment_id).await?;
        let record = self.repository.maintenance_lock(&mut tx, id).await?;

        let next_status = step.next(record.status).ok_or_else(|| AppError::InvalidMaintenanceTransition {
            from: record.status,
            event: step.as_str().to_string(),
        })?;

        let mut updated = record.clone();
        updated.status = next_status;
        let equipment_before = equipment.clone();

        match step {
            MaintenanceStep::Start => {
                if equipment.status == EquipmentStatus::Retired || !equipment.is_active {
                    return Err(AppError::EquipmentUnavailable(format!(
                        "Equipment {} is out of service",
                        equipment.code
                    )));
                }
                ledger::set_status(&mut equipment, EquipmentStatus::Maintenance);
            }
            MaintenanceStep::Complete => {
                let completed = data.completed_date.unwrap_or_else(Utc::now);
                updated.completed_date = Some(completed);
                updated.performed_by = data.performed_by.or(updated.performed_by.take());
                updated.cost = data.cost.or(updated.cost);
                if let Some(notes) = data.notes {
                    updated.notes = notes;
                }
                if let Some(condition) = data.condition {
                    ledger::record_condition(&mut equipment, condition);
                }
                equipment.last_maintenance_date = Some(completed);
                equipment.next_maintenance_date =
                    Some(completed + Duration::days(i64::from(equipment.maintenance_interval_days)));
                ledger::return_to_pool(&mut equipment);
            }
            MaintenanceStep::Cancel => {
                if record.status == MaintenanceStatus::InProgress
                    && equipment.status == EquipmentStatus::Maintenance
                {
                    ledger::return_to_pool(&mut equipment);
                }
            }
        }

        self.repository.equipment_save_ledger(&mut tx, &equipment).await?;
        let saved = self.repository.maintenance_save(&mut tx, &updated).await?;
        tx.commit().await?;

        tracing::info!(
            maintenance_id = id,
            equipment_id,
            step = step.as_str(),
            equipment_status = %equipment.status,
            "Maintenance record updated"
        );

        let mut new_values = serde_json::to_value(&saved).ok();
        if let Some(serde_json::Value::Object(map)) = new_values.as_mut() {
            if equipment.status != equipment_before.status {
                map.insert(
                    "equipment_status_change".to_string(),
                    serde_json::json!({ "from": equipment_before.status, "to": equipment.status }),
                );
            }
        }
        let audit = NewAuditLog {
            user_id: Some(actor.id),
            action: AuditAction::Update,
            entity_type: "maintenance".to_string(),
            entity_id: Some(id),
            old_values: serde_json::to_value(&record).ok(),
            new_values,
            description: format!("{}: {} -> {}", step.as_str(), record.status, saved.status),
        };
        self.emitter.emit(Some(audit), Vec::new()).await;

        Ok(saved)
    }
}
