//! Lab and roster service

use validator::Validate;

use super::events::Emitter;
use crate::{
    error::{AppError, AppResult},
    lending::permissions::{self, Action},
    models::{
        enums::{AuditAction, LabMemberRole},
        lab::{CreateLab, UpdateLab},
        Lab, LabMember, NewAuditLog,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LabsService {
    repository: Repository,
    emitter: Emitter,
}

impl LabsService {
    pub fn new(repository: Repository, emitter: Emitter) -> Self {
        Self { repository, emitter }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Lab> {
        self.repository.labs_get_by_id(id).await
    }

    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<Lab>> {
        self.repository.labs_list(include_inactive).await
    }

    pub async fn create(&self, actor_id: i32, data: &CreateLab) -> AppResult<Lab> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageLabs)?;
        data.validate()?;
        if self.repository.labs_code_exists(&data.code, None).await? {
            return Err(AppError::Validation(format!("Lab code {} already exists", data.code)));
        }

        let lab = self.repository.labs_create(data).await?;
        tracing::info!(lab_id = lab.id, code = %lab.code, "Lab created");
        let audit = NewAuditLog::snapshot(Some(actor.id), AuditAction::Create, "lab", lab.id, None, Some(&lab), "create lab");
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(lab)
    }

    pub async fn update(&self, actor_id: i32, id: i32, data: &UpdateLab) -> AppResult<Lab> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageLabs)?;
        data.validate()?;
        if let Some(ref code) = data.code {
            if self.repository.labs_code_exists(code, Some(id)).await? {
                return Err(AppError::Validation(format!("Lab code {} already exists", code)));
            }
        }

        let before = self.repository.labs_get_by_id(id).await?;
        let after = self.repository.labs_update(id, data).await?;
        let audit = NewAuditLog::snapshot(Some(actor.id), AuditAction::Update, "lab", id, Some(&before), Some(&after), "update lab");
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(after)
    }

    /// Add a user to the roster, or change their roster role
    pub async fn add_member(&self, actor_id: i32, lab_id: i32, user_id: i32, role: LabMemberRole) -> AppResult<LabMember> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageLabs)?;
        self.repository.labs_get_by_id(lab_id).await?;
        let user = self.repository.users_get_by_id(user_id).await?;
        if role != LabMemberRole::Member && !user.role.is_staff() {
            return Err(AppError::Validation(format!(
                "A {} cannot be lab {}",
                user.role, role
            )));
        }

        let member = self.repository.labs_upsert_member(lab_id, user_id, role).await?;
        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Update,
            "lab",
            lab_id,
            None,
            Some(&member),
            format!("add member {} as {}", user_id, role),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(member)
    }

    pub async fn remove_member(&self, actor_id: i32, lab_id: i32, user_id: i32) -> AppResult<()> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageLabs)?;
        self.repository.labs_remove_member(lab_id, user_id).await?;

        let audit = NewAuditLog {
            user_id: Some(actor.id),
            action: AuditAction::Update,
            entity_type: "lab".to_string(),
            entity_id: Some(lab_id),
            old_values: None,
            new_values: None,
            description: format!("remove member {}", user_id),
        };
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(())
    }

    pub async fn list_members(&self, lab_id: i32) -> AppResult<Vec<LabMember>> {
        self.repository.labs_get_by_id(lab_id).await?;
        self.repository.labs_list_members(lab_id).await
    }

    /// User ids of the lab's heads and laborans
    pub async fn list_staff(&self, lab_id: i32) -> AppResult<Vec<i32>> {
        self.repository.labs_get_by_id(lab_id).await?;
        self.repository.labs_staff_ids(lab_id).await
    }
}
