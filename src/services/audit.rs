//! Read access to the audit trail

use crate::{error::AppResult, models::AuditLog, repository::Repository};

#[derive(Clone)]
pub struct AuditService {
    repository: Repository,
}

impl AuditService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// History of one entity, oldest first
    pub async fn list_for_entity(&self, entity_type: &str, entity_id: i32) -> AppResult<Vec<AuditLog>> {
        self.repository.audit_list_for_entity(entity_type, entity_id).await
    }
}
