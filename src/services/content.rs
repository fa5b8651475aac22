//! Static content pages and help desk tickets

use validator::Validate;

use super::events::Emitter;
use crate::{
    error::{AppError, AppResult},
    lending::permissions::{self, Action},
    models::{
        content::{AppContent, CreateTicket, HelpTicket, UpdateTicket, UpsertContent},
        enums::AuditAction,
        NewAuditLog,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ContentService {
    repository: Repository,
    emitter: Emitter,
}

impl ContentService {
    pub fn new(repository: Repository, emitter: Emitter) -> Self {
        Self { repository, emitter }
    }

    pub async fn get_content(&self, key: &str) -> AppResult<AppContent> {
        self.repository.content_get(key).await
    }

    pub async fn upsert_content(&self, actor_id: i32, data: &UpsertContent) -> AppResult<AppContent> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageContent)?;
        data.validate()?;

        let page = self.repository.content_upsert(data, actor.id).await?;
        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Update,
            "app_content",
            page.id,
            None,
            Some(&page),
            format!("edit page {}", page.key),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(page)
    }

    pub async fn create_ticket(&self, user_id: i32, data: &CreateTicket) -> AppResult<HelpTicket> {
        data.validate()?;
        self.repository.users_get_by_id(user_id).await?;
        let ticket = self.repository.tickets_create(user_id, data).await?;
        tracing::info!(ticket_id = ticket.id, user_id, priority = %ticket.priority, "Help ticket opened");
        Ok(ticket)
    }

    /// Staff-only status or assignment change
    pub async fn update_ticket(&self, actor_id: i32, id: i32, data: &UpdateTicket) -> AppResult<HelpTicket> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        if !actor.role.is_staff() {
            return Err(AppError::Forbidden(format!("Role {} may not manage tickets", actor.role)));
        }
        if let Some(assignee) = data.assigned_to_id {
            self.repository.users_get_by_id(assignee).await?;
        }

        let before = self.repository.tickets_get_by_id(id).await?;
        let after = self.repository.tickets_update(id, data).await?;
        let audit = NewAuditLog::snapshot(Some(actor.id), AuditAction::Update, "help_ticket", id, Some(&before), Some(&after), "update ticket");
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(after)
    }

    /// Tickets of one user, or all of them
    pub async fn list_tickets(&self, user_id: Option<i32>) -> AppResult<Vec<HelpTicket>> {
        self.repository.tickets_list(user_id).await
    }
}
