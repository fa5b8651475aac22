//! Audit and notification sink.
//!
//! Lifecycle operations commit first and emit afterwards. A failing sink
//! is logged and swallowed so it never undoes a committed state change.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    error::AppResult,
    models::{NewAuditLog, NewNotification},
    repository::Repository,
};

/// Fire-and-forget destination for audit rows and notifications
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventSink {
    async fn append_audit(&self, entry: NewAuditLog) -> AppResult<()>;

    async fn notify(&self, notification: NewNotification) -> AppResult<()>;
}

/// Sink writing to the `audit_logs` and `notifications` tables
#[derive(Clone)]
pub struct PgEventSink {
    repository: Repository,
}

impl PgEventSink {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl EventSink for PgEventSink {
    async fn append_audit(&self, entry: NewAuditLog) -> AppResult<()> {
        self.repository.audit_append(&entry).await?;
        Ok(())
    }

    async fn notify(&self, notification: NewNotification) -> AppResult<()> {
        self.repository.notifications_insert(&notification).await?;
        Ok(())
    }
}

/// Wraps a sink and turns its failures into warnings
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn EventSink + Send + Sync>,
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink + Send + Sync>) -> Self {
        Self { sink }
    }

    /// Write the audit row, then each notification; returns how many writes failed
    pub async fn emit(&self, audit: Option<NewAuditLog>, notifications: Vec<NewNotification>) -> usize {
        let mut failures = 0;

        if let Some(entry) = audit {
            let entity = format!("{}#{}", entry.entity_type, entry.entity_id.unwrap_or_default());
            if let Err(e) = self.sink.append_audit(entry).await {
                failures += 1;
                tracing::warn!(entity = %entity, error = %e, "Failed to append audit log");
            }
        }

        for notification in notifications {
            let user_id = notification.user_id;
            let kind = notification.kind;
            if let Err(e) = self.sink.notify(notification).await {
                failures += 1;
                tracing::warn!(user_id, kind = %kind, error = %e, "Failed to deliver notification");
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::enums::{AuditAction, NotificationType};

    fn audit() -> NewAuditLog {
        NewAuditLog {
            user_id: Some(1),
            action: AuditAction::Approve,
            entity_type: "loan".to_string(),
            entity_id: Some(9),
            old_values: None,
            new_values: None,
            description: "approve: pending -> approved_by_assistant".to_string(),
        }
    }

    fn notification(user_id: i32) -> NewNotification {
        NewNotification {
            user_id,
            kind: NotificationType::BorrowingApproved,
            title: "Loan approved".to_string(),
            message: "Loan #9 was approved".to_string(),
            related_id: Some(9),
            related_type: Some("loan".to_string()),
        }
    }

    #[tokio::test]
    async fn test_emit_writes_everything() {
        let mut sink = MockEventSink::new();
        sink.expect_append_audit().times(1).returning(|_| Ok(()));
        sink.expect_notify().times(2).returning(|_| Ok(()));

        let emitter = Emitter::new(Arc::new(sink));
        let failures = emitter.emit(Some(audit()), vec![notification(1), notification(2)]).await;
        assert_eq!(failures, 0);
    }

    #[tokio::test]
    async fn test_sink_failures_are_swallowed() {
        let mut sink = MockEventSink::new();
        sink.expect_append_audit()
            .times(1)
            .returning(|_| Err(AppError::Internal("audit table locked".to_string())));
        sink.expect_notify()
            .withf(|n| n.user_id == 1)
            .times(1)
            .returning(|_| Err(AppError::Internal("smtp down".to_string())));
        sink.expect_notify()
            .withf(|n| n.user_id == 2)
            .times(1)
            .returning(|_| Ok(()));

        let emitter = Emitter::new(Arc::new(sink));
        let failures = emitter.emit(Some(audit()), vec![notification(1), notification(2)]).await;
        assert_eq!(failures, 2);
    }

    #[test]
    fn test_emit_nothing() {
        let mut sink = MockEventSink::new();
        sink.expect_append_audit().times(0);
        sink.expect_notify().times(0);

        let emitter = Emitter::new(Arc::new(sink));
        let failures = tokio_test::block_on(emitter.emit(None, Vec::new()));
        assert_eq!(failures, 0);
    }
}
