//! Business logic services

pub mod audit;
pub mod categories;
pub mod content;
pub mod equipment;
pub mod events;
pub mod labs;
pub mod loans;
pub mod maintenance;
pub mod notifications;
pub mod stats;
pub mod users;

use std::sync::Arc;

use crate::{config::LendingConfig, repository::Repository};
use events::{Emitter, EventSink, PgEventSink};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub loans: loans::LoansService,
    pub equipment: equipment::EquipmentService,
    pub maintenance: maintenance::MaintenanceService,
    pub users: users::UsersService,
    pub labs: labs::LabsService,
    pub categories: categories::CategoriesService,
    pub notifications: notifications::NotificationsService,
    pub audit: audit::AuditService,
    pub content: content::ContentService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services writing events to the database
    pub fn new(repository: Repository, lending: LendingConfig) -> Self {
        let sink = Arc::new(PgEventSink::new(repository.clone()));
        Self::with_sink(repository, lending, sink)
    }

    /// Create all services with a custom event sink
    pub fn with_sink(repository: Repository, lending: LendingConfig, sink: Arc<dyn EventSink + Send + Sync>) -> Self {
        let emitter = Emitter::new(sink);
        Self {
            loans: loans::LoansService::new(repository.clone(), emitter.clone(), lending),
            equipment: equipment::EquipmentService::new(repository.clone(), emitter.clone()),
            maintenance: maintenance::MaintenanceService::new(repository.clone(), emitter.clone()),
            users: users::UsersService::new(repository.clone(), emitter.clone()),
            labs: labs::LabsService::new(repository.clone(), emitter.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            notifications: notifications::NotificationsService::new(repository.clone()),
            audit: audit::AuditService::new(repository.clone()),
            stats: stats::StatsService::new(repository.clone()),
            content: content::ContentService::new(repository, emitter),
        }
    }
}
