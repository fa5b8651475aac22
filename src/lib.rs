//! Lab equipment lending core
//!
//! Tracks lab equipment, the two-stage approval lifecycle of loan requests,
//! quantity and status bookkeeping, maintenance, notifications and an
//! append-only audit trail, on top of PostgreSQL.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod lending;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Shared state handed to whatever front end drives the services
#[derive(Clone)]
pub struct LendingState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl LendingState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, config.lending.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
