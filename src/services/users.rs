//! User management service

use chrono::Utc;
use validator::Validate;

use super::events::Emitter;
use crate::{
    error::{AppError, AppResult},
    lending::permissions::{self, Action},
    models::{
        enums::{AuditAction, NotificationType, UserRole, UserStatus},
        user::{CreateUser, UpdateUser, UserQuery},
        NewAuditLog, NewNotification, User,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    emitter: Emitter,
}

impl UsersService {
    pub fn new(repository: Repository, emitter: Emitter) -> Self {
        Self { repository, emitter }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users_get_by_id(id).await
    }

    pub async fn list(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users_list(query).await
    }

    /// Register a user; the account waits for verification
    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        data.validate()?;
        if self.repository.users_email_exists(&data.email, None).await? {
            return Err(AppError::Validation(format!("Email {} is already registered", data.email)));
        }

        let user = self.repository.users_create(data).await?;
        tracing::info!(user_id = user.id, role = %user.role, "User registered");

        let audit = NewAuditLog::snapshot(None, AuditAction::Create, "user", user.id, None, Some(&user), "register user");
        let verifiers = self
            .repository
            .users_ids_with_roles(&[UserRole::Admin, UserRole::HeadLab])
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load account verifiers");
                Vec::new()
            });
        let notifications = verifiers
            .into_iter()
            .map(|user_id| NewNotification {
                user_id,
                kind: NotificationType::UserRegistration,
                title: "New account awaiting verification".to_string(),
                message: format!("{} ({}) registered as {}", user.full_name, user.email, user.role),
                related_id: Some(user.id),
                related_type: Some("user".to_string()),
            })
            .collect();
        self.emitter.emit(Some(audit), notifications).await;
        Ok(user)
    }

    /// Update a profile. Changing a role, or anyone else's profile, needs `ManageUsers`.
    pub async fn update(&self, actor_id: i32, id: i32, data: &UpdateUser) -> AppResult<User> {
        data.validate()?;
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require_user_edit(&actor, id, data.role.is_some())?;
        let before = self.repository.users_get_by_id(id).await?;
        if let Some(ref email) = data.email {
            if self.repository.users_email_exists(email, Some(id)).await? {
                return Err(AppError::Validation(format!("Email {} is already registered", email)));
            }
        }

        let after = self.repository.users_update(id, data).await?;
        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Update,
            "user",
            id,
            Some(&before),
            Some(&after),
            "update profile",
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(after)
    }

    /// Verify a pending or suspended account
    pub async fn verify(&self, user_id: i32, verifier_id: i32) -> AppResult<User> {
        let verifier = self.repository.users_get_by_id(verifier_id).await?;
        permissions::require(&verifier, Action::VerifyUser)?;
        let before = self.repository.users_get_by_id(user_id).await?;
        if before.is_verified() {
            return Ok(before);
        }

        let user = self.repository.users_mark_verified(user_id, verifier.id, Utc::now()).await?;
        tracing::info!(user_id, verifier_id, "User verified");

        let audit = NewAuditLog::snapshot(
            Some(verifier.id),
            AuditAction::Update,
            "user",
            user_id,
            Some(&before),
            Some(&user),
            format!("status: {} -> {}", before.status, user.status),
        );
        let notification = NewNotification {
            user_id,
            kind: NotificationType::UserVerification,
            title: "Account verified".to_string(),
            message: "Your account has been verified. You can now request equipment loans.".to_string(),
            related_id: Some(user_id),
            related_type: Some("user".to_string()),
        };
        self.emitter.emit(Some(audit), vec![notification]).await;
        Ok(user)
    }

    /// Suspend an account; open loans are left untouched
    pub async fn suspend(&self, user_id: i32, actor_id: i32) -> AppResult<User> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::VerifyUser)?;
        if actor.id == user_id {
            return Err(AppError::Forbidden("Users cannot suspend themselves".to_string()));
        }
        let before = self.repository.users_get_by_id(user_id).await?;
        let user = self.repository.users_set_status(user_id, UserStatus::Suspended).await?;
        tracing::info!(user_id, actor_id, "User suspended");

        let audit = NewAuditLog::snapshot(
            Some(actor.id),
            AuditAction::Update,
            "user",
            user_id,
            Some(&before),
            Some(&user),
            format!("status: {} -> {}", before.status, user.status),
        );
        self.emitter.emit(Some(audit), Vec::new()).await;
        Ok(user)
    }
}
