//! Role permission table for lifecycle and administrative actions

use crate::{
    error::{AppError, AppResult},
    models::{enums::UserRole, User},
};

/// Guarded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    RequestLoan,
    ApproveFirstStage,
    ApproveHeadStage,
    Reject,
    /// Cancel a loan owned by someone else
    CancelAny,
    Checkout,
    Checkin,
    MarkOverdue,
    VerifyUser,
    /// Edit other users' profiles and change roles
    ManageUsers,
    ManageEquipment,
    ManageMaintenance,
    ManageLabs,
    ManageContent,
}

use Action::*;
use UserRole::*;

/// Allowed (role, action) pairs; anything absent is denied
const ALLOWED: &[(UserRole, Action)] = &[
    (Admin, RequestLoan),
    (Admin, ApproveFirstStage),
    (Admin, ApproveHeadStage),
    (Admin, Reject),
    (Admin, CancelAny),
    (Admin, Checkout),
    (Admin, Checkin),
    (Admin, MarkOverdue),
    (Admin, VerifyUser),
    (Admin, ManageUsers),
    (Admin, ManageEquipment),
    (Admin, ManageMaintenance),
    (Admin, ManageLabs),
    (Admin, ManageContent),
    (HeadLab, RequestLoan),
    (HeadLab, ApproveFirstStage),
    (HeadLab, ApproveHeadStage),
    (HeadLab, Reject),
    (HeadLab, Checkout),
    (HeadLab, Checkin),
    (HeadLab, MarkOverdue),
    (HeadLab, VerifyUser),
    (HeadLab, ManageEquipment),
    (HeadLab, ManageMaintenance),
    (HeadLab, ManageLabs),
    (Laboran, RequestLoan),
    (Laboran, ApproveFirstStage),
    (Laboran, Reject),
    (Laboran, Checkout),
    (Laboran, Checkin),
    (Laboran, MarkOverdue),
    (Laboran, ManageEquipment),
    (Laboran, ManageMaintenance),
    (Lecturer, RequestLoan),
    (Student, RequestLoan),
];

pub fn is_allowed(role: UserRole, action: Action) -> bool {
    ALLOWED.contains(&(role, action))
}

/// Forbidden unless the actor's role may perform `action`
pub fn require(actor: &User, action: Action) -> AppResult<()> {
    if is_allowed(actor.role, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role {} may not perform {:?}",
            actor.role, action
        )))
    }
}

/// Users may edit their own profile; other profiles and role changes need `ManageUsers`
pub fn require_user_edit(actor: &User, target_id: i32, changes_role: bool) -> AppResult<()> {
    if actor.id == target_id && !changes_role {
        return Ok(());
    }
    require(actor, ManageUsers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::UserStatus;
    use chrono::Utc;

    fn user(id: i32, role: UserRole) -> User {
        let now = Utc::now();
        User {
            id,
            email: format!("user{}@lab.test", id),
            full_name: format!("User {}", id),
            nim_nik: None,
            role,
            status: UserStatus::Verified,
            phone: None,
            created_at: now,
            updated_at: now,
            last_login: None,
            verified_at: Some(now),
            verified_by_id: None,
        }
    }

    #[test]
    fn test_approval_roles() {
        for role in [Admin, HeadLab, Laboran] {
            assert!(is_allowed(role, ApproveFirstStage), "{role} should approve");
            assert!(is_allowed(role, Reject));
        }
        assert!(!is_allowed(Lecturer, ApproveFirstStage));
        assert!(!is_allowed(Student, Reject));
    }

    #[test]
    fn test_head_stage_is_head_or_admin() {
        assert!(is_allowed(HeadLab, ApproveHeadStage));
        assert!(is_allowed(Admin, ApproveHeadStage));
        assert!(!is_allowed(Laboran, ApproveHeadStage));
    }

    #[test]
    fn test_everyone_may_request() {
        for role in UserRole::ALL {
            assert!(is_allowed(*role, RequestLoan));
        }
        assert!(!is_allowed(Student, CancelAny));
        assert!(!is_allowed(HeadLab, CancelAny));
    }

    #[test]
    fn test_user_edits() {
        let student = user(7, Student);
        assert!(require_user_edit(&student, 7, false).is_ok());
        assert!(matches!(require_user_edit(&student, 7, true), Err(AppError::Forbidden(_))));
        assert!(matches!(require_user_edit(&student, 8, false), Err(AppError::Forbidden(_))));

        let head = user(2, HeadLab);
        assert!(require_user_edit(&head, 7, true).is_err());
        assert!(require_user_edit(&user(1, Admin), 7, true).is_ok());
    }
}
