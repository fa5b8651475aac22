//! Data models for the lab lending system

pub mod audit;
pub mod category;
pub mod content;
pub mod enums;
pub mod equipment;
pub mod lab;
pub mod loan;
pub mod maintenance;
pub mod notification;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use audit::{AuditLog, NewAuditLog};
pub use enums::{EquipmentCondition, EquipmentStatus, LoanStatus, UserRole, UserStatus};
pub use equipment::{BlockedSlot, Equipment, EquipmentStatusView};
pub use lab::{Lab, LabMember};
pub use loan::{CreateLoan, Loan, TransitionPayload};
pub use maintenance::MaintenanceRecord;
pub use notification::{NewNotification, Notification};
pub use user::User;
