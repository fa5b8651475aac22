//! Shared domain enums, stored as text slugs

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};

/// Declares a slug enum with string conversions and sqlx text mapping.
macro_rules! slug_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $slug:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $slug)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $slug),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($slug => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {} value: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

slug_enum! {
    /// User role; drives the lifecycle permission table
    UserRole {
        Admin => "admin",
        HeadLab => "head_lab",
        Laboran => "laboran",
        Lecturer => "lecturer",
        Student => "student",
    }
}

impl UserRole {
    /// Lab staff roles with first-line approval authority
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::HeadLab | UserRole::Laboran)
    }
}

slug_enum! {
    /// Account verification status
    UserStatus {
        Pending => "pending",
        Verified => "verified",
        Suspended => "suspended",
        Inactive => "inactive",
    }
}

slug_enum! {
    /// Role of a user inside one lab roster
    LabMemberRole {
        Head => "head",
        Laboran => "laboran",
        Member => "member",
    }
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

slug_enum! {
    EquipmentStatus {
        Available => "available",
        InUse => "in_use",
        Maintenance => "maintenance",
        Damaged => "damaged",
        Retired => "retired",
    }
}

impl EquipmentStatus {
    /// Statuses that take the equipment out of the lending pool
    pub fn blocks_lending(&self) -> bool {
        matches!(
            self,
            EquipmentStatus::Maintenance | EquipmentStatus::Damaged | EquipmentStatus::Retired
        )
    }
}

slug_enum! {
    /// Physical condition, from best to worst
    EquipmentCondition {
        Excellent => "excellent",
        Good => "good",
        Fair => "fair",
        Poor => "poor",
        Damaged => "damaged",
    }
}

impl EquipmentCondition {
    /// Lower is better
    pub fn rank(&self) -> u8 {
        match self {
            EquipmentCondition::Excellent => 0,
            EquipmentCondition::Good => 1,
            EquipmentCondition::Fair => 2,
            EquipmentCondition::Poor => 3,
            EquipmentCondition::Damaged => 4,
        }
    }

    pub fn is_worse_than(&self, other: EquipmentCondition) -> bool {
        self.rank() > other.rank()
    }
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

slug_enum! {
    /// Loan request lifecycle state
    LoanStatus {
        Pending => "pending",
        ApprovedByAssistant => "approved_by_assistant",
        ApprovedByHead => "approved_by_head",
        CheckedOut => "checked_out",
        Overdue => "overdue",
        CheckedIn => "checked_in",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl LoanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::CheckedIn | LoanStatus::Rejected | LoanStatus::Cancelled)
    }

    /// Statuses whose window holds capacity for availability checks
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            LoanStatus::Pending
                | LoanStatus::ApprovedByAssistant
                | LoanStatus::ApprovedByHead
                | LoanStatus::CheckedOut
                | LoanStatus::Overdue
        )
    }

    pub fn blocking_slugs() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.is_blocking())
            .map(|s| s.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

slug_enum! {
    MaintenanceType {
        Preventive => "preventive",
        Corrective => "corrective",
        Emergency => "emergency",
    }
}

slug_enum! {
    MaintenanceStatus {
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

// ---------------------------------------------------------------------------
// Notifications and audit
// ---------------------------------------------------------------------------

slug_enum! {
    NotificationType {
        UserRegistration => "user_registration",
        UserVerification => "user_verification",
        BorrowingRequest => "borrowing_request",
        BorrowingApproved => "borrowing_approved",
        BorrowingRejected => "borrowing_rejected",
        EquipmentOverdue => "equipment_overdue",
        EquipmentReturned => "equipment_returned",
        EquipmentDamaged => "equipment_damaged",
        MaintenanceScheduled => "maintenance_scheduled",
    }
}

slug_enum! {
    NotificationStatus {
        Unread => "unread",
        Read => "read",
    }
}

slug_enum! {
    AuditAction {
        Create => "create",
        Update => "update",
        Delete => "delete",
        Login => "login",
        Logout => "logout",
        Approve => "approve",
        Reject => "reject",
        Checkout => "checkout",
        Checkin => "checkin",
    }
}

// ---------------------------------------------------------------------------
// Help tickets
// ---------------------------------------------------------------------------

slug_enum! {
    TicketStatus {
        Open => "open",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

slug_enum! {
    TicketPriority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_round_trip() {
        for status in LoanStatus::ALL {
            assert_eq!(status.as_str().parse::<LoanStatus>().unwrap(), *status);
        }
        assert_eq!("IN_USE".parse::<EquipmentStatus>().unwrap(), EquipmentStatus::InUse);
        assert!("borrowed".parse::<EquipmentStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_slugs() {
        let json = serde_json::to_string(&LoanStatus::ApprovedByHead).unwrap();
        assert_eq!(json, "\"approved_by_head\"");
        let role: UserRole = serde_json::from_str("\"head_lab\"").unwrap();
        assert_eq!(role, UserRole::HeadLab);
    }

    #[test]
    fn test_condition_ordering() {
        assert!(EquipmentCondition::Poor.is_worse_than(EquipmentCondition::Good));
        assert!(!EquipmentCondition::Good.is_worse_than(EquipmentCondition::Good));
        assert!(!EquipmentCondition::Excellent.is_worse_than(EquipmentCondition::Fair));
    }

    #[test]
    fn test_blocking_statuses() {
        let slugs = LoanStatus::blocking_slugs();
        assert!(slugs.contains(&"pending"));
        assert!(slugs.contains(&"overdue"));
        assert!(!slugs.contains(&"checked_in"));
        assert!(!slugs.contains(&"cancelled"));
        assert!(LoanStatus::Rejected.is_terminal());
        assert!(!LoanStatus::Overdue.is_terminal());
    }
}
