//! Lending core: pure decision logic over loans and equipment rows.
//!
//! Nothing here touches the database. Services lock the rows, call into
//! these modules, then persist what comes back.

pub mod availability;
pub mod fees;
pub mod ledger;
pub mod lifecycle;
pub mod permissions;

pub use availability::{Availability, TimeWindow};
pub use ledger::StatusChange;
pub use lifecycle::{LoanEvent, Notice, Recipient, TransitionOutcome};
pub use permissions::Action;
