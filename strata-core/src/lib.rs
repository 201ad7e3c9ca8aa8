//! Core domain types for Strata
//!
//! Identifiers, terminal statuses and the error taxonomy shared by the
//! fragment and export managers. This crate has minimal dependencies and
//! defines the vocabulary the rest of the workspace speaks.

pub mod error;
pub mod id;
pub mod status;

// Re-export commonly used types at the crate root
pub use error::{ManagerError, ManagerResult, ParseError, ReportError};
pub use id::TaskId;
pub use status::{CancelReason, FailureCause, TaskOutcome, TerminalStatus};
