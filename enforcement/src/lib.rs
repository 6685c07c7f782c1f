//! The enforcement gate: every command and every query response of the twin
//! platform passes through here.
//!
//! A decision runs through
//! `Received → NamespaceChecked → EnforcerResolved → Decided → (Pruned) → Emitted`
//! and ends in an [`AuthorizationResult`]. The gate never retries; transient
//! failures are reported as such and left to the caller.

pub mod blocklist;
pub mod command;
pub mod config;
pub mod error;
pub mod gate;
pub mod response;
pub mod result;

pub use blocklist::{BlockedNamespaces, NamespaceBlocklist};
pub use command::{Command, CommandKind, EntityId};
pub use config::{ConfigurationDefinition, EnforcementConfig};
pub use error::{ConfigError, DenialReason, EnforcementError, ErrorResponse, Result, TransientReason};
pub use gate::{EnforcementGate, Stage};
pub use response::QueryResponse;
pub use result::AuthorizationResult;
