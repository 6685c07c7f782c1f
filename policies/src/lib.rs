//! Policy document model.
//!
//! Immutable value types for revisioned policies: identifiers, subjects,
//! resources, entries and the policy itself, plus the JSON wire format. All
//! structural validation happens while building these values, so anything
//! holding a [`Policy`] holds a well-formed one.
//!
//! # Example
//!
//! ```rust
//! use policies::{Policy, PolicyEntry, PolicyId};
//!
//! let entry = PolicyEntry::builder("owner")
//!     .subject("google:sid")
//!     .grant("thing:/", ["READ", "WRITE"])
//!     .build()
//!     .unwrap();
//! let policy = Policy::builder(PolicyId::parse("org.example:lamp").unwrap())
//!     .entry(entry)
//!     .build();
//! assert_eq!(policy.revision(), 1);
//! ```

pub mod entry;
pub mod error;
pub mod pointer;
pub mod policy;
pub mod resource;
pub mod subject;
mod wire;

pub use entry::{EntryBuilder, PolicyEntry};
pub use error::{PolicyError, Result};
pub use pointer::JsonPointer;
pub use policy::{Lifecycle, Policy, PolicyBuilder, PolicyId};
pub use resource::{permissions, EffectedPermissions, ResourceKey};
pub use subject::{Subject, SubjectId};
