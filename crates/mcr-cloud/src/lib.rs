//! ---
//! mcr_section: "03-capability-interfaces"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "External-system capability traits and shared data types."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Capability interfaces for the external system.
//!
//! Resource handlers never construct their own clients from ambient
//! configuration; the dispatcher (or a test harness) hands each handler a
//! capability handle already bound to region and credentials. The traits in
//! this crate are that boundary: "describe/put/delete configuration X",
//! nothing more. [`memory::MemoryCloud`] implements every trait in-process
//! for tests and the local harness.

#![warn(missing_docs)]

pub mod api;
pub mod memory;
pub mod types;

use thiserror::Error;

/// Shared result type for capability calls.
pub type Result<T> = std::result::Result<T, CloudError>;

/// Failure classes the external system can report.
///
/// Messages are propagated verbatim into FAILED envelopes, so they carry the
/// external system's own wording rather than a wrapper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudError {
    /// The addressed object does not exist.
    #[error("{0}")]
    NotFound(String),
    /// An object with the requested identity already exists.
    #[error("{0}")]
    AlreadyExists(String),
    /// The external system rejected the operation.
    #[error("{0}")]
    Rejected(String),
}

impl CloudError {
    /// Whether this error means the addressed object is absent.
    pub fn is_absent(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// Whether this error is an identity collision.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CloudError::AlreadyExists(_))
    }
}

pub use api::{
    BucketNotificationApi, CapabilitySet, FleetApi, InventoryApi, LogGroupApi, NetworkApi,
    StackApi, TableApi, TopicApi,
};
pub use memory::{MemoryCloud, PublishedMessage};
pub use types::{
    FilterRule, FleetRequest, NetworkFacts, NotificationConfig, NotificationEntry, StackOutputs,
    SubscriptionPage, TableDescription, TopicSubscription, PENDING_CONFIRMATION,
};
