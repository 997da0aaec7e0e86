//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
use async_trait::async_trait;
use mcr_cloud::CloudError;
use serde_json::{Map, Value};
use thiserror::Error;

/// Shared result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Failure classes a resource handler can produce.
///
/// `Validation` means the handler was constructed from an incomplete or
/// malformed property bag and no external call was made. `Dependency` means
/// the external system rejected the operation; the message is reported
/// verbatim as the FAILED reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// Incomplete or malformed property bag.
    #[error("{0}")]
    Validation(String),
    /// The external system rejected the operation.
    #[error("{0}")]
    Dependency(String),
}

impl HandlerError {
    /// Standard message for an absent required property.
    pub fn missing_parameter(name: &str) -> Self {
        Self::Validation(format!("Missing Parameter {name}"))
    }

    /// Whether the failure occurred before any external call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<CloudError> for HandlerError {
    fn from(err: CloudError) -> Self {
        Self::Dependency(err.to_string())
    }
}

/// What a successful lifecycle operation reports back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutcome {
    /// Stable identifier of the backing resource. `None` lets the dispatcher
    /// fall back to the event's physical id (or generate one on Create).
    pub physical_id: Option<String>,
    /// Output attributes the orchestrator exposes to the rest of the stack.
    pub attributes: Option<Map<String, Value>>,
}

impl HandlerOutcome {
    /// An outcome carrying neither identifier nor attributes.
    pub fn none() -> Self {
        Self::default()
    }

    /// An outcome carrying only a physical identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            physical_id: Some(id.into()),
            attributes: None,
        }
    }

    /// An outcome carrying only output attributes.
    pub fn with_attributes(attributes: Map<String, Value>) -> Self {
        Self {
            physical_id: None,
            attributes: Some(attributes),
        }
    }

    /// An outcome carrying both an identifier and attributes.
    pub fn id_and_attributes(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            physical_id: Some(id.into()),
            attributes: Some(attributes),
        }
    }
}

/// The uniform lifecycle contract every resource kind implements.
///
/// All three operations must be idempotent under wholesale retry: the
/// orchestrator times out and re-invokes rather than cancelling mid-flight,
/// and partial work from a failed attempt is reconciled by the next pass
/// rather than rolled back.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// First-time provisioning of the backing resource.
    async fn create(&self) -> Result<HandlerOutcome>;

    /// Converge the backing resource from the prior to the desired
    /// properties. Kinds without a cheaper in-place path remove the prior
    /// state before recreating it from the desired properties.
    async fn modify(&self) -> Result<HandlerOutcome>;

    /// Best-effort teardown. Must succeed, not fail, when the backing
    /// resource is already absent.
    async fn remove(&self) -> Result<()>;
}
