//! ---
//! mcr_section: "02-event-protocol"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Invocation event schema and conformance validation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Inbound protocol types for the custom-resource lifecycle engine.
//!
//! An [`InvocationEvent`] is the single message the orchestrator sends per
//! stack operation. Every field is optional at the wire level; conformance
//! (presence of the correlation and callback fields) is checked explicitly
//! via [`InvocationEvent::conformant`] so that a malformed event can be
//! dropped without ever trusting its callback address.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Shared result type for event handling.
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors raised while interpreting an invocation event.
#[derive(Debug, Error)]
pub enum EventError {
    /// The action string is not one of Create/Update/Delete.
    #[error("unsupported lifecycle action: {0}")]
    UnsupportedAction(String),
    /// Wrapper for JSON deserialization problems.
    #[error("malformed invocation event: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle operation requested by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleAction {
    /// First-time provisioning of the backing resource.
    Create,
    /// Convergence of the backing resource to new desired properties.
    Update,
    /// Teardown of the backing resource.
    Delete,
}

impl LifecycleAction {
    /// Parse an action string case-insensitively.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(EventError::UnsupportedAction(raw.to_owned())),
        }
    }

    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Correlation fields echoed verbatim into the result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    /// Identifier of the stack operation that spawned this invocation.
    pub stack_id: String,
    /// Logical name of the custom resource within the stack.
    pub logical_id: String,
    /// Opaque per-invocation request identifier.
    pub request_id: String,
}

/// One orchestrator invocation, as received on the wire.
///
/// Field names follow the orchestrator's callback protocol; all fields are
/// optional so that a non-conformant event still deserializes and can be
/// rejected deliberately rather than through a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationEvent {
    /// Raw lifecycle action string (`Create`/`Update`/`Delete`, any case).
    #[serde(rename = "RequestType", skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    /// Resource kind, optionally prefixed with `Custom::`.
    #[serde(rename = "ResourceType", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Desired property bag for the resource kind.
    #[serde(rename = "ResourceProperties", skip_serializing_if = "Option::is_none")]
    pub desired_properties: Option<Map<String, Value>>,
    /// Prior property bag; present on Update and Delete.
    #[serde(
        rename = "OldResourceProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub prior_properties: Option<Map<String, Value>>,
    /// Callback address the result envelope must be PUT to.
    #[serde(rename = "ResponseURL", skip_serializing_if = "Option::is_none")]
    pub callback_address: Option<String>,
    /// Stack correlation identifier.
    #[serde(rename = "StackId", skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    /// Logical resource identifier within the stack.
    #[serde(rename = "LogicalResourceId", skip_serializing_if = "Option::is_none")]
    pub logical_id: Option<String>,
    /// Opaque request identifier.
    #[serde(rename = "RequestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Stable identifier of the backing resource; present on Update/Delete.
    #[serde(rename = "PhysicalResourceId", skip_serializing_if = "Option::is_none")]
    pub physical_id: Option<String>,
}

impl InvocationEvent {
    /// Deserialize an event from raw JSON text.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Whether the event carries every mandatory protocol field.
    ///
    /// Returns `false`, not an error, for a non-conformant event: absence of
    /// these fields means the invocation did not originate from the
    /// orchestrator and there is no trustworthy callback address to report
    /// to.
    pub fn is_conformant(&self) -> bool {
        self.conformant().is_some()
    }

    /// Borrowed view of a conformant event, or `None` when any mandatory
    /// field is missing.
    pub fn conformant(&self) -> Option<ConformantEvent<'_>> {
        Some(ConformantEvent {
            request_type: self.request_type.as_deref()?,
            desired_properties: self.desired_properties.as_ref()?,
            prior_properties: self.prior_properties.as_ref(),
            callback_address: self.callback_address.as_deref()?,
            stack_id: self.stack_id.as_deref()?,
            logical_id: self.logical_id.as_deref()?,
            request_id: self.request_id.as_deref()?,
            physical_id: self.physical_id.as_deref(),
            resource_type: self.resource_type.as_deref(),
        })
    }

    /// Resource kind with any `Custom::` prefix stripped.
    pub fn kind(&self) -> Option<&str> {
        self.resource_type
            .as_deref()
            .map(|kind| kind.strip_prefix("Custom::").unwrap_or(kind))
    }
}

/// Borrowed view of an event that passed conformance validation.
#[derive(Debug, Clone, Copy)]
pub struct ConformantEvent<'a> {
    /// Raw lifecycle action string.
    pub request_type: &'a str,
    /// Desired property bag.
    pub desired_properties: &'a Map<String, Value>,
    /// Prior property bag, when present.
    pub prior_properties: Option<&'a Map<String, Value>>,
    /// Callback address for the result envelope.
    pub callback_address: &'a str,
    /// Stack correlation identifier.
    pub stack_id: &'a str,
    /// Logical resource identifier.
    pub logical_id: &'a str,
    /// Opaque request identifier.
    pub request_id: &'a str,
    /// Physical identifier, when present.
    pub physical_id: Option<&'a str>,
    /// Resource kind as sent, when present.
    pub resource_type: Option<&'a str>,
}

impl ConformantEvent<'_> {
    /// Parse the lifecycle action.
    pub fn action(&self) -> Result<LifecycleAction> {
        LifecycleAction::parse(self.request_type)
    }

    /// Correlation fields for the result envelope.
    pub fn correlation(&self) -> Correlation {
        Correlation {
            stack_id: self.stack_id.to_owned(),
            logical_id: self.logical_id.to_owned(),
            request_id: self.request_id.to_owned(),
        }
    }
}
