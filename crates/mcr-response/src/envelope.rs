//! ---
//! mcr_section: "05-response-delivery"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Result envelope construction and retrying callback delivery."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! The JSON result envelope PUT to the callback address.

use mcr_events::Correlation;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal status of a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The operation completed.
    #[serde(rename = "SUCCESS")]
    Success,
    /// The operation failed; `Reason` carries the message.
    #[serde(rename = "FAILED")]
    Failed,
}

/// The envelope body. Field names follow the orchestrator's callback
/// protocol; correlation fields are echoed verbatim from the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Terminal status.
    #[serde(rename = "Status")]
    pub status: Status,
    /// Human-readable failure message; empty (and omitted) on success.
    #[serde(rename = "Reason", default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Stable identifier of the backing resource; always present.
    #[serde(rename = "PhysicalResourceId")]
    pub physical_id: String,
    /// Stack correlation identifier, echoed.
    #[serde(rename = "StackId")]
    pub stack_id: String,
    /// Request identifier, echoed.
    #[serde(rename = "RequestId")]
    pub request_id: String,
    /// Logical resource identifier, echoed.
    #[serde(rename = "LogicalResourceId")]
    pub logical_id: String,
    /// Output attributes, or null when the operation produced none.
    #[serde(rename = "Data")]
    pub data: Option<Map<String, Value>>,
}

impl ResultEnvelope {
    /// A SUCCESS envelope.
    pub fn success(
        correlation: Correlation,
        physical_id: impl Into<String>,
        data: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            status: Status::Success,
            reason: String::new(),
            physical_id: physical_id.into(),
            stack_id: correlation.stack_id,
            request_id: correlation.request_id,
            logical_id: correlation.logical_id,
            data,
        }
    }

    /// A FAILED envelope carrying `reason`.
    pub fn failed(
        correlation: Correlation,
        physical_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: Status::Failed,
            reason: reason.into(),
            physical_id: physical_id.into(),
            stack_id: correlation.stack_id,
            request_id: correlation.request_id,
            logical_id: correlation.logical_id,
            data: None,
        }
    }
}

/// A fresh random physical id: 16 bytes, hex-encoded. Used for Create
/// events that carry no physical id of their own, so the envelope invariant
/// (an id on every response) holds on every path.
pub fn generated_physical_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
