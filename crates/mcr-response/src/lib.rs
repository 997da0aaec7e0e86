//! ---
//! mcr_section: "05-response-delivery"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Result envelope construction and retrying callback delivery."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Result envelope delivery.
//!
//! The orchestrator waits on a one-shot callback channel: exactly one JSON
//! envelope must be PUT to the event's callback address, whatever else
//! happened during the lifecycle call. [`ResponseTransmitter`] retries
//! transport failures up to a configured bound; an HTTP response of any
//! status counts as delivered, because the channel is consumed either way.

#![warn(missing_docs)]

pub mod envelope;
pub mod transmitter;

use thiserror::Error;

/// Shared result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Failures while delivering a result envelope.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The callback address is not a usable URL.
    #[error("invalid callback address: {0}")]
    InvalidAddress(String),
    /// Every delivery attempt failed at the transport level.
    #[error("response delivery failed after {attempts} attempts")]
    Exhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
    /// The envelope could not be serialized.
    #[error("result envelope serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// The HTTP client could not be constructed.
    #[error("http client construction failed: {0}")]
    Client(#[from] reqwest::Error),
}

pub use envelope::{generated_physical_id, ResultEnvelope, Status};
pub use transmitter::{Delivery, ResponseTransmitter};
