//! ---
//! mcr_section: "05-response-delivery"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Result envelope construction and retrying callback delivery."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};
use url::Url;

use crate::envelope::ResultEnvelope;
use crate::{DeliveryError, Result};

/// Proof of delivery: the callback endpoint produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// HTTP status the endpoint answered with.
    pub status: u16,
    /// Attempt number that went through (1-based).
    pub attempts: u32,
}

/// Retrying HTTPS PUT of a [`ResultEnvelope`] to a callback address.
///
/// Transport failures are retried immediately up to `max_attempts`; there is
/// no backoff because the callback channel expires on a timescale of
/// seconds. Any HTTP response, success or not, consumes the one-shot channel
/// and therefore counts as delivered. Exhaustion is fatal: the orchestrator
/// will wait out its own timeout for this operation.
pub struct ResponseTransmitter {
    client: reqwest::Client,
    max_attempts: u32,
}

impl ResponseTransmitter {
    /// Build a transmitter with the given retry bound and per-request
    /// timeout.
    pub fn new(max_attempts: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
        })
    }

    /// PUT `envelope` to `callback_address`.
    ///
    /// The serialized body is logged on every attempt so a failed stack
    /// operation can be diagnosed from this side even when the envelope
    /// never arrived.
    pub async fn transmit(
        &self,
        callback_address: &str,
        envelope: &ResultEnvelope,
    ) -> Result<Delivery> {
        let target = Url::parse(callback_address)
            .map_err(|err| DeliveryError::InvalidAddress(format!("{callback_address}: {err}")))?;
        let body = serde_json::to_string(envelope)?;

        for attempt in 1..=self.max_attempts {
            info!(%target, attempt, max = self.max_attempts, %body, "delivering result envelope");
            // The protocol expects a bare body: an empty content type and an
            // exact content length, which reqwest derives from the body.
            let outcome = self
                .client
                .put(target.clone())
                .header(CONTENT_TYPE, "")
                .body(body.clone())
                .send()
                .await;
            match outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    info!(%target, attempt, status, "result envelope delivered");
                    return Ok(Delivery { status, attempts: attempt });
                }
                Err(err) => {
                    warn!(%target, attempt, error = %err, "delivery attempt failed");
                }
            }
        }
        Err(DeliveryError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
