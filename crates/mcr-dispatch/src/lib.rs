//! ---
//! mcr_section: "06-lifecycle-dispatch"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Lifecycle dispatch from inbound event to delivered result envelope."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! The lifecycle dispatcher.
//!
//! One invocation flows `Validating → Constructing → Executing → Reporting`.
//! A non-conformant event aborts before any side effect and nothing is
//! delivered (there is no trustworthy callback address). Every conformant
//! event produces exactly one result envelope: failures in construction or
//! execution are converted to FAILED envelopes and still reported, so the
//! orchestrator never waits out its timeout on an error this side could
//! describe.

#![warn(missing_docs)]

use std::sync::Arc;

use mcr_cloud::CapabilitySet;
use mcr_events::{ConformantEvent, InvocationEvent, LifecycleAction};
use mcr_resources::{BuildContext, HandlerOutcome, KindRegistry};
use mcr_response::{generated_physical_id, DeliveryError, ResponseTransmitter, ResultEnvelope};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

/// Shared result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failures the dispatcher itself cannot convert into a FAILED envelope.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The result envelope could not be delivered.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// What became of one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event was missing mandatory protocol fields; nothing was
    /// executed and nothing was delivered.
    NonConformant,
    /// A result envelope was delivered.
    Delivered {
        /// HTTP status the callback endpoint answered with.
        status: u16,
        /// Delivery attempts made.
        attempts: u32,
    },
}

/// Ties the validator, kind registry, capability set and transmitter into
/// the per-event state machine.
pub struct Dispatcher {
    registry: KindRegistry,
    capabilities: Arc<dyn CapabilitySet>,
    transmitter: ResponseTransmitter,
    default_region: String,
}

impl Dispatcher {
    /// Assemble a dispatcher.
    pub fn new(
        registry: KindRegistry,
        capabilities: Arc<dyn CapabilitySet>,
        transmitter: ResponseTransmitter,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            capabilities,
            transmitter,
            default_region: default_region.into(),
        }
    }

    /// Run one event through the state machine.
    pub async fn dispatch(&self, event: &InvocationEvent) -> Result<DispatchOutcome> {
        let Some(view) = event.conformant() else {
            warn!("dropping non-conformant invocation event");
            return Ok(DispatchOutcome::NonConformant);
        };

        let envelope = match self.execute(&view).await {
            Ok(outcome) => ResultEnvelope::success(
                view.correlation(),
                resolve_physical_id(&view, outcome.physical_id),
                outcome.attributes,
            ),
            Err(reason) => {
                warn!(%reason, logical_id = view.logical_id, "lifecycle operation failed");
                ResultEnvelope::failed(
                    view.correlation(),
                    resolve_physical_id(&view, None),
                    reason,
                )
            }
        };

        let delivery = self
            .transmitter
            .transmit(view.callback_address, &envelope)
            .await?;
        Ok(DispatchOutcome::Delivered {
            status: delivery.status,
            attempts: delivery.attempts,
        })
    }

    /// `Constructing → Executing` on a validated event. Any failure becomes
    /// the FAILED reason.
    async fn execute(&self, view: &ConformantEvent<'_>) -> std::result::Result<Execution, String> {
        let action = view.action().map_err(|err| err.to_string())?;
        let kind = view
            .resource_type
            .map(|kind| kind.strip_prefix("Custom::").unwrap_or(kind))
            .ok_or_else(|| "Missing resource type".to_owned())?;

        let ctx = BuildContext {
            event: *view,
            capabilities: self.capabilities.as_ref(),
            default_region: &self.default_region,
        };
        let handler = self
            .registry
            .construct(kind, &ctx)
            .map_err(|err| err.to_string())?;

        info!(
            action = action.as_str(),
            kind,
            logical_id = view.logical_id,
            stack_id = view.stack_id,
            "executing lifecycle operation"
        );
        let outcome = match action {
            LifecycleAction::Create => handler.create().await,
            LifecycleAction::Update => handler.modify().await,
            LifecycleAction::Delete => handler.remove().await.map(|()| HandlerOutcome::none()),
        }
        .map_err(|err| err.to_string())?;
        Ok(Execution {
            physical_id: outcome.physical_id,
            attributes: outcome.attributes,
        })
    }
}

struct Execution {
    physical_id: Option<String>,
    attributes: Option<Map<String, Value>>,
}

/// The envelope must carry a physical id on every path: the handler's
/// outcome wins, then the event's own id, and a Create that has neither
/// gets a generated one.
fn resolve_physical_id(view: &ConformantEvent<'_>, outcome_id: Option<String>) -> String {
    outcome_id
        .or_else(|| view.physical_id.map(str::to_owned))
        .unwrap_or_else(generated_physical_id)
}
