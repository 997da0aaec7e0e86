//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Compute-fleet request with capacity-aware replacement.
//!
//! Fleet requests cannot be updated in place: Modify issues a replacement
//! request and only then cancels the prior one, so there is never a moment
//! with a cancelled request and no capacity. Unless the caller overrides it,
//! the replacement's target capacity is ratcheted to
//! `max(desired, existing)` to avoid shrinking live capacity mid-update.

use std::sync::Arc;

use async_trait::async_trait;
use mcr_cloud::FleetApi;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::handler::{HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::registry::BuildContext;

/// `compute-fleet-request`: replace-and-cancel fleet reconciliation.
pub struct ComputeFleetRequest {
    fleets: Arc<dyn FleetApi>,
    spec: Value,
    override_capacity: bool,
    prior_request_id: Option<String>,
}

/// Whether `id` has the shape of a provider-assigned fleet request id:
/// `cfr-` followed by 36 characters of `[a-z0-9-]`. Placeholder ids left
/// behind by failed creates do not, and must never reach the provider.
pub fn valid_request_id(id: &str) -> bool {
    match id.strip_prefix("cfr-") {
        Some(rest) => {
            rest.len() == 36
                && rest
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        }
        None => false,
    }
}

/// Renormalise a fleet spec whose scalars the orchestrator's property
/// pipeline stringified. Booleans and integer literals are parsed back;
/// `WeightedCapacity` becomes a float, `TargetCapacity` is rounded up to a
/// whole count, and `Price` values stay strings by provider convention.
pub fn normalize_spec(spec: &Value) -> Value {
    normalize_value(spec, None)
}

fn normalize_value(value: &Value, key: Option<&str>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_value(v, Some(k))))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize_value(item, key))
                .collect(),
        ),
        Value::String(raw) => normalize_scalar(raw, key),
        Value::Number(n) if key == Some("TargetCapacity") => n
            .as_f64()
            .map(|f| Value::from(f.ceil() as i64))
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn normalize_scalar(raw: &str, key: Option<&str>) -> Value {
    if key == Some("Price") || raw.is_empty() {
        return Value::String(raw.to_owned());
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if key == Some("WeightedCapacity") {
                if let Some(number) = raw
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    return Value::Number(number);
                }
            }
            if key == Some("TargetCapacity") {
                if let Ok(f) = raw.parse::<f64>() {
                    return Value::from(f.ceil() as i64);
                }
            }
            if is_integer_literal(raw) {
                if let Ok(n) = raw.parse::<i64>() {
                    return Value::from(n);
                }
            }
            Value::String(raw.to_owned())
        }
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

impl ComputeFleetRequest {
    /// Build from a validated event. The prior request id is the event's
    /// physical id, carried on Update and Delete.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let desired = ctx.event.desired_properties;
        let region = props::required_str(desired, "Region")?;
        let spec = normalize_spec(&props::required_value(desired, "FleetSpec")?);
        Ok(Self {
            fleets: ctx.capabilities.fleets(&region),
            spec,
            override_capacity: props::flag(desired, "OverrideCapacity"),
            prior_request_id: ctx.event.physical_id.map(str::to_owned),
        })
    }

    fn desired_capacity(&self) -> Option<f64> {
        self.spec.get("TargetCapacity").and_then(Value::as_f64)
    }

    /// Target capacity for the replacement request: `max(desired, existing)`
    /// unless overridden. A prior request the provider no longer knows
    /// leaves the desired capacity as-is.
    async fn reconciled_spec(&self, prior_id: &str) -> Result<Value> {
        let mut spec = self.spec.clone();
        if self.override_capacity {
            return Ok(spec);
        }
        let existing = match self.fleets.describe_fleet(prior_id).await {
            Ok(request) => request.target_capacity(),
            Err(err) if err.is_absent() => {
                warn!(request_id = %prior_id, "prior fleet request unknown; skipping capacity ratchet");
                None
            }
            Err(err) => return Err(err.into()),
        };
        if let (Some(existing), Some(desired)) = (existing, self.desired_capacity()) {
            if existing > desired {
                info!(existing, desired, "ratcheting target capacity upward");
                spec["TargetCapacity"] = Value::from(existing.ceil() as i64);
            }
        }
        Ok(spec)
    }

    async fn cancel_prior(&self, prior_id: &str) -> Result<()> {
        // Soft cancellation: workers provisioned by the old request keep
        // running under the new one.
        match self.fleets.cancel_fleet(prior_id, false).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_absent() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ResourceHandler for ComputeFleetRequest {
    async fn create(&self) -> Result<HandlerOutcome> {
        let id = self.fleets.request_fleet(&self.spec).await?;
        Ok(HandlerOutcome::with_id(id))
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        let prior_id = self
            .prior_request_id
            .as_deref()
            .filter(|id| valid_request_id(id));
        let spec = match prior_id {
            Some(prior_id) => self.reconciled_spec(prior_id).await?,
            None => self.spec.clone(),
        };
        // Create the replacement before cancelling the original.
        let new_id = self.fleets.request_fleet(&spec).await?;
        if let Some(prior_id) = prior_id {
            self.cancel_prior(prior_id).await?;
        }
        Ok(HandlerOutcome::with_id(new_id))
    }

    async fn remove(&self) -> Result<()> {
        match self.prior_request_id.as_deref() {
            Some(id) if valid_request_id(id) => self.cancel_prior(id).await,
            Some(id) => {
                warn!(request_id = %id, "stored id is not a fleet request id; nothing to cancel");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
