//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Kind registry: maps resource-kind names to constructor functions.
//!
//! The dispatcher holds one registry and never a type hierarchy; registering
//! a kind is registering a function from a validated event to a boxed
//! [`ResourceHandler`].

use indexmap::IndexMap;
use mcr_cloud::CapabilitySet;
use mcr_events::ConformantEvent;

use crate::handler::{HandlerError, ResourceHandler, Result};
use crate::kinds;

/// Everything a kind constructor may draw on.
pub struct BuildContext<'a> {
    /// The validated invocation event.
    pub event: ConformantEvent<'a>,
    /// Capability handles, already bound to credentials.
    pub capabilities: &'a dyn CapabilitySet,
    /// Region used when the property bag does not determine one.
    pub default_region: &'a str,
}

/// Constructor function for one resource kind.
pub type Constructor =
    Box<dyn Fn(&BuildContext<'_>) -> Result<Box<dyn ResourceHandler>> + Send + Sync>;

/// Registry of resource kinds known to the dispatcher.
pub struct KindRegistry {
    constructors: IndexMap<String, Constructor>,
}

impl KindRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: IndexMap::new(),
        }
    }

    /// Registry pre-populated with every built-in kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("endpoint-subscription", |ctx| {
            Ok(Box::new(kinds::EndpointSubscription::from_context(ctx)?))
        });
        registry.register("notification-entry", |ctx| {
            Ok(Box::new(kinds::BucketNotificationEntry::from_context(ctx)?))
        });
        registry.register("notification-topic-entry", |ctx| {
            Ok(Box::new(kinds::NotificationTopicEntry::from_context(ctx)?))
        });
        registry.register("collection-inventory-entry", |ctx| {
            Ok(Box::new(kinds::CollectionInventoryEntry::from_context(
                ctx,
            )?))
        });
        registry.register("compute-fleet-request", |ctx| {
            Ok(Box::new(kinds::ComputeFleetRequest::from_context(ctx)?))
        });
        registry.register("message-publish", |ctx| {
            Ok(Box::new(kinds::MessagePublish::from_context(ctx)?))
        });
        registry.register("log-group", |ctx| {
            Ok(Box::new(kinds::LogGroup::from_context(ctx)?))
        });
        registry.register("stream-label", |ctx| {
            Ok(Box::new(kinds::StreamLabel::from_context(ctx)?))
        });
        registry.register("stack-outputs", |ctx| {
            Ok(Box::new(kinds::StackOutputsLookup::from_context(ctx)?))
        });
        registry.register("default-network", |ctx| {
            Ok(Box::new(kinds::DefaultNetwork::from_context(ctx)?))
        });
        registry
    }

    /// Register (or replace) a kind under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&BuildContext<'_>) -> Result<Box<dyn ResourceHandler>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.into(), Box::new(constructor));
    }

    /// Registered kind names, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build a handler for `kind`, failing with a validation error (no
    /// external call has happened) when the kind is unknown.
    pub fn construct(
        &self,
        kind: &str,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn ResourceHandler>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| HandlerError::Validation(format!("Unknown resource kind: {kind}")))?;
        constructor(ctx)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
