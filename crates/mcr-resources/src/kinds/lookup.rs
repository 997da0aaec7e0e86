//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Read-only lookup kinds: these provision nothing and exist to surface
//! derived identifiers (a table's stream label, a sibling stack's outputs,
//! the default network's facts) as output attributes. Deletion is a no-op
//! and performs no lookup.

use std::sync::Arc;

use async_trait::async_trait;
use mcr_cloud::{NetworkApi, StackApi, TableApi};
use serde_json::{Map, Value};

use crate::handler::{HandlerError, HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::registry::BuildContext;

fn lookup_region(ctx: &BuildContext<'_>) -> String {
    props::optional_str(ctx.event.desired_properties, "Region")
        .unwrap_or_else(|| ctx.default_region.to_owned())
}

/// `stream-label`: resolves a table's change-stream label. The label
/// becomes the physical id so dependent resources can reference it.
pub struct StreamLabel {
    tables: Arc<dyn TableApi>,
    table_name: String,
}

impl StreamLabel {
    /// Build from a validated event.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let table_name = props::required_str(ctx.event.desired_properties, "TableName")?;
        Ok(Self {
            tables: ctx.capabilities.tables(&lookup_region(ctx)),
            table_name,
        })
    }

    async fn resolve(&self) -> Result<HandlerOutcome> {
        let table = self.tables.describe_table(&self.table_name).await?;
        let label = table.stream_label.ok_or_else(|| {
            HandlerError::Dependency(format!(
                "table {} does not have a change stream enabled",
                self.table_name
            ))
        })?;
        Ok(HandlerOutcome::with_id(label))
    }
}

#[async_trait]
impl ResourceHandler for StreamLabel {
    async fn create(&self) -> Result<HandlerOutcome> {
        self.resolve().await
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        self.resolve().await
    }

    async fn remove(&self) -> Result<()> {
        Ok(())
    }
}

/// `stack-outputs`: surfaces a named stack's outputs as attributes.
pub struct StackOutputsLookup {
    stacks: Arc<dyn StackApi>,
    stack_name: String,
}

impl StackOutputsLookup {
    /// Build from a validated event.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let stack_name = props::required_str(ctx.event.desired_properties, "StackName")?;
        Ok(Self {
            stacks: ctx.capabilities.stacks(&lookup_region(ctx)),
            stack_name,
        })
    }

    async fn resolve(&self) -> Result<HandlerOutcome> {
        let outputs = self.stacks.describe_stack_outputs(&self.stack_name).await?;
        let attributes: Map<String, Value> = outputs
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        Ok(HandlerOutcome::with_attributes(attributes))
    }
}

#[async_trait]
impl ResourceHandler for StackOutputsLookup {
    async fn create(&self) -> Result<HandlerOutcome> {
        self.resolve().await
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        self.resolve().await
    }

    async fn remove(&self) -> Result<()> {
        Ok(())
    }
}

/// `default-network`: derives the default network's facts. The network id
/// becomes the physical id.
pub struct DefaultNetwork {
    networks: Arc<dyn NetworkApi>,
}

impl DefaultNetwork {
    /// Build from a validated event.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        Ok(Self {
            networks: ctx.capabilities.networks(&lookup_region(ctx)),
        })
    }

    async fn resolve(&self) -> Result<HandlerOutcome> {
        let facts = self.networks.describe_default_network().await?;
        let mut attributes = Map::new();
        attributes.insert("NetworkId".to_owned(), Value::String(facts.network_id.clone()));
        attributes.insert("Zones".to_owned(), string_list(&facts.zones));
        attributes.insert("PublicSubnets".to_owned(), string_list(&facts.public_subnets));
        attributes.insert("PrivateZones".to_owned(), string_list(&facts.private_zones));
        attributes.insert(
            "PrivateSubnets".to_owned(),
            string_list(&facts.private_subnets),
        );
        attributes.insert("RouteTable".to_owned(), Value::String(facts.route_table));
        Ok(HandlerOutcome::id_and_attributes(facts.network_id, attributes))
    }
}

fn string_list(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

#[async_trait]
impl ResourceHandler for DefaultNetwork {
    async fn create(&self) -> Result<HandlerOutcome> {
        self.resolve().await
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        self.resolve().await
    }

    async fn remove(&self) -> Result<()> {
        Ok(())
    }
}
