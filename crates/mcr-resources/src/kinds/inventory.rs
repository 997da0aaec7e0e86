//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Bucket inventory configuration, stored under a caller-chosen id.

use std::sync::Arc;

use async_trait::async_trait;
use mcr_cloud::InventoryApi;
use serde_json::Value;
use tracing::debug;

use crate::handler::{HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::registry::BuildContext;

/// `collection-inventory-entry`: a put/delete pair keyed by `(bucket, id)`.
pub struct CollectionInventoryEntry {
    inventories: Arc<dyn InventoryApi>,
    bucket: String,
    id: String,
    prior_id: Option<String>,
    spec: Value,
}

impl CollectionInventoryEntry {
    /// Build from a validated event.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let desired = ctx.event.desired_properties;
        let bucket = props::required_str(desired, "Bucket")?;
        let region = props::required_str(desired, "Region")?;
        let id = props::required_str(desired, "Id")?;
        let spec = props::required_value(desired, "InventorySpec")?;
        let prior_id = ctx
            .event
            .prior_properties
            .and_then(|bag| props::optional_str(bag, "Id"))
            .filter(|prior| prior != &id);
        Ok(Self {
            inventories: ctx.capabilities.inventories(&region),
            bucket,
            id,
            prior_id,
            spec,
        })
    }

    async fn delete_tolerating_absence(&self, id: &str) -> Result<()> {
        match self.inventories.delete_inventory(&self.bucket, id).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_absent() => {
                debug!(bucket = %self.bucket, id, "inventory configuration already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ResourceHandler for CollectionInventoryEntry {
    async fn create(&self) -> Result<HandlerOutcome> {
        self.inventories
            .put_inventory(&self.bucket, &self.id, &self.spec)
            .await?;
        Ok(HandlerOutcome::none())
    }

    // Put under the desired id first; the old id is only dropped once the
    // replacement is in place, and only when the id actually changed.
    async fn modify(&self) -> Result<HandlerOutcome> {
        self.inventories
            .put_inventory(&self.bucket, &self.id, &self.spec)
            .await?;
        if let Some(prior_id) = &self.prior_id {
            self.delete_tolerating_absence(prior_id).await?;
        }
        Ok(HandlerOutcome::none())
    }

    async fn remove(&self) -> Result<()> {
        self.delete_tolerating_absence(&self.id).await
    }
}
