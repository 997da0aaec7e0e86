//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Explicit log-group creation, usually as a dependency anchor for
//! resources that would otherwise create the group implicitly.

use std::sync::Arc;

use async_trait::async_trait;
use mcr_cloud::LogGroupApi;
use serde_json::{Map, Value};
use tracing::debug;

use crate::handler::{HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::registry::BuildContext;

/// `log-group`: creates the named group; deletion is deliberately a no-op
/// so the logs outlive the stack.
pub struct LogGroup {
    log_groups: Arc<dyn LogGroupApi>,
    name: String,
    ignore_conflicts: bool,
}

impl LogGroup {
    /// Build from a validated event. A `Region` property wins; otherwise
    /// the region comes from the stack correlation id.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let desired = ctx.event.desired_properties;
        let name = props::required_str(desired, "LogGroupName")?;
        let region = match props::optional_str(desired, "Region") {
            Some(region) => region,
            None => props::region_segment(ctx.event.stack_id, "StackId")?,
        };
        Ok(Self {
            log_groups: ctx.capabilities.log_groups(&region),
            name,
            ignore_conflicts: props::flag(desired, "IgnoreConflicts"),
        })
    }

    fn attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert("LogGroupName".to_owned(), Value::String(self.name.clone()));
        attributes
    }
}

#[async_trait]
impl ResourceHandler for LogGroup {
    async fn create(&self) -> Result<HandlerOutcome> {
        match self.log_groups.create_log_group(&self.name).await {
            Ok(()) => {}
            Err(err) if err.is_conflict() && self.ignore_conflicts => {
                debug!(name = %self.name, "log group already exists; adopting it");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(HandlerOutcome::with_attributes(self.attributes()))
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        self.create().await
    }

    async fn remove(&self) -> Result<()> {
        Ok(())
    }
}
