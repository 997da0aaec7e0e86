//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! One-shot message publication to a topic.

use std::sync::Arc;

use async_trait::async_trait;
use mcr_cloud::TopicApi;
use tracing::debug;

use crate::handler::{HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::registry::BuildContext;

/// `message-publish`: publishes on Create (and on Update when asked to);
/// there is nothing to tear down.
pub struct MessagePublish {
    topics: Arc<dyn TopicApi>,
    topic_address: String,
    subject: String,
    body: String,
    send_on_update: bool,
}

impl MessagePublish {
    /// Build from a validated event. The region comes from the topic
    /// address.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let desired = ctx.event.desired_properties;
        let topic_address = props::required_str(desired, "TopicAddress")?;
        let subject = props::required_str(desired, "Subject")?;
        let body = props::required_str(desired, "Body")?;
        let region = props::region_segment(&topic_address, "TopicAddress")?;
        Ok(Self {
            topics: ctx.capabilities.topics(&region),
            topic_address,
            subject,
            body,
            send_on_update: props::flag(desired, "SendOnUpdate"),
        })
    }
}

#[async_trait]
impl ResourceHandler for MessagePublish {
    async fn create(&self) -> Result<HandlerOutcome> {
        self.topics
            .publish(&self.topic_address, &self.subject, &self.body)
            .await?;
        Ok(HandlerOutcome::none())
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        if !self.send_on_update {
            debug!(topic = %self.topic_address, "send-on-update not set; skipping publish");
            return Ok(HandlerOutcome::none());
        }
        self.create().await
    }

    async fn remove(&self) -> Result<()> {
        Ok(())
    }
}
