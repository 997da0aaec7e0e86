//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Endpoint subscription on a topic.
//!
//! The provider does not expose a lookup-by-endpoint call, so teardown walks
//! the topic's paginated subscription listing comparing endpoints, stopping
//! at the first match.

use std::sync::Arc;

use async_trait::async_trait;
use mcr_cloud::{TopicApi, TopicSubscription, PENDING_CONFIRMATION};
use tracing::{debug, info};

use crate::handler::{HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::registry::BuildContext;

/// `endpoint-subscription`: subscribes an endpoint to a topic.
pub struct EndpointSubscription {
    topics: Arc<dyn TopicApi>,
    prior_topics: Arc<dyn TopicApi>,
    topic_address: String,
    protocol: String,
    endpoint: String,
    prior_topic_address: String,
    prior_endpoint: String,
}

impl EndpointSubscription {
    /// Build from a validated event. The region is taken from the topic
    /// address, separately for the desired and the prior topic.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let desired = ctx.event.desired_properties;
        let topic_address = props::required_str(desired, "TopicAddress")?;
        let protocol = props::required_str(desired, "Protocol")?;
        let endpoint = props::required_str(desired, "Endpoint")?;

        let prior = ctx.event.prior_properties;
        let prior_topic_address = prior
            .and_then(|bag| props::optional_str(bag, "TopicAddress"))
            .unwrap_or_else(|| topic_address.clone());
        let prior_endpoint = prior
            .and_then(|bag| props::optional_str(bag, "Endpoint"))
            .unwrap_or_else(|| endpoint.clone());

        let region = props::region_segment(&topic_address, "TopicAddress")?;
        let prior_region = props::region_segment(&prior_topic_address, "TopicAddress")?;
        Ok(Self {
            topics: ctx.capabilities.topics(&region),
            prior_topics: ctx.capabilities.topics(&prior_region),
            topic_address,
            protocol,
            endpoint,
            prior_topic_address,
            prior_endpoint,
        })
    }

    /// Unsubscribe `endpoint` from `topic_address`, treating every flavour
    /// of absence as success: a missing topic, an endpoint no listing page
    /// carries, or an already-removed subscription id. A match still
    /// awaiting endpoint confirmation cannot be removed by callers and is
    /// also reported as success.
    async fn remove_endpoint(
        &self,
        api: &Arc<dyn TopicApi>,
        topic_address: &str,
        endpoint: &str,
    ) -> Result<()> {
        let found = match find_subscription(api.as_ref(), topic_address, endpoint).await {
            Ok(found) => found,
            Err(err) if err.is_absent() => {
                info!(topic = %topic_address, "topic absent; subscription treated as removed");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        match found {
            None => {
                debug!(topic = %topic_address, "endpoint not subscribed; nothing to remove");
                Ok(())
            }
            Some(subscription) if subscription.id == PENDING_CONFIRMATION => {
                info!(
                    topic = %topic_address,
                    "subscription awaiting confirmation; provider will collect it"
                );
                Ok(())
            }
            Some(subscription) => match api.unsubscribe(&subscription.id).await {
                Ok(()) => Ok(()),
                Err(err) if err.is_absent() => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }
}

/// Page through the topic's subscription listing until `endpoint` matches,
/// following continuation tokens; the first match wins.
async fn find_subscription(
    api: &dyn TopicApi,
    topic_address: &str,
    endpoint: &str,
) -> mcr_cloud::Result<Option<TopicSubscription>> {
    let mut token: Option<String> = None;
    loop {
        let page = api
            .list_subscriptions(topic_address, token.as_deref())
            .await?;
        if let Some(hit) = page
            .subscriptions
            .into_iter()
            .find(|subscription| subscription.endpoint == endpoint)
        {
            return Ok(Some(hit));
        }
        match page.next_token {
            Some(next) => token = Some(next),
            None => return Ok(None),
        }
    }
}

#[async_trait]
impl ResourceHandler for EndpointSubscription {
    async fn create(&self) -> Result<HandlerOutcome> {
        let id = self
            .topics
            .subscribe(&self.topic_address, &self.protocol, &self.endpoint)
            .await?;
        Ok(HandlerOutcome::with_id(id))
    }

    // There is no in-place mutation of a subscription; converge by removing
    // the prior endpoint and subscribing the desired one.
    async fn modify(&self) -> Result<HandlerOutcome> {
        self.remove_endpoint(
            &self.prior_topics,
            &self.prior_topic_address,
            &self.prior_endpoint,
        )
        .await?;
        self.create().await
    }

    async fn remove(&self) -> Result<()> {
        self.remove_endpoint(&self.topics, &self.topic_address, &self.endpoint)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcr_cloud::MemoryCloud;

    const TOPIC: &str = "arn:cloud:topics:us-east-1:123:alerts";

    fn handler(cloud: &MemoryCloud, endpoint: &str, prior_endpoint: &str) -> EndpointSubscription {
        EndpointSubscription {
            topics: Arc::new(cloud.clone()),
            prior_topics: Arc::new(cloud.clone()),
            topic_address: TOPIC.to_owned(),
            protocol: "https".to_owned(),
            endpoint: endpoint.to_owned(),
            prior_topic_address: TOPIC.to_owned(),
            prior_endpoint: prior_endpoint.to_owned(),
        }
    }

    #[tokio::test]
    async fn create_subscribes_and_reports_the_id() {
        let cloud = MemoryCloud::new();
        let outcome = handler(&cloud, "https://hook.example.com", "https://hook.example.com")
            .create()
            .await
            .expect("create");
        assert_eq!(outcome.physical_id.as_deref(), Some("sub-0001"));
        assert_eq!(
            cloud.subscription_endpoints(TOPIC),
            vec!["https://hook.example.com".to_owned()]
        );
    }

    #[tokio::test]
    async fn remove_searches_across_pages() {
        let cloud = MemoryCloud::new();
        cloud.set_subscription_page_size(2);
        for n in 0..3 {
            cloud.seed_subscription(TOPIC, "https", &format!("https://other-{n}"));
        }
        cloud.seed_subscription(TOPIC, "https", "https://target");

        handler(&cloud, "https://target", "https://target")
            .remove()
            .await
            .expect("remove");
        assert_eq!(cloud.subscription_list_calls(), 2);
        assert!(!cloud
            .subscription_endpoints(TOPIC)
            .contains(&"https://target".to_owned()));
    }

    #[tokio::test]
    async fn remove_of_unknown_endpoint_succeeds() {
        let cloud = MemoryCloud::new();
        cloud.seed_subscription(TOPIC, "https", "https://other");
        handler(&cloud, "https://never-subscribed", "https://never-subscribed")
            .remove()
            .await
            .expect("absent endpoint is success");
    }

    #[tokio::test]
    async fn remove_of_missing_topic_succeeds() {
        let cloud = MemoryCloud::new();
        cloud.mark_topic_missing(TOPIC);
        handler(&cloud, "https://hook", "https://hook")
            .remove()
            .await
            .expect("absent topic is success");
    }

    #[tokio::test]
    async fn pending_confirmation_is_left_alone() {
        let cloud = MemoryCloud::new();
        cloud.seed_pending_subscription(TOPIC, "https://pending");
        handler(&cloud, "https://pending", "https://pending")
            .remove()
            .await
            .expect("pending entry is not removable");
        assert_eq!(
            cloud.subscription_endpoints(TOPIC),
            vec!["https://pending".to_owned()],
            "the pending entry stays for the provider to collect"
        );
    }

    #[tokio::test]
    async fn modify_swaps_the_endpoint() {
        let cloud = MemoryCloud::new();
        cloud.seed_subscription(TOPIC, "https", "https://old");
        handler(&cloud, "https://new", "https://old")
            .modify()
            .await
            .expect("modify");
        assert_eq!(
            cloud.subscription_endpoints(TOPIC),
            vec!["https://new".to_owned()]
        );
    }
}
