//! ---
//! mcr_section: "03-capability-interfaces"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "External-system capability traits and shared data types."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{
    FleetRequest, NetworkFacts, NotificationConfig, StackOutputs, SubscriptionPage,
    TableDescription,
};
use crate::Result;

/// Topic operations: subscriptions and message publication.
#[async_trait]
pub trait TopicApi: Send + Sync {
    /// Subscribe an endpoint to a topic, returning the subscription id.
    async fn subscribe(&self, topic_address: &str, protocol: &str, endpoint: &str)
        -> Result<String>;
    /// Remove a subscription by id.
    async fn unsubscribe(&self, subscription_id: &str) -> Result<()>;
    /// Fetch one page of the topic's subscription listing.
    async fn list_subscriptions(
        &self,
        topic_address: &str,
        token: Option<&str>,
    ) -> Result<SubscriptionPage>;
    /// Publish a message to a topic.
    async fn publish(&self, topic_address: &str, subject: &str, body: &str) -> Result<()>;
}

/// Bucket notification configuration: a single collection-valued object.
#[async_trait]
pub trait BucketNotificationApi: Send + Sync {
    /// Fetch the current configuration; `None` when no configuration object
    /// exists at all (distinct from an empty one).
    async fn fetch_notification_config(&self, bucket: &str) -> Result<Option<NotificationConfig>>;
    /// Replace the bucket's configuration wholesale.
    async fn write_notification_config(
        &self,
        bucket: &str,
        config: &NotificationConfig,
    ) -> Result<()>;
}

/// Bucket inventory configurations, addressed by id.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Create or replace the inventory configuration stored under `id`.
    async fn put_inventory(&self, bucket: &str, id: &str, spec: &Value) -> Result<()>;
    /// Delete the inventory configuration stored under `id`.
    async fn delete_inventory(&self, bucket: &str, id: &str) -> Result<()>;
}

/// Compute-fleet requests.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// Issue a new fleet request, returning its identifier.
    async fn request_fleet(&self, spec: &Value) -> Result<String>;
    /// Describe an existing fleet request.
    async fn describe_fleet(&self, request_id: &str) -> Result<FleetRequest>;
    /// Cancel a fleet request. When `terminate_workers` is false the
    /// cancellation is soft: already-provisioned workers keep running.
    async fn cancel_fleet(&self, request_id: &str, terminate_workers: bool) -> Result<()>;
}

/// Log group management.
#[async_trait]
pub trait LogGroupApi: Send + Sync {
    /// Create a log group by name.
    async fn create_log_group(&self, name: &str) -> Result<()>;
}

/// Table descriptions for derived lookups.
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Describe a table by name.
    async fn describe_table(&self, name: &str) -> Result<TableDescription>;
}

/// Stack output lookups.
#[async_trait]
pub trait StackApi: Send + Sync {
    /// Fetch the outputs of a named stack.
    async fn describe_stack_outputs(&self, stack_name: &str) -> Result<StackOutputs>;
}

/// Default-network fact lookups.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Derive the default network's facts.
    async fn describe_default_network(&self) -> Result<NetworkFacts>;
}

/// The capability bundle handed to handler constructors.
///
/// Each accessor returns a handle already bound to the given region (and to
/// whatever credentials the implementation carries); handlers hold the
/// handle for the duration of one lifecycle call and never cache it across
/// invocations.
pub trait CapabilitySet: Send + Sync {
    /// Topic operations in `region`.
    fn topics(&self, region: &str) -> Arc<dyn TopicApi>;
    /// Bucket notification configuration in `region`.
    fn bucket_notifications(&self, region: &str) -> Arc<dyn BucketNotificationApi>;
    /// Bucket inventories in `region`.
    fn inventories(&self, region: &str) -> Arc<dyn InventoryApi>;
    /// Fleet requests in `region`.
    fn fleets(&self, region: &str) -> Arc<dyn FleetApi>;
    /// Log groups in `region`.
    fn log_groups(&self, region: &str) -> Arc<dyn LogGroupApi>;
    /// Table descriptions in `region`.
    fn tables(&self, region: &str) -> Arc<dyn TableApi>;
    /// Stack outputs in `region`.
    fn stacks(&self, region: &str) -> Arc<dyn StackApi>;
    /// Default-network facts in `region`.
    fn networks(&self, region: &str) -> Arc<dyn NetworkApi>;
}
