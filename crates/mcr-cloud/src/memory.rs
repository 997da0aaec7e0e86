//! ---
//! mcr_section: "03-capability-interfaces"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "External-system capability traits and shared data types."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{
    BucketNotificationApi, CapabilitySet, FleetApi, InventoryApi, LogGroupApi, NetworkApi,
    StackApi, TableApi, TopicApi,
};
use crate::types::{
    FleetRequest, NetworkFacts, NotificationConfig, StackOutputs, SubscriptionPage,
    TableDescription, TopicSubscription,
};
use crate::{CloudError, Result};

/// A message published to a topic, recorded for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Target topic address.
    pub topic_address: String,
    /// Message subject.
    pub subject: String,
    /// Message body.
    pub body: String,
}

#[derive(Debug, Clone)]
struct StoredSubscription {
    topic_address: String,
    subscription: TopicSubscription,
}

#[derive(Debug, Clone)]
struct StoredFleet {
    id: String,
    spec: Value,
    active: bool,
    workers_terminated: bool,
}

#[derive(Default)]
struct MemoryState {
    next_subscription: u64,
    subscriptions: Vec<StoredSubscription>,
    missing_topics: HashSet<String>,
    published: Vec<PublishedMessage>,
    subscription_page_size: Option<usize>,
    subscription_list_calls: u64,
    notification_configs: HashMap<String, NotificationConfig>,
    inventories: BTreeMap<(String, String), Value>,
    next_fleet: u64,
    fleets: Vec<StoredFleet>,
    log_groups: BTreeSet<String>,
    tables: HashMap<String, TableDescription>,
    stacks: HashMap<String, StackOutputs>,
    network: Option<NetworkFacts>,
}

/// In-memory implementation of every capability trait, backed by a mutex
/// protected state bag. Used by unit tests, the integration suites and the
/// local harness; all regions share one state.
#[derive(Clone, Default)]
pub struct MemoryCloud {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCloud {
    /// Create an empty in-memory external system.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Pre-register a subscription, returning its id.
    pub fn seed_subscription(&self, topic_address: &str, protocol: &str, endpoint: &str) -> String {
        let mut state = self.lock();
        state.next_subscription += 1;
        let id = format!("sub-{:04}", state.next_subscription);
        state.subscriptions.push(StoredSubscription {
            topic_address: topic_address.to_owned(),
            subscription: TopicSubscription {
                id: id.clone(),
                protocol: protocol.to_owned(),
                endpoint: endpoint.to_owned(),
            },
        });
        id
    }

    /// Pre-register a subscription stuck awaiting endpoint confirmation.
    pub fn seed_pending_subscription(&self, topic_address: &str, endpoint: &str) {
        self.lock().subscriptions.push(StoredSubscription {
            topic_address: topic_address.to_owned(),
            subscription: TopicSubscription {
                id: crate::types::PENDING_CONFIRMATION.to_owned(),
                protocol: "https".to_owned(),
                endpoint: endpoint.to_owned(),
            },
        });
    }

    /// Make every topic operation against `topic_address` report not-found.
    pub fn mark_topic_missing(&self, topic_address: &str) {
        self.lock().missing_topics.insert(topic_address.to_owned());
    }

    /// Force subscription listings to paginate with at most `n` entries.
    pub fn set_subscription_page_size(&self, n: usize) {
        self.lock().subscription_page_size = Some(n);
    }

    /// Endpoints currently subscribed to `topic_address`.
    pub fn subscription_endpoints(&self, topic_address: &str) -> Vec<String> {
        self.lock()
            .subscriptions
            .iter()
            .filter(|stored| stored.topic_address == topic_address)
            .map(|stored| stored.subscription.endpoint.clone())
            .collect()
    }

    /// Number of listing calls made so far.
    pub fn subscription_list_calls(&self) -> u64 {
        self.lock().subscription_list_calls
    }

    /// Messages published so far.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.lock().published.clone()
    }

    /// Install a bucket's notification configuration.
    pub fn seed_notification_config(&self, bucket: &str, config: NotificationConfig) {
        self.lock()
            .notification_configs
            .insert(bucket.to_owned(), config);
    }

    /// The bucket's current notification configuration, when one exists.
    pub fn notification_config(&self, bucket: &str) -> Option<NotificationConfig> {
        self.lock().notification_configs.get(bucket).cloned()
    }

    /// The inventory spec stored under `(bucket, id)`, when present.
    pub fn inventory(&self, bucket: &str, id: &str) -> Option<Value> {
        self.lock()
            .inventories
            .get(&(bucket.to_owned(), id.to_owned()))
            .cloned()
    }

    /// Ids of all inventory configurations on `bucket`.
    pub fn inventory_ids(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .inventories
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Pre-register an active fleet request, returning its id.
    pub fn seed_fleet(&self, spec: Value) -> String {
        let mut state = self.lock();
        state.next_fleet += 1;
        let id = format!("cfr-{:0>36}", state.next_fleet);
        state.fleets.push(StoredFleet {
            id: id.clone(),
            spec,
            active: true,
            workers_terminated: false,
        });
        id
    }

    /// Whether the fleet request is still active.
    pub fn fleet_active(&self, request_id: &str) -> Option<bool> {
        self.lock()
            .fleets
            .iter()
            .find(|fleet| fleet.id == request_id)
            .map(|fleet| fleet.active)
    }

    /// Whether cancelling the fleet request terminated its workers.
    pub fn fleet_workers_terminated(&self, request_id: &str) -> Option<bool> {
        self.lock()
            .fleets
            .iter()
            .find(|fleet| fleet.id == request_id)
            .map(|fleet| fleet.workers_terminated)
    }

    /// Ids of all still-active fleet requests.
    pub fn active_fleet_ids(&self) -> Vec<String> {
        self.lock()
            .fleets
            .iter()
            .filter(|fleet| fleet.active)
            .map(|fleet| fleet.id.clone())
            .collect()
    }

    /// The stored spec of a fleet request.
    pub fn fleet_spec(&self, request_id: &str) -> Option<Value> {
        self.lock()
            .fleets
            .iter()
            .find(|fleet| fleet.id == request_id)
            .map(|fleet| fleet.spec.clone())
    }

    /// Pre-register a log group.
    pub fn seed_log_group(&self, name: &str) {
        self.lock().log_groups.insert(name.to_owned());
    }

    /// Whether the named log group exists.
    pub fn has_log_group(&self, name: &str) -> bool {
        self.lock().log_groups.contains(name)
    }

    /// Install a table description.
    pub fn seed_table(&self, name: &str, stream_label: Option<&str>) {
        self.lock().tables.insert(
            name.to_owned(),
            TableDescription {
                name: name.to_owned(),
                stream_label: stream_label.map(str::to_owned),
            },
        );
    }

    /// Install a stack's outputs.
    pub fn seed_stack(&self, stack_name: &str, outputs: StackOutputs) {
        self.lock().stacks.insert(stack_name.to_owned(), outputs);
    }

    /// Install the default network's facts.
    pub fn seed_network(&self, facts: NetworkFacts) {
        self.lock().network = Some(facts);
    }
}

#[async_trait]
impl TopicApi for MemoryCloud {
    async fn subscribe(
        &self,
        topic_address: &str,
        protocol: &str,
        endpoint: &str,
    ) -> Result<String> {
        if self.lock().missing_topics.contains(topic_address) {
            return Err(CloudError::NotFound(format!(
                "topic {topic_address} not found"
            )));
        }
        Ok(self.seed_subscription(topic_address, protocol, endpoint))
    }

    async fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        let mut state = self.lock();
        let before = state.subscriptions.len();
        state
            .subscriptions
            .retain(|stored| stored.subscription.id != subscription_id);
        if state.subscriptions.len() == before {
            return Err(CloudError::NotFound(format!(
                "subscription {subscription_id} not found"
            )));
        }
        Ok(())
    }

    async fn list_subscriptions(
        &self,
        topic_address: &str,
        token: Option<&str>,
    ) -> Result<SubscriptionPage> {
        let mut state = self.lock();
        state.subscription_list_calls += 1;
        if state.missing_topics.contains(topic_address) {
            return Err(CloudError::NotFound(format!(
                "topic {topic_address} not found"
            )));
        }
        let matching: Vec<TopicSubscription> = state
            .subscriptions
            .iter()
            .filter(|stored| stored.topic_address == topic_address)
            .map(|stored| stored.subscription.clone())
            .collect();
        let offset = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let page_size = state.subscription_page_size.unwrap_or(usize::MAX);
        let end = offset.saturating_add(page_size).min(matching.len());
        let next_token = (end < matching.len()).then(|| end.to_string());
        Ok(SubscriptionPage {
            subscriptions: matching[offset.min(end)..end].to_vec(),
            next_token,
        })
    }

    async fn publish(&self, topic_address: &str, subject: &str, body: &str) -> Result<()> {
        let mut state = self.lock();
        if state.missing_topics.contains(topic_address) {
            return Err(CloudError::NotFound(format!(
                "topic {topic_address} not found"
            )));
        }
        state.published.push(PublishedMessage {
            topic_address: topic_address.to_owned(),
            subject: subject.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }
}

#[async_trait]
impl BucketNotificationApi for MemoryCloud {
    async fn fetch_notification_config(&self, bucket: &str) -> Result<Option<NotificationConfig>> {
        Ok(self.lock().notification_configs.get(bucket).cloned())
    }

    async fn write_notification_config(
        &self,
        bucket: &str,
        config: &NotificationConfig,
    ) -> Result<()> {
        self.lock()
            .notification_configs
            .insert(bucket.to_owned(), config.clone());
        Ok(())
    }
}

#[async_trait]
impl InventoryApi for MemoryCloud {
    async fn put_inventory(&self, bucket: &str, id: &str, spec: &Value) -> Result<()> {
        self.lock()
            .inventories
            .insert((bucket.to_owned(), id.to_owned()), spec.clone());
        Ok(())
    }

    async fn delete_inventory(&self, bucket: &str, id: &str) -> Result<()> {
        let removed = self
            .lock()
            .inventories
            .remove(&(bucket.to_owned(), id.to_owned()));
        if removed.is_none() {
            return Err(CloudError::NotFound(format!(
                "inventory configuration {id} not found on {bucket}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FleetApi for MemoryCloud {
    async fn request_fleet(&self, spec: &Value) -> Result<String> {
        Ok(self.seed_fleet(spec.clone()))
    }

    async fn describe_fleet(&self, request_id: &str) -> Result<FleetRequest> {
        self.lock()
            .fleets
            .iter()
            .find(|fleet| fleet.id == request_id)
            .map(|fleet| FleetRequest {
                id: fleet.id.clone(),
                spec: fleet.spec.clone(),
            })
            .ok_or_else(|| CloudError::NotFound(format!("fleet request {request_id} not found")))
    }

    async fn cancel_fleet(&self, request_id: &str, terminate_workers: bool) -> Result<()> {
        let mut state = self.lock();
        let fleet = state
            .fleets
            .iter_mut()
            .find(|fleet| fleet.id == request_id)
            .ok_or_else(|| CloudError::NotFound(format!("fleet request {request_id} not found")))?;
        fleet.active = false;
        if terminate_workers {
            fleet.workers_terminated = true;
        }
        Ok(())
    }
}

#[async_trait]
impl LogGroupApi for MemoryCloud {
    async fn create_log_group(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.log_groups.insert(name.to_owned()) {
            return Err(CloudError::AlreadyExists(format!(
                "log group {name} already exists"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TableApi for MemoryCloud {
    async fn describe_table(&self, name: &str) -> Result<TableDescription> {
        self.lock()
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("table {name} not found")))
    }
}

#[async_trait]
impl StackApi for MemoryCloud {
    async fn describe_stack_outputs(&self, stack_name: &str) -> Result<StackOutputs> {
        self.lock()
            .stacks
            .get(stack_name)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("no stack named {stack_name} was found")))
    }
}

#[async_trait]
impl NetworkApi for MemoryCloud {
    async fn describe_default_network(&self) -> Result<NetworkFacts> {
        self.lock()
            .network
            .clone()
            .ok_or_else(|| CloudError::NotFound("no default network found".to_owned()))
    }
}

impl CapabilitySet for MemoryCloud {
    fn topics(&self, _region: &str) -> Arc<dyn TopicApi> {
        Arc::new(self.clone())
    }

    fn bucket_notifications(&self, _region: &str) -> Arc<dyn BucketNotificationApi> {
        Arc::new(self.clone())
    }

    fn inventories(&self, _region: &str) -> Arc<dyn InventoryApi> {
        Arc::new(self.clone())
    }

    fn fleets(&self, _region: &str) -> Arc<dyn FleetApi> {
        Arc::new(self.clone())
    }

    fn log_groups(&self, _region: &str) -> Arc<dyn LogGroupApi> {
        Arc::new(self.clone())
    }

    fn tables(&self, _region: &str) -> Arc<dyn TableApi> {
        Arc::new(self.clone())
    }

    fn stacks(&self, _region: &str) -> Arc<dyn StackApi> {
        Arc::new(self.clone())
    }

    fn networks(&self, _region: &str) -> Arc<dyn NetworkApi> {
        Arc::new(self.clone())
    }
}
