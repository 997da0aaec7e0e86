//! ---
//! mcr_section: "03-capability-interfaces"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "External-system capability traits and shared data types."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel subscription id the provider reports while a subscription awaits
/// endpoint confirmation. Such entries cannot be removed by callers; the
/// provider garbage-collects them independently.
pub const PENDING_CONFIRMATION: &str = "PendingConfirmation";

/// One subscription attached to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSubscription {
    /// Provider-assigned subscription identifier, or [`PENDING_CONFIRMATION`].
    pub id: String,
    /// Delivery protocol of the subscription.
    pub protocol: String,
    /// Opaque endpoint the subscription delivers to.
    pub endpoint: String,
}

/// One page of a token-continued subscription listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPage {
    /// Subscriptions on this page.
    pub subscriptions: Vec<TopicSubscription>,
    /// Continuation token; `None` on the final page.
    pub next_token: Option<String>,
}

/// A single filter rule inside a notification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Rule name, e.g. `Prefix` or `Suffix`.
    pub name: String,
    /// Value matched by the rule.
    pub value: String,
}

/// One entry of a bucket's collection-valued notification configuration.
///
/// Entries are addressed by the explicit `id` field, never by position:
/// concurrent external mutation between fetch and write-back can reorder or
/// remove unrelated entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// Caller-chosen identity within the collection; absent for the legacy
    /// single-entry kind, which is addressed by its prefix rule instead.
    pub id: Option<String>,
    /// Topic address notified by this entry.
    pub topic_address: String,
    /// Event types the topic is notified about.
    pub event_types: Vec<String>,
    /// Optional key filter rules.
    pub filter_rules: Vec<FilterRule>,
}

impl NotificationEntry {
    /// Value of the `Prefix` filter rule, when present.
    pub fn prefix_value(&self) -> Option<&str> {
        self.filter_rules
            .iter()
            .find(|rule| rule.name == "Prefix")
            .map(|rule| rule.value.as_str())
    }
}

/// The full notification configuration attached to a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Entries in provider order; write-back preserves the relative order of
    /// untouched entries.
    pub entries: Vec<NotificationEntry>,
}

/// A compute-fleet request as described by the external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetRequest {
    /// Provider-assigned request identifier.
    pub id: String,
    /// The fleet specification, including `TargetCapacity`.
    pub spec: serde_json::Value,
}

impl FleetRequest {
    /// The request's target capacity, when the spec carries one.
    pub fn target_capacity(&self) -> Option<f64> {
        self.spec.get("TargetCapacity").and_then(|v| v.as_f64())
    }
}

/// Description of a table, as far as the stream-label lookup needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    /// Table name.
    pub name: String,
    /// Label of the table's change stream, when streaming is enabled.
    pub stream_label: Option<String>,
}

/// Facts about an account's default network, derived for stack consumption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFacts {
    /// Identifier of the default network.
    pub network_id: String,
    /// Availability zones of the public subnets.
    pub zones: Vec<String>,
    /// Public subnet identifiers.
    pub public_subnets: Vec<String>,
    /// Availability zones of the private subnets.
    pub private_zones: Vec<String>,
    /// Private subnet identifiers.
    pub private_subnets: Vec<String>,
    /// Main route table identifier.
    pub route_table: String,
}

/// Stack outputs keyed by output name.
pub type StackOutputs = BTreeMap<String, String>;
