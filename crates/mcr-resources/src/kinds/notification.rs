//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Single bucket notification entry, the legacy unkeyed kind.
//!
//! Entries of this kind carry no explicit id; they are addressed within the
//! collection by the value of their `Prefix` filter rule (an entry with no
//! prefix is addressed by the empty string).

use async_trait::async_trait;
use mcr_cloud::{FilterRule, NotificationEntry};
use serde_json::{Map, Value};

use crate::handler::{HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::reconcile::CollectionReconciler;
use crate::registry::BuildContext;

const DEFAULT_EVENT_TYPES: &[&str] = &["object-created:*"];

/// `notification-entry`: one prefix-addressed entry in a bucket's
/// notification collection.
pub struct BucketNotificationEntry {
    reconciler: CollectionReconciler,
    entry: NotificationEntry,
    key: String,
    prior_key: String,
}

fn prefix_or_empty(entry: &NotificationEntry) -> Option<String> {
    Some(entry.prefix_value().unwrap_or("").to_owned())
}

fn filter_rules(prefix: Option<&str>, suffix: Option<&str>) -> Vec<FilterRule> {
    let mut rules = Vec::new();
    if let Some(value) = prefix {
        rules.push(FilterRule {
            name: "Prefix".to_owned(),
            value: value.to_owned(),
        });
    }
    if let Some(value) = suffix {
        rules.push(FilterRule {
            name: "Suffix".to_owned(),
            value: value.to_owned(),
        });
    }
    rules
}

fn event_types(bag: &Map<String, Value>) -> Result<Vec<String>> {
    if bag.get("EventTypes").map_or(true, Value::is_null) {
        return Ok(DEFAULT_EVENT_TYPES.iter().map(|s| (*s).to_owned()).collect());
    }
    props::required_str_array(bag, "EventTypes")
}

impl BucketNotificationEntry {
    /// Build from a validated event.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let desired = ctx.event.desired_properties;
        let bucket = props::required_str(desired, "Bucket")?;
        let region = props::required_str(desired, "Region")?;
        let topic_address = props::required_str(desired, "TopicAddress")?;
        let prefix = props::optional_str(desired, "Prefix");
        let suffix = props::optional_str(desired, "Suffix");

        let key = prefix.clone().unwrap_or_default();
        // A prior bag with no `Prefix` legitimately keys the empty string;
        // only an absent bag falls back to the desired key.
        let prior_key = match ctx.event.prior_properties {
            Some(bag) => props::optional_str(bag, "Prefix").unwrap_or_default(),
            None => key.clone(),
        };

        let entry = NotificationEntry {
            id: None,
            topic_address,
            event_types: event_types(desired)?,
            filter_rules: filter_rules(prefix.as_deref(), suffix.as_deref()),
        };
        Ok(Self {
            reconciler: CollectionReconciler::new(
                ctx.capabilities.bucket_notifications(&region),
                bucket,
                prefix_or_empty,
            ),
            entry,
            key,
            prior_key,
        })
    }
}

#[async_trait]
impl ResourceHandler for BucketNotificationEntry {
    async fn create(&self) -> Result<HandlerOutcome> {
        self.reconciler.create(&self.key, self.entry.clone()).await?;
        Ok(HandlerOutcome::none())
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        self.reconciler
            .modify(&self.prior_key, &self.key, self.entry.clone())
            .await?;
        Ok(HandlerOutcome::none())
    }

    async fn remove(&self) -> Result<()> {
        // Mirrors modify: the entry to clear lives under the key it was
        // created with, not the desired one.
        self.reconciler.remove(&self.prior_key).await
    }
}
