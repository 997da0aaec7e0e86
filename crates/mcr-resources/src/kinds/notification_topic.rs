//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Named bucket notification entry, reconciled on an explicit `Id`.
//!
//! Many entries of this kind coexist on the same bucket; each lifecycle call
//! touches only the entry carrying its id. Creating an id that is already
//! present replaces the entry in place, which keeps a wholesale-retried
//! Create convergent instead of failing on its own partial work.

use async_trait::async_trait;
use mcr_cloud::{FilterRule, NotificationEntry};

use crate::handler::{HandlerOutcome, ResourceHandler, Result};
use crate::props;
use crate::reconcile::{self, CollectionReconciler};
use crate::registry::BuildContext;

/// `notification-topic-entry`: one id-addressed entry in a bucket's
/// notification collection.
pub struct NotificationTopicEntry {
    reconciler: CollectionReconciler,
    entry: NotificationEntry,
    id: String,
    prior_id: String,
}

impl NotificationTopicEntry {
    /// Build from a validated event.
    pub fn from_context(ctx: &BuildContext<'_>) -> Result<Self> {
        let desired = ctx.event.desired_properties;
        let bucket = props::required_str(desired, "Bucket")?;
        let region = props::required_str(desired, "Region")?;
        let id = props::required_str(desired, "Id")?;
        let topic_address = props::required_str(desired, "TopicAddress")?;
        let event_types = props::required_str_array(desired, "EventTypes")?;

        let mut filter_rules = Vec::new();
        if let Some(value) = props::optional_str(desired, "PrefixFilter") {
            filter_rules.push(FilterRule {
                name: "Prefix".to_owned(),
                value,
            });
        }
        if let Some(value) = props::optional_str(desired, "SuffixFilter") {
            filter_rules.push(FilterRule {
                name: "Suffix".to_owned(),
                value,
            });
        }

        // An Update that renames the entry must remove it under the id it
        // was created with.
        let prior_id = ctx
            .event
            .prior_properties
            .and_then(|bag| props::optional_str(bag, "Id"))
            .unwrap_or_else(|| id.clone());

        let entry = NotificationEntry {
            id: Some(id.clone()),
            topic_address,
            event_types,
            filter_rules,
        };
        Ok(Self {
            reconciler: CollectionReconciler::new(
                ctx.capabilities.bucket_notifications(&region),
                bucket,
                reconcile::id_key,
            ),
            entry,
            id,
            prior_id,
        })
    }
}

#[async_trait]
impl ResourceHandler for NotificationTopicEntry {
    async fn create(&self) -> Result<HandlerOutcome> {
        self.reconciler.create(&self.id, self.entry.clone()).await?;
        Ok(HandlerOutcome::none())
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        self.reconciler
            .modify(&self.prior_id, &self.id, self.entry.clone())
            .await?;
        Ok(HandlerOutcome::none())
    }

    async fn remove(&self) -> Result<()> {
        // A Delete that follows an id-changing replacement carries the old
        // id in the prior bag; that is the entry to clear.
        self.reconciler.remove(&self.prior_id).await
    }
}
