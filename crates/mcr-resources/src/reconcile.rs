//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Named-collection reconciliation.
//!
//! Kinds whose backing state is a list of [`NotificationEntry`] rather than
//! a singleton share this fetch → locate-by-key → merge-or-append/remove →
//! write-back cycle. Entries are addressed only by key, never by position:
//! concurrent external mutation between fetch and write-back can reorder or
//! remove unrelated entries, and the write-back preserves the relative order
//! of everything it did not touch.

use std::sync::Arc;

use mcr_cloud::{BucketNotificationApi, NotificationEntry};
use tracing::debug;

use crate::handler::Result;

/// Key extraction used to address entries within the collection.
pub type KeyFn = fn(&NotificationEntry) -> Option<String>;

/// Address entries by their explicit `Id` field.
pub fn id_key(entry: &NotificationEntry) -> Option<String> {
    entry.id.clone()
}

/// Address entries by the value of their `Prefix` filter rule (legacy
/// unkeyed kind).
pub fn prefix_key(entry: &NotificationEntry) -> Option<String> {
    entry.prefix_value().map(str::to_owned)
}

/// First entry matching `key`. Uses an explicit found-flag so index 0 is a
/// legitimate match.
fn locate(entries: &[NotificationEntry], key_of: KeyFn, key: &str) -> Option<usize> {
    entries
        .iter()
        .position(|entry| key_of(entry).as_deref() == Some(key))
}

/// Replace the first entry matching `key` in place, or append when no entry
/// matches. Replacing in place keeps create idempotent under retried
/// invocations.
pub fn upsert(entries: &mut Vec<NotificationEntry>, key_of: KeyFn, key: &str, entry: NotificationEntry) {
    match locate(entries, key_of, key) {
        Some(index) => entries[index] = entry,
        None => entries.push(entry),
    }
}

/// Remove every entry matching `key`, returning how many were dropped.
/// Duplicate keys are undefined external state; removing all of them is the
/// only convergent choice on Delete.
pub fn remove_all(entries: &mut Vec<NotificationEntry>, key_of: KeyFn, key: &str) -> usize {
    let before = entries.len();
    entries.retain(|entry| key_of(entry).as_deref() != Some(key));
    before - entries.len()
}

/// One read-modify-write cycle against a bucket's notification collection.
///
/// The reconciler exclusively owns the cycle for the duration of one
/// lifecycle call; there is no cross-invocation locking and no version
/// token check before write-back (the orchestrator serializes operations
/// per external object).
pub struct CollectionReconciler {
    api: Arc<dyn BucketNotificationApi>,
    bucket: String,
    key_of: KeyFn,
}

impl CollectionReconciler {
    /// Bind a reconciler to one bucket and one key addressing scheme.
    pub fn new(api: Arc<dyn BucketNotificationApi>, bucket: impl Into<String>, key_of: KeyFn) -> Self {
        Self {
            api,
            bucket: bucket.into(),
            key_of,
        }
    }

    /// Merge `entry` into the collection under `key`. An absent
    /// configuration object is treated as empty.
    pub async fn create(&self, key: &str, entry: NotificationEntry) -> Result<()> {
        let mut config = self
            .api
            .fetch_notification_config(&self.bucket)
            .await?
            .unwrap_or_default();
        upsert(&mut config.entries, self.key_of, key, entry);
        debug!(bucket = %self.bucket, key, entries = config.entries.len(), "writing back collection");
        Ok(self
            .api
            .write_notification_config(&self.bucket, &config)
            .await?)
    }

    /// Remove the entry keyed by the prior identity, then merge the desired
    /// entry. When prior and desired keys are equal this reduces to an
    /// in-place replace. The write-back happens unconditionally.
    pub async fn modify(&self, prior_key: &str, key: &str, entry: NotificationEntry) -> Result<()> {
        let mut config = self
            .api
            .fetch_notification_config(&self.bucket)
            .await?
            .unwrap_or_default();
        if prior_key != key {
            remove_all(&mut config.entries, self.key_of, prior_key);
        }
        upsert(&mut config.entries, self.key_of, key, entry);
        Ok(self
            .api
            .write_notification_config(&self.bucket, &config)
            .await?)
    }

    /// Remove every entry keyed by `key`. When no configuration object
    /// exists at all the write is skipped, so a delete never creates an
    /// empty configuration where none existed.
    pub async fn remove(&self, key: &str) -> Result<()> {
        match self.api.fetch_notification_config(&self.bucket).await? {
            None => {
                debug!(bucket = %self.bucket, key, "no configuration object; nothing to delete");
                Ok(())
            }
            Some(mut config) => {
                let dropped = remove_all(&mut config.entries, self.key_of, key);
                debug!(bucket = %self.bucket, key, dropped, "writing back collection after removal");
                Ok(self
                    .api
                    .write_notification_config(&self.bucket, &config)
                    .await?)
            }
        }
    }
}
