//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Built-in resource kinds.

mod fleet;
mod inventory;
mod log_group;
mod lookup;
mod message;
mod notification;
mod notification_topic;
mod subscription;

pub use fleet::ComputeFleetRequest;
pub use inventory::CollectionInventoryEntry;
pub use log_group::LogGroup;
pub use lookup::{DefaultNetwork, StackOutputsLookup, StreamLabel};
pub use message::MessagePublish;
pub use notification::BucketNotificationEntry;
pub use notification_topic::NotificationTopicEntry;
pub use subscription::EndpointSubscription;
