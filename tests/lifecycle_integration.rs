//! ---
//! mcr_section: "07-testing-qa"
//! mcr_subsection: "integration-test"
//! mcr_type: "test"
//! mcr_scope: "test"
//! mcr_description: "Full create/update/delete lifecycles through the dispatcher."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Whole-lifecycle scenarios: events go in through the dispatcher, result
//! envelopes come back over a loopback callback endpoint, and the in-memory
//! external system is inspected between steps.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::put;
use axum::Router;
use mcr_cloud::MemoryCloud;
use mcr_dispatch::Dispatcher;
use mcr_events::InvocationEvent;
use mcr_resources::KindRegistry;
use mcr_response::ResponseTransmitter;
use serde_json::{json, Value};
use tokio::sync::mpsc;

struct Harness {
    cloud: MemoryCloud,
    dispatcher: Dispatcher,
    callback_address: String,
    envelopes: mpsc::UnboundedReceiver<String>,
}

impl Harness {
    async fn start() -> Self {
        let (tx, envelopes) = mpsc::unbounded_channel();
        let app = Router::new()
            .route(
                "/callback",
                put(
                    |State(tx): State<mpsc::UnboundedSender<String>>, body: String| async move {
                        let _ = tx.send(body);
                    },
                ),
            )
            .with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let callback_address =
            format!("http://{}/callback", listener.local_addr().expect("addr"));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let cloud = MemoryCloud::new();
        let dispatcher = Dispatcher::new(
            KindRegistry::with_defaults(),
            Arc::new(cloud.clone()),
            ResponseTransmitter::new(5, Duration::from_secs(2)).expect("client"),
            "us-east-1",
        );
        Self {
            cloud,
            dispatcher,
            callback_address,
            envelopes,
        }
    }

    /// Dispatch one event and return the delivered envelope.
    async fn run(&mut self, mut raw: Value) -> Value {
        raw["ResponseURL"] = json!(self.callback_address);
        raw["StackId"] = json!("arn:cloud:stacks:us-east-1:123:stack/demo");
        raw["RequestId"] = json!("req-1");
        let event: InvocationEvent = serde_json::from_value(raw).expect("event");
        self.dispatcher.dispatch(&event).await.expect("dispatch");
        let body = self.envelopes.recv().await.expect("envelope delivered");
        serde_json::from_str(&body).expect("envelope is JSON")
    }
}

const TOPIC: &str = "arn:cloud:topics:us-east-1:123:alerts";

#[tokio::test]
async fn endpoint_subscription_full_lifecycle() {
    let mut harness = Harness::start().await;

    let created = harness
        .run(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::endpoint-subscription",
            "LogicalResourceId": "AlertHook",
            "ResourceProperties": {
                "TopicAddress": TOPIC,
                "Protocol": "https",
                "Endpoint": "https://hooks.example.com/v1"
            }
        }))
        .await;
    assert_eq!(created["Status"], json!("SUCCESS"));
    let physical_id = created["PhysicalResourceId"].as_str().expect("id").to_owned();
    assert_eq!(
        harness.cloud.subscription_endpoints(TOPIC),
        vec!["https://hooks.example.com/v1".to_owned()]
    );

    let updated = harness
        .run(json!({
            "RequestType": "Update",
            "ResourceType": "Custom::endpoint-subscription",
            "LogicalResourceId": "AlertHook",
            "PhysicalResourceId": physical_id,
            "ResourceProperties": {
                "TopicAddress": TOPIC,
                "Protocol": "https",
                "Endpoint": "https://hooks.example.com/v2"
            },
            "OldResourceProperties": {
                "TopicAddress": TOPIC,
                "Protocol": "https",
                "Endpoint": "https://hooks.example.com/v1"
            }
        }))
        .await;
    assert_eq!(updated["Status"], json!("SUCCESS"));
    assert_eq!(
        harness.cloud.subscription_endpoints(TOPIC),
        vec!["https://hooks.example.com/v2".to_owned()]
    );

    let deleted = harness
        .run(json!({
            "RequestType": "Delete",
            "ResourceType": "Custom::endpoint-subscription",
            "LogicalResourceId": "AlertHook",
            "PhysicalResourceId": updated["PhysicalResourceId"],
            "ResourceProperties": {
                "TopicAddress": TOPIC,
                "Protocol": "https",
                "Endpoint": "https://hooks.example.com/v2"
            }
        }))
        .await;
    assert_eq!(deleted["Status"], json!("SUCCESS"));
    assert!(harness.cloud.subscription_endpoints(TOPIC).is_empty());
}

#[tokio::test]
async fn notification_entries_coexist_and_rename_cleanly() {
    let mut harness = Harness::start().await;

    for id in ["uploads", "archive"] {
        let envelope = harness
            .run(json!({
                "RequestType": "Create",
                "ResourceType": "Custom::notification-topic-entry",
                "LogicalResourceId": "Notify",
                "ResourceProperties": {
                    "Bucket": "data",
                    "Region": "us-east-1",
                    "Id": id,
                    "TopicAddress": TOPIC,
                    "EventTypes": ["object-created:*"]
                }
            }))
            .await;
        assert_eq!(envelope["Status"], json!("SUCCESS"));
    }
    let config = harness.cloud.notification_config("data").expect("config");
    assert_eq!(config.entries.len(), 2);

    // Renaming one entry must not disturb its sibling.
    harness
        .run(json!({
            "RequestType": "Update",
            "ResourceType": "Custom::notification-topic-entry",
            "LogicalResourceId": "Notify",
            "PhysicalResourceId": "phys-1",
            "ResourceProperties": {
                "Bucket": "data",
                "Region": "us-east-1",
                "Id": "uploads-v2",
                "TopicAddress": TOPIC,
                "EventTypes": ["object-created:*"]
            },
            "OldResourceProperties": { "Id": "uploads" }
        }))
        .await;
    let config = harness.cloud.notification_config("data").expect("config");
    let ids: Vec<_> = config
        .entries
        .iter()
        .filter_map(|entry| entry.id.as_deref())
        .collect();
    assert_eq!(ids, vec!["archive", "uploads-v2"]);

    harness
        .run(json!({
            "RequestType": "Delete",
            "ResourceType": "Custom::notification-topic-entry",
            "LogicalResourceId": "Notify",
            "PhysicalResourceId": "phys-1",
            "ResourceProperties": {
                "Bucket": "data",
                "Region": "us-east-1",
                "Id": "uploads-v2",
                "TopicAddress": TOPIC,
                "EventTypes": ["object-created:*"]
            }
        }))
        .await;
    let config = harness.cloud.notification_config("data").expect("config");
    let ids: Vec<_> = config
        .entries
        .iter()
        .filter_map(|entry| entry.id.as_deref())
        .collect();
    assert_eq!(ids, vec!["archive"]);
}

#[tokio::test]
async fn fleet_update_ratchets_and_replaces() {
    let mut harness = Harness::start().await;

    let created = harness
        .run(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::compute-fleet-request",
            "LogicalResourceId": "BatchFleet",
            "ResourceProperties": {
                "Region": "us-east-1",
                "FleetSpec": { "TargetCapacity": "3", "Price": "0.07" }
            }
        }))
        .await;
    assert_eq!(created["Status"], json!("SUCCESS"));
    let first_id = created["PhysicalResourceId"].as_str().expect("id").to_owned();
    let spec = harness.cloud.fleet_spec(&first_id).expect("spec stored");
    assert_eq!(
        spec["TargetCapacity"],
        json!(3),
        "stringified capacity was renormalised"
    );

    let updated = harness
        .run(json!({
            "RequestType": "Update",
            "ResourceType": "Custom::compute-fleet-request",
            "LogicalResourceId": "BatchFleet",
            "PhysicalResourceId": first_id,
            "ResourceProperties": {
                "Region": "us-east-1",
                "FleetSpec": { "TargetCapacity": "2", "Price": "0.07" }
            },
            "OldResourceProperties": {
                "Region": "us-east-1",
                "FleetSpec": { "TargetCapacity": "3", "Price": "0.07" }
            }
        }))
        .await;
    let second_id = updated["PhysicalResourceId"].as_str().expect("id").to_owned();
    assert_ne!(second_id, first_id, "update replaces the request");
    let spec = harness.cloud.fleet_spec(&second_id).expect("spec stored");
    assert_eq!(
        spec["TargetCapacity"],
        json!(3),
        "capacity never shrinks without an override"
    );
    assert_eq!(harness.cloud.fleet_active(&first_id), Some(false));
    assert_eq!(
        harness.cloud.fleet_workers_terminated(&first_id),
        Some(false),
        "cancellation is soft"
    );

    harness
        .run(json!({
            "RequestType": "Delete",
            "ResourceType": "Custom::compute-fleet-request",
            "LogicalResourceId": "BatchFleet",
            "PhysicalResourceId": second_id,
            "ResourceProperties": {
                "Region": "us-east-1",
                "FleetSpec": { "TargetCapacity": "2", "Price": "0.07" }
            }
        }))
        .await;
    assert!(harness.cloud.active_fleet_ids().is_empty());
}

#[tokio::test]
async fn lookup_kinds_surface_data_without_side_effects() {
    let mut harness = Harness::start().await;
    harness.cloud.seed_stack(
        "network-base",
        [("VpcId".to_owned(), "net-12".to_owned())]
            .into_iter()
            .collect(),
    );

    let envelope = harness
        .run(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::stack-outputs",
            "LogicalResourceId": "BaseOutputs",
            "ResourceProperties": { "StackName": "network-base" }
        }))
        .await;
    assert_eq!(envelope["Status"], json!("SUCCESS"));
    assert_eq!(envelope["Data"]["VpcId"], json!("net-12"));

    let deleted = harness
        .run(json!({
            "RequestType": "Delete",
            "ResourceType": "Custom::stack-outputs",
            "LogicalResourceId": "BaseOutputs",
            "PhysicalResourceId": "phys-1",
            "ResourceProperties": { "StackName": "network-base" }
        }))
        .await;
    assert_eq!(deleted["Status"], json!("SUCCESS"), "lookup deletion is a no-op");
}

#[tokio::test]
async fn dependency_failure_reports_the_provider_message() {
    let mut harness = Harness::start().await;
    harness.cloud.mark_topic_missing(TOPIC);

    let envelope = harness
        .run(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::message-publish",
            "LogicalResourceId": "Announce",
            "ResourceProperties": {
                "TopicAddress": TOPIC,
                "Subject": "deployed",
                "Body": "stack is live"
            }
        }))
        .await;
    assert_eq!(envelope["Status"], json!("FAILED"));
    assert_eq!(
        envelope["Reason"],
        json!(format!("topic {TOPIC} not found")),
        "the external system's wording is propagated verbatim"
    );
}
