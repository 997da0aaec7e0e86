//! ---
//! mcr_section: "06-lifecycle-dispatch"
//! mcr_subsection: "integration-test"
//! mcr_type: "test"
//! mcr_scope: "test"
//! mcr_description: "Dispatcher state machine against the in-memory cloud and a loopback callback."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Dispatcher behaviour end to end: in-memory capability set on one side,
//! a loopback callback receiver on the other.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::put;
use axum::Router;
use mcr_cloud::MemoryCloud;
use mcr_dispatch::{DispatchOutcome, Dispatcher};
use mcr_events::InvocationEvent;
use mcr_resources::KindRegistry;
use mcr_response::ResponseTransmitter;
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Loopback callback endpoint capturing every envelope body it receives.
async fn callback_receiver() -> (String, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
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
    let address = format!("http://{}/callback", listener.local_addr().expect("addr"));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (address, rx)
}

fn dispatcher(cloud: &MemoryCloud) -> Dispatcher {
    Dispatcher::new(
        KindRegistry::with_defaults(),
        Arc::new(cloud.clone()),
        ResponseTransmitter::new(5, Duration::from_secs(2)).expect("client"),
        "us-east-1",
    )
}

fn event(raw: Value) -> InvocationEvent {
    serde_json::from_value(raw).expect("event")
}

async fn received(rx: &mut mpsc::UnboundedReceiver<String>) -> Value {
    let body = rx.recv().await.expect("an envelope was delivered");
    serde_json::from_str(&body).expect("envelope is JSON")
}

#[tokio::test]
async fn create_reports_success_with_attributes() {
    let cloud = MemoryCloud::new();
    let (address, mut rx) = callback_receiver().await;
    let outcome = dispatcher(&cloud)
        .dispatch(&event(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::log-group",
            "ResourceProperties": { "LogGroupName": "/app/web" },
            "ResponseURL": address,
            "StackId": "arn:cloud:stacks:us-east-1:123:stack/demo",
            "LogicalResourceId": "Logs",
            "RequestId": "req-1"
        })))
        .await
        .expect("dispatch");
    assert_eq!(
        outcome,
        DispatchOutcome::Delivered {
            status: 200,
            attempts: 1
        }
    );
    assert!(cloud.has_log_group("/app/web"));

    let envelope = received(&mut rx).await;
    assert_eq!(envelope["Status"], json!("SUCCESS"));
    assert_eq!(envelope["Data"]["LogGroupName"], json!("/app/web"));
    assert_eq!(envelope["StackId"], json!("arn:cloud:stacks:us-east-1:123:stack/demo"));
    let physical_id = envelope["PhysicalResourceId"].as_str().expect("id");
    assert_eq!(physical_id.len(), 32, "generated id for an id-less Create");
}

#[tokio::test]
async fn validation_failure_is_reported_without_external_calls() {
    let cloud = MemoryCloud::new();
    let (address, mut rx) = callback_receiver().await;
    dispatcher(&cloud)
        .dispatch(&event(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::message-publish",
            "ResourceProperties": { "Subject": "deployed" },
            "ResponseURL": address,
            "StackId": "arn:cloud:stacks:us-east-1:123:stack/demo",
            "LogicalResourceId": "Announce",
            "RequestId": "req-2"
        })))
        .await
        .expect("dispatch");
    let envelope = received(&mut rx).await;
    assert_eq!(envelope["Status"], json!("FAILED"));
    assert_eq!(envelope["Reason"], json!("Missing Parameter TopicAddress"));
    assert!(cloud.published().is_empty(), "no external call was made");
}

#[tokio::test]
async fn unknown_kind_is_reported_failed() {
    let cloud = MemoryCloud::new();
    let (address, mut rx) = callback_receiver().await;
    dispatcher(&cloud)
        .dispatch(&event(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::not-a-kind",
            "ResourceProperties": {},
            "ResponseURL": address,
            "StackId": "arn:cloud:stacks:us-east-1:123:stack/demo",
            "LogicalResourceId": "Mystery",
            "RequestId": "req-3"
        })))
        .await
        .expect("dispatch");
    let envelope = received(&mut rx).await;
    assert_eq!(envelope["Status"], json!("FAILED"));
    assert_eq!(envelope["Reason"], json!("Unknown resource kind: not-a-kind"));
}

#[tokio::test]
async fn unsupported_action_is_reported_failed() {
    let cloud = MemoryCloud::new();
    let (address, mut rx) = callback_receiver().await;
    dispatcher(&cloud)
        .dispatch(&event(json!({
            "RequestType": "Upsert",
            "ResourceType": "Custom::log-group",
            "ResourceProperties": { "LogGroupName": "/app/web" },
            "ResponseURL": address,
            "StackId": "arn:cloud:stacks:us-east-1:123:stack/demo",
            "LogicalResourceId": "Logs",
            "RequestId": "req-4"
        })))
        .await
        .expect("dispatch");
    let envelope = received(&mut rx).await;
    assert_eq!(envelope["Status"], json!("FAILED"));
    assert_eq!(envelope["Reason"], json!("unsupported lifecycle action: Upsert"));
    assert!(!cloud.has_log_group("/app/web"));
}

#[tokio::test]
async fn non_conformant_event_is_dropped_silently() {
    let cloud = MemoryCloud::new();
    let (_address, mut rx) = callback_receiver().await;
    let outcome = dispatcher(&cloud)
        .dispatch(&event(json!({
            "RequestType": "Create",
            "ResourceType": "Custom::log-group",
            "ResourceProperties": { "LogGroupName": "/app/web" }
        })))
        .await
        .expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::NonConformant);
    assert!(rx.try_recv().is_err(), "nothing was delivered");
    assert!(!cloud.has_log_group("/app/web"), "no side effect occurred");
}

#[tokio::test]
async fn delete_echoes_the_event_physical_id() {
    let cloud = MemoryCloud::new();
    cloud.seed_log_group("/app/web");
    let (address, mut rx) = callback_receiver().await;
    dispatcher(&cloud)
        .dispatch(&event(json!({
            "RequestType": "Delete",
            "ResourceType": "Custom::log-group",
            "ResourceProperties": { "LogGroupName": "/app/web" },
            "ResponseURL": address,
            "StackId": "arn:cloud:stacks:us-east-1:123:stack/demo",
            "LogicalResourceId": "Logs",
            "RequestId": "req-5",
            "PhysicalResourceId": "phys-9"
        })))
        .await
        .expect("dispatch");
    let envelope = received(&mut rx).await;
    assert_eq!(envelope["Status"], json!("SUCCESS"));
    assert_eq!(envelope["PhysicalResourceId"], json!("phys-9"));
    assert!(cloud.has_log_group("/app/web"), "log groups outlive their stack");
}
