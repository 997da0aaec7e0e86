//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Closure-built resource kind.
//!
//! Not every custom resource deserves its own type: a one-off kind can be
//! assembled from up to four function values (create, modify, remove,
//! validate) and still satisfy the full [`ResourceHandler`] contract.
//! Omitted operations default to success with no outcome, which is the
//! correct behaviour for lookup-style and fire-and-forget kinds.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::handler::{HandlerOutcome, ResourceHandler, Result};

/// Owned snapshot of the event data a generic operation may inspect.
#[derive(Debug, Clone, Default)]
pub struct GenericProperties {
    /// Desired property bag.
    pub desired: Map<String, Value>,
    /// Prior property bag, when the event carried one.
    pub prior: Option<Map<String, Value>>,
    /// Physical id from the event, when present.
    pub physical_id: Option<String>,
}

type OperationFn =
    Arc<dyn Fn(Arc<GenericProperties>) -> BoxFuture<'static, Result<HandlerOutcome>> + Send + Sync>;
type TeardownFn =
    Arc<dyn Fn(Arc<GenericProperties>) -> BoxFuture<'static, Result<()>> + Send + Sync>;
type ValidateFn = Box<dyn Fn(&GenericProperties) -> Result<()> + Send + Sync>;

/// Builder for a [`GenericResource`].
#[derive(Default)]
pub struct GenericResourceBuilder {
    create: Option<OperationFn>,
    modify: Option<OperationFn>,
    remove: Option<TeardownFn>,
    validate: Option<ValidateFn>,
}

impl GenericResourceBuilder {
    /// Start an empty builder; every operation defaults to a successful
    /// no-op.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation run on Create.
    pub fn on_create<F, Fut>(mut self, operation: F) -> Self
    where
        F: Fn(Arc<GenericProperties>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutcome>> + Send + 'static,
    {
        self.create = Some(Arc::new(move |props| Box::pin(operation(props))));
        self
    }

    /// Operation run on Update.
    pub fn on_modify<F, Fut>(mut self, operation: F) -> Self
    where
        F: Fn(Arc<GenericProperties>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutcome>> + Send + 'static,
    {
        self.modify = Some(Arc::new(move |props| Box::pin(operation(props))));
        self
    }

    /// Operation run on Delete.
    pub fn on_remove<F, Fut>(mut self, operation: F) -> Self
    where
        F: Fn(Arc<GenericProperties>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.remove = Some(Arc::new(move |props| Box::pin(operation(props))));
        self
    }

    /// Property-bag validation run once at build time, before any
    /// operation. A failure here means no external call is ever made.
    pub fn validate<F>(mut self, check: F) -> Self
    where
        F: Fn(&GenericProperties) -> Result<()> + Send + Sync + 'static,
    {
        self.validate = Some(Box::new(check));
        self
    }

    /// Run validation and produce the handler.
    pub fn build(self, properties: GenericProperties) -> Result<GenericResource> {
        if let Some(check) = &self.validate {
            check(&properties)?;
        }
        Ok(GenericResource {
            properties: Arc::new(properties),
            create: self.create,
            modify: self.modify,
            remove: self.remove,
        })
    }
}

/// A resource kind assembled from function values.
pub struct GenericResource {
    properties: Arc<GenericProperties>,
    create: Option<OperationFn>,
    modify: Option<OperationFn>,
    remove: Option<TeardownFn>,
}

#[async_trait]
impl ResourceHandler for GenericResource {
    async fn create(&self) -> Result<HandlerOutcome> {
        match &self.create {
            Some(operation) => operation(Arc::clone(&self.properties)).await,
            None => Ok(HandlerOutcome::none()),
        }
    }

    async fn modify(&self) -> Result<HandlerOutcome> {
        match &self.modify {
            Some(operation) => operation(Arc::clone(&self.properties)).await,
            None => Ok(HandlerOutcome::none()),
        }
    }

    async fn remove(&self) -> Result<()> {
        match &self.remove {
            Some(operation) => operation(Arc::clone(&self.properties)).await,
            None => Ok(()),
        }
    }
}
