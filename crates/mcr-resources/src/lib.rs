//! ---
//! mcr_section: "04-resource-handlers"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Resource handler contract and per-kind reconciliation."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Resource handlers for the custom-resource lifecycle engine.
//!
//! Every resource kind implements the same three-operation
//! [`ResourceHandler`] contract; the [`registry::KindRegistry`] maps
//! kind names to constructor functions so the dispatcher never needs a type
//! per kind. Kinds whose backing state is a named-entry collection share the
//! reconciliation cycle in [`reconcile`].

#![warn(missing_docs)]

pub mod generic;
pub mod handler;
pub mod kinds;
pub mod props;
pub mod reconcile;
pub mod registry;

pub use generic::{GenericProperties, GenericResource, GenericResourceBuilder};
pub use handler::{HandlerError, HandlerOutcome, ResourceHandler, Result};
pub use registry::{BuildContext, KindRegistry};
