//! ---
//! mcr_section: "01-core-functionality"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Shared primitives and utilities for the handler runtime."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Shared primitives for the MCR workspace: configuration loading and
//! tracing initialisation consumed by the dispatcher and the daemon.

#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub use config::{AppConfig, DeliveryConfig, LoadedAppConfig, LoggingConfig};
pub use logging::init_tracing;
