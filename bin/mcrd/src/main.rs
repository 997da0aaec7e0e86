//! ---
//! mcr_section: "01-core-functionality"
//! mcr_subsection: "binary"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Binary entrypoint for the MCR daemon."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mcr_cloud::MemoryCloud;
use mcr_common::config::AppConfig;
use mcr_common::logging::init_tracing;
use mcr_dispatch::{DispatchOutcome, Dispatcher};
use mcr_events::InvocationEvent;
use mcr_resources::KindRegistry;
use mcr_response::ResponseTransmitter;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "MCR daemon: dispatches one custom-resource invocation event",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Read the invocation event from FILE instead of stdin"
    )]
    event: Option<PathBuf>,

    #[arg(long, help = "Override the configured default region")]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/mcr.toml"));
    candidates.push(PathBuf::from("configs/mcr.dev.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(region) = cli.region {
        config.default_region = region;
    }
    config.validate()?;
    init_tracing("mcrd", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using defaults"),
    }

    let raw = match &cli.event {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading invocation event from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading invocation event from stdin")?;
            buf
        }
    };
    let event = InvocationEvent::from_json(&raw).context("parsing invocation event")?;

    // The daemon runs against the in-memory capability set; wiring a real
    // provider means implementing the mcr-cloud traits and swapping this
    // value.
    let capabilities = Arc::new(MemoryCloud::new());
    let transmitter = ResponseTransmitter::new(
        config.delivery.max_attempts,
        config.delivery.http_timeout,
    )
    .context("constructing the response transmitter")?;
    let dispatcher = Dispatcher::new(
        KindRegistry::with_defaults(),
        capabilities,
        transmitter,
        config.default_region.clone(),
    );

    match dispatcher
        .dispatch(&event)
        .await
        .context("delivering the result envelope")?
    {
        DispatchOutcome::NonConformant => {
            warn!("event was not a protocol-conformant invocation; nothing dispatched");
        }
        DispatchOutcome::Delivered { status, attempts } => {
            info!(status, attempts, "result envelope delivered");
        }
    }
    Ok(())
}
