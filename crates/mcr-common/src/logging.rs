//! ---
//! mcr_section: "01-core-functionality"
//! mcr_subsection: "module"
//! mcr_type: "source"
//! mcr_scope: "code"
//! mcr_description: "Shared primitives and utilities for the handler runtime."
//! mcr_version: "v0.0.0-prealpha"
//! mcr_owner: "tbd"
//! ---
//! Tracing initialisation: structured JSON to stdout plus a rolling daily
//! file for postmortem analysis of failed stack operations.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "MCR_LOG";

// Dropping the guards would lose buffered lines on shutdown, so they live
// for the process.
static WORKER_GUARDS: OnceCell<Vec<WorkerGuard>> = OnceCell::new();

/// Filter precedence: an explicit `MCR_LOG` directive, then `RUST_LOG`,
/// then `info`. An unparsable directive falls back to `info` rather than
/// silencing the process.
fn resolve_filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to info logging");
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Initialize the tracing subscriber based on configuration and environment
/// variables.
///
/// Both sinks emit structured JSON: stdout is what the invocation harness
/// captures, the rolling daily file under `config.directory` is what an
/// operator greps after the fact. The file is named after `service_name`
/// unless the configuration pins a prefix. Safe to call more than once;
/// only the first call installs a subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config
        .file_prefix
        .clone()
        .unwrap_or_else(|| service_name.to_owned());

    let file_appender = daily(&config.directory, format!("{prefix}.log"));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = WORKER_GUARDS.set(vec![file_guard, stdout_guard]);

    let directive = std::env::var(LOG_ENV).ok();
    let filter = resolve_filter(directive.as_deref());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(stdout_writer);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(service = %service_name, log_dir = %config.directory.display(), "tracing initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directive_wins() {
        let filter = resolve_filter(Some("debug"));
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn invalid_directive_falls_back_to_info() {
        let filter = resolve_filter(Some("handler=trace=oops"));
        assert_eq!(filter.to_string(), "info");
    }
}
