//! ---
//! rra_section: "01-core-functionality"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Shared primitives and utilities for the editor bridge."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "RRA_LOG";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static CONSOLE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available log formats for bridge binaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

fn env_filter(default_directive: &str) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to {} logging",
                LOG_ENV, err, default_directive
            );
            EnvFilter::new(default_directive)
        }),
        Err(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive)),
    }
}

/// Install a plain stderr subscriber suitable for the CLI and tests.
///
/// Repeated calls are harmless; only the first subscriber wins.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `RRA_LOG` overrides the filter (e.g. `info`, `rra_msg=trace`). When unset the
///   standard `RUST_LOG` variable is honoured, finally defaulting to `info`.
/// * Stderr receives structured JSON or pretty output depending on `format`, and a
///   daily rolling JSON file is written under `directory`. Stdout stays free for
///   command output.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config
        .file_prefix
        .clone()
        .unwrap_or_else(|| service_name.to_owned());

    let file_appender = daily(&config.directory, format!("{}.log", prefix));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());

    let _ = FILE_GUARD.set(file_guard);
    let _ = CONSOLE_GUARD.set(console_guard);

    let fmt_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(console_writer)
            .boxed(),
    };

    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(service = %service_name, log_dir = %config.directory.display(), format = ?config.format, "tracing initialised");
    Ok(())
}
