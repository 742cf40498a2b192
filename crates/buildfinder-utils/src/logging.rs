//! Structured logging setup for `buildfinder`.
//!
//! A thin wrapper over `tracing-subscriber` so the CLI and doctor binaries
//! share one initialization path. Resolver components only ever call
//! `tracing::{debug,info,warn,error}!` directly; this module is the only
//! place a global subscriber is installed.

use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` if set; otherwise defaults to `buildfinder=info,warn`.
/// When `json` is true, emits newline-delimited JSON records instead of the
/// human-readable compact format, for machine consumption in CI pipelines.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("buildfinder=info,warn"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(use_color())
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}
