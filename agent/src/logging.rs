//! Diagnostic tracing for `goal-agent`.
//!
//! Tracing goes to stderr so that `run` can print one agent log line per tick
//! on stdout and `status` can print clean JSON. The persisted
//! `AgentState::log` is the product trace and does not depend on `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparseable: only degraded paths
/// (estimate fallbacks, retries, discarded state files) are shown.
pub const DEFAULT_FILTER: &str = "warn";

/// Build the filter from a `RUST_LOG`-style directive string.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the stderr subscriber.
///
/// `RUST_LOG=goal_agent=info` shows each node and the store;
/// `RUST_LOG=goal_agent=debug` adds role switches and completion sizes.
pub fn init() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(filter_from(directives.as_deref()))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
