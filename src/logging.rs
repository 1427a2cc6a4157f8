//! Console logging via `tracing-subscriber`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a CLI level is given.
pub const DEFAULT_FILTER: &str = "info";

/// Filter for a CLI level such as `debug`, scoped to this crate so that
/// dependencies stay at `warn`.
pub fn level_filter(level: &str) -> String {
    format!("warn,pyrrhos_map={level},debug_fields={level}")
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over `level`.
/// Call once per process.
pub fn init_logging(level: Option<&str>) {
    let filter_str = level.map(level_filter).unwrap_or_else(|| DEFAULT_FILTER.to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}

pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
