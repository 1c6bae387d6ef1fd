//! Tracing subscriber setup

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init() {
    if let Err(e) = try_init() {
        eprintln!("Logging already initialized: {}", e);
    }
}

pub fn try_init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter())
        .try_init()
}
