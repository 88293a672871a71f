//! Log setup for the reporter binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a stdout subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies
/// (e.g. `"info"` or `"graphite_reporter=debug"`).
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A host application may already have installed its own subscriber
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}
