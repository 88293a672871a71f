//! Graphite plaintext reporting: snapshot → stats → lines → TCP.

pub mod extract;
pub mod format;
pub mod reporter;
pub mod snapshot;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::FlushError;

pub use extract::{percentile_suffix, Extractor, Stat, Value};
pub use format::Line;
pub use reporter::{Batch, FlushReport, Reporter};
pub use snapshot::{snapshot, MetricSnapshot};

/// Flush once over a fresh connection, then close it.
pub async fn once(config: &Config) -> Result<FlushReport, FlushError> {
    let mut reporter = Reporter::new(config.clone());
    let result = reporter.flush_once().await;
    reporter.close().await;
    result
}

/// Report on `config.flush_interval()` until `cancel` fires.
pub async fn run(config: Config, cancel: CancellationToken) {
    Reporter::new(config).run(cancel).await;
}

/// `run` on a background task.
pub fn spawn(config: Config, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run(config, cancel))
}
