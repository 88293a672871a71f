//! Periodic Graphite reporter for an in-process metrics registry.
//!
//! Application code updates counters, gauges, meters, histograms and
//! timers in a [`Registry`]; a [`Reporter`] snapshots it on a fixed
//! interval and writes one `prefix.name.stat value timestamp` line per
//! derived value to a Graphite plaintext endpoint.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use graphite_reporter::{Config, DurationUnit, Registry, CancellationToken};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(Registry::new());
//! let config = Config::builder("127.0.0.1:2003", registry.clone())
//!     .flush_interval(Duration::from_secs(10))
//!     .prefix("myapp")
//!     .duration_unit(DurationUnit::Milliseconds)
//!     .percentiles(vec![0.5, 0.99])
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! let reporter = graphite_reporter::spawn(config, cancel.clone());
//!
//! registry.get_or_register_counter("requests")?.inc(1);
//!
//! cancel.cancel();
//! reporter.await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graphite;
pub mod logging;
pub mod registry;

pub use config::{Config, ConfigBuilder, DurationUnit, ReporterSettings};
pub use error::{ConfigError, FlushError, RegistryError};
pub use graphite::{once, run, spawn, Batch, FlushReport, MetricSnapshot, Reporter};
pub use registry::{
    Counter, Gauge, GaugeF64, HdrSample, Histogram, Meter, Metric, MetricKind, Registry, Timer,
    UniformSample,
};
pub use tokio_util::sync::CancellationToken;
