//! In-process metrics registry.
//!
//! Application code registers typed metric handles here and updates
//! them concurrently; the reporter only ever reads.

pub mod counter;
pub mod histogram;
pub mod meter;
pub mod sample;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RegistryError;

pub use counter::{Counter, Gauge, GaugeF64};
pub use histogram::{Histogram, Timer, TimerSnapshot};
pub use meter::{Meter, MeterSnapshot};
pub use sample::{HdrSample, Sample, SampleSnapshot, UniformSample};

// ─── Metric variants ─────────────────────────────────────────────

/// Kind tag of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    GaugeFloat64,
    Meter,
    Histogram,
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::GaugeFloat64 => "float gauge",
            Self::Meter => "meter",
            Self::Histogram => "histogram",
            Self::Timer => "timer",
        };
        f.write_str(name)
    }
}

/// Shared handle to a registered metric.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeFloat64(Arc<GaugeF64>),
    Meter(Arc<Meter>),
    Histogram(Arc<Histogram>),
    Timer(Arc<Timer>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::GaugeFloat64(_) => MetricKind::GaugeFloat64,
            Self::Meter(_) => MetricKind::Meter,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Timer(_) => MetricKind::Timer,
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────

/// Name → metric map, safe to share between producers and the reporter.
///
/// Names are kept sorted, so iteration order is stable.
#[derive(Debug, Default)]
pub struct Registry {
    metrics: RwLock<BTreeMap<String, Metric>>,
}

/// Generates `get_or_register_*` for one variant.
macro_rules! get_or_register {
    ($(#[$doc:meta])* $fn:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $fn(&self, name: &str) -> Result<Arc<$ty>, RegistryError> {
            match self.get_or_insert_with(name, || Metric::$variant(Arc::new(<$ty>::default()))) {
                Metric::$variant(m) => Ok(m),
                other => Err(RegistryError::KindMismatch {
                    name: name.to_string(),
                    expected: MetricKind::$variant,
                    found: other.kind(),
                }),
            }
        }
    };
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `metric` under `name`, failing if the name is taken.
    pub fn register(&self, name: &str, metric: Metric) -> Result<(), RegistryError> {
        let mut metrics = self.metrics.write();
        if metrics.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        metrics.insert(name.to_string(), metric);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.metrics.read().keys().cloned().collect()
    }

    /// Clone out every handle, sorted by name.
    ///
    /// The map lock is released before the caller reads any values.
    pub fn metrics(&self) -> Vec<(String, Metric)> {
        self.metrics
            .read()
            .iter()
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect()
    }

    fn get_or_insert_with(&self, name: &str, make: impl FnOnce() -> Metric) -> Metric {
        if let Some(m) = self.metrics.read().get(name) {
            return m.clone();
        }
        self.metrics
            .write()
            .entry(name.to_string())
            .or_insert_with(make)
            .clone()
    }

    get_or_register!(get_or_register_counter, Counter, Counter);
    get_or_register!(get_or_register_gauge, Gauge, Gauge);
    get_or_register!(get_or_register_gauge_f64, GaugeFloat64, GaugeF64);
    get_or_register!(get_or_register_meter, Meter, Meter);
    get_or_register!(
        /// Uses a uniform reservoir; `register` a `Histogram::with_sample`
        /// for anything else.
        get_or_register_histogram,
        Histogram,
        Histogram
    );
    get_or_register!(
        /// Uses a uniform reservoir; `register` a `Timer::with_sample`
        /// for anything else.
        get_or_register_timer,
        Timer,
        Timer
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_register_returns_same_handle() {
        let r = Registry::new();
        r.get_or_register_counter("hits").unwrap().inc(1);
        r.get_or_register_counter("hits").unwrap().inc(2);
        assert_eq!(r.get_or_register_counter("hits").unwrap().count(), 3);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let r = Registry::new();
        r.get_or_register_meter("x").unwrap();
        let err = r.get_or_register_timer("x").unwrap_err();
        assert!(matches!(
            err,
            RegistryError::KindMismatch {
                expected: MetricKind::Timer,
                found: MetricKind::Meter,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_register_is_rejected() {
        let r = Registry::new();
        r.register("g", Metric::Gauge(Arc::new(Gauge::new()))).unwrap();
        let err = r
            .register("g", Metric::Counter(Arc::new(Counter::new())))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "g"));
    }

    #[test]
    fn metrics_are_sorted_by_name() {
        let r = Registry::new();
        r.get_or_register_counter("zeta").unwrap();
        r.get_or_register_gauge("alpha").unwrap();
        r.get_or_register_timer("mid").unwrap();
        assert_eq!(r.names(), vec!["alpha", "mid", "zeta"]);
        let kinds: Vec<_> = r.metrics().iter().map(|(_, m)| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![MetricKind::Gauge, MetricKind::Timer, MetricKind::Counter]
        );
    }

    #[test]
    fn unregister_removes() {
        let r = Registry::new();
        r.get_or_register_counter("c").unwrap();
        assert!(r.unregister("c").is_some());
        assert!(r.is_empty());
        assert!(r.get("c").is_none());
    }
}
