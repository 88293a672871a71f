use std::sync::Arc;

use crate::registry::{MeterSnapshot, Metric, MetricKind, Registry, SampleSnapshot, TimerSnapshot};

/// Values of one metric, read at a single point in time.
#[derive(Debug, Clone)]
pub enum MetricSnapshot {
    Counter(i64),
    Gauge(i64),
    GaugeFloat64(f64),
    Meter(MeterSnapshot),
    Histogram(Arc<dyn SampleSnapshot>),
    Timer(TimerSnapshot),
}

impl MetricSnapshot {
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

impl From<&Metric> for MetricSnapshot {
    fn from(metric: &Metric) -> Self {
        match metric {
            Metric::Counter(c) => Self::Counter(c.count()),
            Metric::Gauge(g) => Self::Gauge(g.value()),
            Metric::GaugeFloat64(g) => Self::GaugeFloat64(g.value()),
            Metric::Meter(m) => Self::Meter(m.snapshot()),
            Metric::Histogram(h) => Self::Histogram(h.snapshot()),
            Metric::Timer(t) => Self::Timer(t.snapshot()),
        }
    }
}

/// Read every registered metric, sorted by name.
///
/// Each metric is read on its own; there is no cross-metric atomicity.
/// Nothing is reset.
pub fn snapshot(registry: &Registry) -> Vec<(String, MetricSnapshot)> {
    registry
        .metrics()
        .into_iter()
        .map(|(name, metric)| {
            let snap = MetricSnapshot::from(&metric);
            (name, snap)
        })
        .collect()
}
