use crate::config::{Config, DurationUnit};
use crate::registry::{MeterSnapshot, SampleSnapshot};

use super::snapshot::MetricSnapshot;

/// A single reported number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn is_finite(self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(v) => v.is_finite(),
        }
    }
}

/// One named sub-value of a metric, e.g. `("99-percentile", 5000.0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat<'a> {
    pub suffix: &'a str,
    pub value: Value,
}

/// Turns metric snapshots into the sub-values that get reported.
///
/// Non-finite floats are dropped record by record. Empty histograms and
/// timers report their count (and timer rates) but no min, max, mean,
/// std-dev or percentiles.
#[derive(Debug, Clone)]
pub struct Extractor {
    percentiles: Vec<f64>,
    percentile_suffixes: Vec<String>,
    duration_unit: DurationUnit,
}

impl Extractor {
    pub fn new(percentiles: &[f64], duration_unit: DurationUnit) -> Self {
        Self {
            percentiles: percentiles.to_vec(),
            percentile_suffixes: percentiles.iter().map(|&p| percentile_suffix(p)).collect(),
            duration_unit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.percentiles(), config.duration_unit())
    }

    pub fn extract(&self, snapshot: &MetricSnapshot) -> Vec<Stat<'_>> {
        let mut out = Vec::new();
        match snapshot {
            MetricSnapshot::Counter(n) => out.push(stat("count", Value::Int(*n))),
            MetricSnapshot::Gauge(v) => out.push(stat("value", Value::Int(*v))),
            MetricSnapshot::GaugeFloat64(v) => out.push(stat("value", Value::Float(*v))),
            MetricSnapshot::Meter(m) => {
                out.push(stat("count", Value::Int(m.count)));
                push_rates(&mut out, m, "mean");
            }
            MetricSnapshot::Histogram(h) => {
                out.push(stat("count", count(h.as_ref())));
                self.push_distribution(&mut out, h.as_ref(), None);
            }
            MetricSnapshot::Timer(t) => {
                out.push(stat("count", count(t.durations.as_ref())));
                self.push_distribution(&mut out, t.durations.as_ref(), Some(self.duration_unit));
                // `mean` is taken by the duration mean
                push_rates(&mut out, &t.rates, "mean-rate");
            }
        }
        out.retain(|s| s.value.is_finite());
        out
    }

    /// min/max/mean/std-dev/percentiles. Durations are converted from
    /// nanoseconds to `unit`; plain histograms pass `None`.
    fn push_distribution<'a>(
        &'a self,
        out: &mut Vec<Stat<'a>>,
        sample: &dyn SampleSnapshot,
        unit: Option<DurationUnit>,
    ) {
        let int = |v: i64| match unit {
            Some(u) => Value::Float(u.convert(v as f64)),
            None => Value::Int(v),
        };
        let float = |v: f64| Value::Float(unit.map_or(v, |u| u.convert(v)));

        if let Some(min) = sample.min() {
            out.push(stat("min", int(min)));
        }
        if let Some(max) = sample.max() {
            out.push(stat("max", int(max)));
        }
        if let Some(mean) = sample.mean() {
            out.push(stat("mean", float(mean)));
        }
        if let Some(sd) = sample.std_dev() {
            out.push(stat("std-dev", float(sd)));
        }
        if let Some(values) = sample.percentiles(&self.percentiles) {
            for (suffix, v) in self.percentile_suffixes.iter().zip(values) {
                out.push(Stat {
                    suffix: suffix.as_str(),
                    value: float(v),
                });
            }
        }
    }
}

fn stat(suffix: &'static str, value: Value) -> Stat<'static> {
    Stat { suffix, value }
}

fn count(sample: &dyn SampleSnapshot) -> Value {
    Value::Int(i64::try_from(sample.count()).unwrap_or(i64::MAX))
}

fn push_rates(out: &mut Vec<Stat<'_>>, m: &MeterSnapshot, mean_suffix: &'static str) {
    out.push(stat("one-minute", Value::Float(m.rate1)));
    out.push(stat("five-minute", Value::Float(m.rate5)));
    out.push(stat("fifteen-minute", Value::Float(m.rate15)));
    out.push(stat(mean_suffix, Value::Float(m.rate_mean)));
}

/// `0.99` → `99-percentile`, `0.999` → `999-percentile`, `0.5` → `50-percentile`.
///
/// Works on the fraction's decimal text so that e.g. `0.57` does not
/// come out as `56.99999999999999`.
pub fn percentile_suffix(fraction: f64) -> String {
    let text = fraction.to_string();
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac = format!("{frac:0<2}");
    let (shifted, rest) = frac.split_at(2);

    let whole = format!("{int}{shifted}");
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    format!("{whole}{rest}-percentile")
}
