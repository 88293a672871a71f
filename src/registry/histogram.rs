use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::meter::{Meter, MeterSnapshot};
use super::sample::{Sample, SampleSnapshot, UniformSample};

/// Distribution of arbitrary integer values.
pub struct Histogram {
    sample: Mutex<Box<dyn Sample>>,
}

impl Histogram {
    /// Histogram over a default-sized uniform reservoir.
    pub fn new() -> Self {
        Self::with_sample(UniformSample::new())
    }

    pub fn with_sample(sample: impl Sample + 'static) -> Self {
        Self {
            sample: Mutex::new(Box::new(sample)),
        }
    }

    pub fn update(&self, value: i64) {
        self.sample.lock().update(value);
    }

    pub fn clear(&self) {
        self.sample.lock().clear();
    }

    pub fn snapshot(&self) -> Arc<dyn SampleSnapshot> {
        Arc::from(self.sample.lock().snapshot())
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram").finish_non_exhaustive()
    }
}

/// Read-only view of a timer: durations in nanoseconds plus rates.
#[derive(Debug, Clone)]
pub struct TimerSnapshot {
    pub durations: Arc<dyn SampleSnapshot>,
    pub rates: MeterSnapshot,
}

/// Duration distribution (nanoseconds) plus the rate of events.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample(sample: impl Sample + 'static) -> Self {
        Self {
            histogram: Histogram::with_sample(sample),
            meter: Meter::new(),
        }
    }

    pub fn update(&self, elapsed: Duration) {
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f`, recording how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.update_since(start);
        result
    }

    pub fn count(&self) -> i64 {
        self.meter.count()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            durations: self.histogram.snapshot(),
            rates: self.meter.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::sample::HdrSample;

    #[test]
    fn test_histogram() {
        let h = Histogram::new();
        h.update(100);
        h.update(200);
        let snap = h.snapshot();
        assert_eq!(snap.count(), 2);
        assert_eq!(snap.mean(), Some(150.0));
    }

    #[test]
    fn snapshot_is_frozen() {
        let h = Histogram::new();
        h.update(1);
        let snap = h.snapshot();
        h.update(1_000);
        assert_eq!(snap.max(), Some(1));
        assert_eq!(h.snapshot().max(), Some(1_000));
    }

    #[test]
    fn timer_records_nanoseconds_and_rate() {
        let t = Timer::new();
        t.update(Duration::from_secs(5));
        t.update(Duration::from_millis(1));
        let snap = t.snapshot();
        assert_eq!(snap.rates.count, 2);
        assert_eq!(snap.durations.count(), 2);
        assert_eq!(snap.durations.max(), Some(5_000_000_000));
        assert_eq!(snap.durations.min(), Some(1_000_000));
    }

    #[test]
    fn timer_time_returns_closure_result() {
        let t = Timer::with_sample(HdrSample::new().unwrap());
        let v = t.time(|| 21 * 2);
        assert_eq!(v, 42);
        assert_eq!(t.count(), 1);
    }
}
