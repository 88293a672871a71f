use std::fmt;

use hdrhistogram::Histogram as HdrHistogram;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::RegistryError;

// ─── Configuration ───────────────────────────────────────────────

/// Reservoir size used by `UniformSample::new()`.
/// Gives a 99.9% confidence level with a 5% margin of error
/// for a normal distribution.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// HdrHistogram precision for `HdrSample::new()`
pub const DEFAULT_HDR_SIGFIG: u8 = 3;

// ─── Traits ──────────────────────────────────────────────────────

/// A statistically representative subset of a stream of values.
///
/// Histograms and timers own one of these behind a lock; the reporter
/// only ever sees the frozen `SampleSnapshot` it produces.
pub trait Sample: Send {
    fn update(&mut self, value: i64);
    fn snapshot(&self) -> Box<dyn SampleSnapshot>;
    fn clear(&mut self);
}

/// Point-in-time view of a sample.
///
/// Every accessor except `count` returns `None` for an empty sample.
pub trait SampleSnapshot: Send + Sync + fmt::Debug {
    /// Total number of updates seen, not the number retained.
    fn count(&self) -> u64;
    fn min(&self) -> Option<i64>;
    fn max(&self) -> Option<i64>;
    fn mean(&self) -> Option<f64>;
    fn std_dev(&self) -> Option<f64>;

    /// One value per requested fraction, in the order requested.
    fn percentiles(&self, fractions: &[f64]) -> Option<Vec<f64>>;
}

// ─── Uniform reservoir ───────────────────────────────────────────

/// Uniform reservoir sample (Vitter's algorithm R).
///
/// Keeps raw values, so percentiles are exact until the reservoir
/// starts replacing entries.
pub struct UniformSample {
    reservoir_size: usize,
    count: u64,
    values: Vec<i64>,
    rng: StdRng,
}

impl UniformSample {
    pub fn new() -> Self {
        Self::with_reservoir_size(DEFAULT_RESERVOIR_SIZE)
    }

    pub fn with_reservoir_size(reservoir_size: usize) -> Self {
        Self::with_rng(reservoir_size, StdRng::from_entropy())
    }

    /// Deterministic replacement order, for reproducible runs.
    pub fn with_seed(reservoir_size: usize, seed: u64) -> Self {
        Self::with_rng(reservoir_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(reservoir_size: usize, rng: StdRng) -> Self {
        let reservoir_size = reservoir_size.max(1);
        Self {
            reservoir_size,
            count: 0,
            values: Vec::with_capacity(reservoir_size.min(DEFAULT_RESERVOIR_SIZE)),
            rng,
        }
    }
}

impl Default for UniformSample {
    fn default() -> Self {
        Self::new()
    }
}

impl Sample for UniformSample {
    fn update(&mut self, value: i64) {
        self.count += 1;
        if self.values.len() < self.reservoir_size {
            self.values.push(value);
            return;
        }
        // Replace a random slot with probability size / count
        let slot = self.rng.gen_range(0..self.count);
        if let Ok(slot) = usize::try_from(slot) {
            if slot < self.reservoir_size {
                self.values[slot] = value;
            }
        }
    }

    fn snapshot(&self) -> Box<dyn SampleSnapshot> {
        Box::new(UniformSnapshot::new(self.count, self.values.clone()))
    }

    fn clear(&mut self) {
        self.count = 0;
        self.values.clear();
    }
}

/// Frozen, sorted copy of a `UniformSample`'s reservoir.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSnapshot {
    count: u64,
    sorted: Vec<i64>,
}

impl UniformSnapshot {
    pub fn new(count: u64, mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self {
            count,
            sorted: values,
        }
    }

    /// Linear interpolation at rank `p * (n + 1)`, clamped to the
    /// sample's extremes.
    fn percentile(&self, p: f64) -> f64 {
        let n = self.sorted.len();
        let pos = p * (n as f64 + 1.0);
        if pos.is_nan() || pos < 1.0 {
            return self.sorted[0] as f64;
        }
        if pos >= n as f64 {
            return self.sorted[n - 1] as f64;
        }
        let idx = pos.floor() as usize;
        let lower = self.sorted[idx - 1] as f64;
        let upper = self.sorted[idx] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }
}

impl SampleSnapshot for UniformSnapshot {
    fn count(&self) -> u64 {
        self.count
    }

    fn min(&self) -> Option<i64> {
        self.sorted.first().copied()
    }

    fn max(&self) -> Option<i64> {
        self.sorted.last().copied()
    }

    fn mean(&self) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        let sum: i128 = self.sorted.iter().map(|&v| v as i128).sum();
        Some(sum as f64 / self.sorted.len() as f64)
    }

    fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self
            .sorted
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / self.sorted.len() as f64;
        Some(variance.sqrt())
    }

    fn percentiles(&self, fractions: &[f64]) -> Option<Vec<f64>> {
        if self.sorted.is_empty() {
            return None;
        }
        Some(fractions.iter().map(|&p| self.percentile(p)).collect())
    }
}

// ─── HdrHistogram-backed sample ──────────────────────────────────

/// Bounded-memory sample backed by an auto-resizing HdrHistogram.
///
/// Records every value (no reservoir eviction) at a fixed number of
/// significant figures. Negative values are clamped to zero.
pub struct HdrSample {
    hist: HdrHistogram<u64>,
}

impl HdrSample {
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_sigfig(DEFAULT_HDR_SIGFIG)
    }

    /// `sigfig` must be in `0..=5`.
    pub fn with_sigfig(sigfig: u8) -> Result<Self, RegistryError> {
        Ok(Self {
            hist: HdrHistogram::<u64>::new(sigfig)?,
        })
    }
}

impl Sample for HdrSample {
    fn update(&mut self, value: i64) {
        // Auto-resize means this only fails on u64 overflow of counts
        let _ = self.hist.record(value.max(0) as u64);
    }

    fn snapshot(&self) -> Box<dyn SampleSnapshot> {
        Box::new(HdrSnapshot {
            hist: self.hist.clone(),
        })
    }

    fn clear(&mut self) {
        self.hist.reset();
    }
}

/// Frozen copy of an `HdrSample`.
pub struct HdrSnapshot {
    hist: HdrHistogram<u64>,
}

impl fmt::Debug for HdrSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdrSnapshot")
            .field("count", &self.hist.len())
            .field("min", &self.hist.min())
            .field("max", &self.hist.max())
            .finish()
    }
}

impl SampleSnapshot for HdrSnapshot {
    fn count(&self) -> u64 {
        self.hist.len()
    }

    fn min(&self) -> Option<i64> {
        (self.hist.len() > 0).then(|| self.hist.min() as i64)
    }

    fn max(&self) -> Option<i64> {
        (self.hist.len() > 0).then(|| self.hist.max() as i64)
    }

    fn mean(&self) -> Option<f64> {
        (self.hist.len() > 0).then(|| self.hist.mean())
    }

    fn std_dev(&self) -> Option<f64> {
        (self.hist.len() > 0).then(|| self.hist.stdev())
    }

    fn percentiles(&self, fractions: &[f64]) -> Option<Vec<f64>> {
        if self.hist.len() == 0 {
            return None;
        }
        Some(
            fractions
                .iter()
                .map(|&p| self.hist.value_at_quantile(p) as f64)
                .collect(),
        )
    }
}
