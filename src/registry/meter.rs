use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// EWMAs are advanced in fixed steps of this length.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Exponentially-weighted moving average over a window of `minutes`,
/// expressed in events per second.
#[derive(Debug, Clone)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn new(minutes: f64) -> Self {
        let tick_secs = TICK_INTERVAL.as_secs_f64();
        Self {
            alpha: 1.0 - (-tick_secs / 60.0 / minutes).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    fn tick(&mut self, uncounted: i64) {
        let instant = uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            // First tick seeds the average with the observed rate
            self.rate = instant;
            self.initialized = true;
        }
    }
}

/// Read-only view of a meter.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// Counts events and tracks their 1/5/15-minute and lifetime rates.
///
/// There is no background ticker: the EWMAs catch up on whatever
/// 5-second ticks elapsed whenever the meter is marked or read.
pub struct Meter {
    start: Instant,
    state: Mutex<MeterState>,
}

struct MeterState {
    count: i64,
    uncounted: i64,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterState {
    fn tick_to(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = elapsed.as_nanos() / TICK_INTERVAL.as_nanos();
        if ticks == 0 {
            return;
        }
        self.last_tick += TICK_INTERVAL * ticks as u32;

        // Events since the last tick belong to the first missed tick
        let uncounted = std::mem::take(&mut self.uncounted);
        self.m1.tick(uncounted);
        self.m5.tick(uncounted);
        self.m15.tick(uncounted);
        for _ in 1..ticks {
            self.m1.tick(0);
            self.m5.tick(0);
            self.m15.tick(0);
        }
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// A meter whose lifetime (and first tick window) begins at `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            state: Mutex::new(MeterState {
                count: 0,
                uncounted: 0,
                last_tick: start,
                m1: Ewma::new(1.0),
                m5: Ewma::new(5.0),
                m15: Ewma::new(15.0),
            }),
        }
    }

    pub fn mark(&self, n: i64) {
        self.mark_at(n, Instant::now());
    }

    /// Record `n` events as having happened at `now`.
    pub fn mark_at(&self, n: i64, now: Instant) {
        let mut state = self.state.lock();
        state.tick_to(now);
        state.count += n;
        state.uncounted += n;
    }

    pub fn count(&self) -> i64 {
        self.state.lock().count
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Read the meter as of `now`, advancing the EWMAs first.
    pub fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut state = self.state.lock();
        state.tick_to(now);

        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            state.count as f64 / elapsed
        } else {
            0.0
        };

        MeterSnapshot {
            count: state.count,
            rate1: state.m1.rate,
            rate5: state.m5.rate,
            rate15: state.m15.rate,
            rate_mean,
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meter").field("count", &self.count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn fresh_meter_is_zero() {
        let t0 = Instant::now();
        let m = Meter::starting_at(t0);
        let snap = m.snapshot_at(t0);
        assert_eq!(snap.count, 0);
        assert_eq!(snap.rate1, 0.0);
        assert_eq!(snap.rate_mean, 0.0);
    }

    #[test]
    fn steady_marks_give_steady_rates() {
        // 40 marks, one every 200ms
        let t0 = Instant::now();
        let m = Meter::starting_at(t0);
        for i in 0..40 {
            m.mark_at(1, t0 + Duration::from_millis(200 * i));
        }
        let snap = m.snapshot_at(t0 + Duration::from_secs(8));
        assert_eq!(snap.count, 40);
        assert!(close(snap.rate1, 5.0), "{snap:?}");
        assert!(close(snap.rate5, 5.0), "{snap:?}");
        assert!(close(snap.rate15, 5.0), "{snap:?}");
        assert!(close(snap.rate_mean, 5.0), "{snap:?}");
    }

    #[test]
    fn one_minute_rate_decays_after_a_minute_idle() {
        let t0 = Instant::now();
        let m = Meter::starting_at(t0);
        m.mark_at(3, t0);
        let first = m.snapshot_at(t0 + TICK_INTERVAL);
        assert!(close(first.rate1, 0.6));

        // 12 more ticks of silence: rate * e^-1
        let later = m.snapshot_at(t0 + TICK_INTERVAL * 13);
        assert!(close(later.rate1, 0.6 * (-1f64).exp()), "{later:?}");
        assert!(later.rate15 > later.rate5 && later.rate5 > later.rate1);
        assert_eq!(later.count, 3);
    }

    #[test]
    fn reading_does_not_reset_count() {
        let t0 = Instant::now();
        let m = Meter::starting_at(t0);
        m.mark_at(7, t0);
        let a = m.snapshot_at(t0 + Duration::from_secs(1));
        let b = m.snapshot_at(t0 + Duration::from_secs(1));
        assert_eq!(a, b);
        assert_eq!(m.count(), 7);
    }
}
