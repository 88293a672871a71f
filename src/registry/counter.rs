use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Cumulative count. Never reset by reporting.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, delta: i64) {
        self.count.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn dec(&self, delta: i64) {
        self.count.fetch_sub(delta, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Last-written integer value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Last-written float value, stored as its bit pattern.
#[derive(Debug, Default)]
pub struct GaugeF64 {
    bits: AtomicU64,
}

impl GaugeF64 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let c = Counter::new();
        c.inc(3);
        c.inc(2);
        c.dec(1);
        assert_eq!(c.count(), 4);
        c.clear();
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn test_gauge() {
        let g = Gauge::new();
        g.update(42);
        assert_eq!(g.value(), 42);
        g.update(-10);
        assert_eq!(g.value(), -10);
    }

    #[test]
    fn test_gauge_f64() {
        let g = GaugeF64::new();
        assert_eq!(g.value(), 0.0);
        g.update(47.11);
        assert_eq!(g.value(), 47.11);
    }
}
