use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use graphite_reporter::{CancellationToken, Counter, Gauge, Meter, Registry, RegistryError, Timer};

// ─── Handles shared by every worker ──────────────────────────────

struct Handles {
    requests: Arc<Counter>,
    errors: Arc<Counter>,
    in_flight: Arc<Gauge>,
    throughput: Arc<Meter>,
    latency: Arc<Timer>,
    active: AtomicI64,
}

impl Handles {
    fn register(registry: &Registry) -> Result<Self, RegistryError> {
        Ok(Self {
            requests: registry.get_or_register_counter("demo.requests")?,
            errors: registry.get_or_register_counter("demo.errors")?,
            in_flight: registry.get_or_register_gauge("demo.in-flight")?,
            throughput: registry.get_or_register_meter("demo.throughput")?,
            latency: registry.get_or_register_timer("demo.latency")?,
            active: AtomicI64::new(0),
        })
    }

    fn enter(&self) {
        self.in_flight.update(self.active.fetch_add(1, Ordering::Relaxed) + 1);
    }

    fn leave(&self) {
        self.in_flight.update(self.active.fetch_sub(1, Ordering::Relaxed) - 1);
    }
}

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that simulate requests against
/// `registry` until `cancel` fires.
pub async fn run(
    registry: Arc<Registry>,
    cancel: CancellationToken,
    concurrency: u32,
    seed: u64,
) -> Result<(), RegistryError> {
    let handles = Arc::new(Handles::register(&registry)?);
    let busy = registry.get_or_register_gauge("demo.workers")?;
    busy.update(i64::from(concurrency));

    let mut tasks = Vec::with_capacity(concurrency as usize);
    for worker_id in 0..concurrency {
        let handles = handles.clone();
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            worker(worker_id, seed, handles, cancel).await;
        }));
    }

    // Wait for all workers to finish
    for t in tasks {
        let _ = t.await;
    }
    busy.update(0);
    Ok(())
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, seed: u64, handles: Arc<Handles>, cancel: CancellationToken) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(id)));

    while !cancel.is_cancelled() {
        let t0 = Instant::now();
        handles.enter();

        // 1–50 ms of pretend work, with a slow tail
        let mut work_ms = rng.gen_range(1..=50u64);
        if rng.gen_bool(0.05) {
            work_ms *= 10;
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                handles.leave();
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(work_ms)) => {}
        }

        handles.latency.update_since(t0);
        handles.throughput.mark(1);
        handles.requests.inc(1);
        if rng.gen_bool(0.02) {
            handles.errors.inc(1);
        }
        handles.leave();
    }
}
