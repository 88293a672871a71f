use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use graphite_reporter::{logging, CancellationToken, DurationUnit, Registry, ReporterSettings};

mod load_generator;

/// Reports a simulated workload's metrics to Graphite.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON settings file; flags below override its fields
    #[arg(short, long, env = "GRAPHITE_REPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Graphite plaintext endpoint (host:port)
    #[arg(short, long, env = "GRAPHITE_ADDR")]
    addr: Option<String>,

    /// Key prefix, e.g. `myapp.host1`
    #[arg(short, long)]
    prefix: Option<String>,

    /// Flush interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Unit for timer durations: ns, us, ms, s, min, h
    #[arg(short = 'u', long)]
    duration_unit: Option<DurationUnit>,

    /// Comma-separated percentile fractions, e.g. `0.5,0.99`
    #[arg(long, value_delimiter = ',')]
    percentiles: Option<Vec<f64>>,

    /// Number of simulated workers
    #[arg(short, long, default_value_t = 8)]
    workers: u32,

    /// Base RNG seed for the workers
    #[arg(long, default_value_t = 1000)]
    seed: u64,

    /// Print one batch to stdout after a second of load, then exit
    #[arg(long)]
    print: bool,
}

impl Args {
    fn settings(&self) -> anyhow::Result<ReporterSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ReporterSettings::from_json(&json)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => ReporterSettings::default(),
        };

        if let Some(addr) = &self.addr {
            settings.addr = addr.clone();
        }
        if let Some(prefix) = &self.prefix {
            settings.prefix = prefix.clone();
        }
        if let Some(ms) = self.interval_ms {
            settings.flush_interval_ms = ms;
        }
        if let Some(unit) = self.duration_unit {
            settings.duration_unit = unit;
        }
        if let Some(ps) = &self.percentiles {
            settings.percentiles = ps.clone();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init("info");

    // ── 1. Validate configuration up front ──────────────────────
    let registry = Arc::new(Registry::new());
    let config = args
        .settings()?
        .into_config(registry.clone())
        .context("invalid reporter configuration")?;

    // ── 2. Start the simulated workload ─────────────────────────
    let cancel = CancellationToken::new();
    let load = tokio::spawn(load_generator::run(
        registry.clone(),
        cancel.child_token(),
        args.workers,
        args.seed,
    ));

    // ── 3a. One-off dump ────────────────────────────────────────
    if args.print {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        let batch = graphite_reporter::Reporter::new(config).render(chrono::Utc::now().timestamp());
        print!("{}", batch.text);
        cancel.cancel();
        load.await??;
        return Ok(());
    }

    // ── 3b. Report until Ctrl-C ─────────────────────────────────
    let reporter = graphite_reporter::spawn(config, cancel.child_token());
    tracing::info!(workers = args.workers, "simulated load running; Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    tracing::info!("shutting down");
    cancel.cancel();

    load.await??;
    reporter.await?;
    Ok(())
}
