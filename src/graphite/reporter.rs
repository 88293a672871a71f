use std::time::Duration;

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{self, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::extract::Extractor;
use super::format::{push_line, Line};
use super::snapshot::snapshot;
use crate::config::Config;
use crate::error::FlushError;

// ─── Public types ────────────────────────────────────────────────

/// What one successful cycle sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Metrics read from the registry
    pub metrics: usize,
    /// Records written
    pub lines: usize,
    pub bytes: usize,
    /// Unix seconds stamped on every record of the cycle
    pub timestamp: i64,
}

/// One cycle's records, rendered but not yet sent.
#[derive(Debug, Clone)]
pub struct Batch {
    pub text: String,
    pub metrics: usize,
    pub lines: usize,
}

/// Periodically writes the registry to a Graphite plaintext endpoint.
///
/// Owns the only connection to the backend. A failed connect or write
/// abandons the cycle and drops the connection; the next cycle
/// reconnects.
pub struct Reporter {
    config: Config,
    extractor: Extractor,
    conn: Option<TcpStream>,
    /// Consecutive failed cycles, for logging recovery
    failures: u64,
}

// ─── Reporter impl ───────────────────────────────────────────────

impl Reporter {
    pub fn new(config: Config) -> Self {
        Self {
            extractor: Extractor::from_config(&config),
            config,
            conn: None,
            failures: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Snapshot the registry and format every record for `timestamp`.
    pub fn render(&self, timestamp: i64) -> Batch {
        let metrics = snapshot(self.config.registry());
        let prefix = self.config.prefix();

        let mut text = String::with_capacity(metrics.len() * 64);
        let mut lines = 0;
        for (name, snap) in &metrics {
            for stat in self.extractor.extract(snap) {
                push_line(
                    &mut text,
                    &Line {
                        prefix,
                        name: name.as_str(),
                        suffix: stat.suffix,
                        value: stat.value,
                        timestamp,
                    },
                );
                lines += 1;
            }
        }

        Batch {
            text,
            metrics: metrics.len(),
            lines,
        }
    }

    /// Run exactly one cycle: connect if needed, snapshot, write.
    ///
    /// On error the connection (if any) is discarded and nothing else
    /// from this cycle is sent.
    pub async fn flush_once(&mut self) -> Result<FlushReport, FlushError> {
        let timestamp = Utc::now().timestamp();

        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.connect().await?,
        };

        let batch = self.render(timestamp);
        if !batch.text.is_empty() {
            write_batch(&mut conn, batch.text.as_bytes(), self.config.write_timeout()).await?;
        }
        self.conn = Some(conn);

        Ok(FlushReport {
            metrics: batch.metrics,
            lines: batch.lines,
            bytes: batch.text.len(),
            timestamp,
        })
    }

    /// Shut down the connection, if open.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let _ = conn.shutdown().await;
        }
    }

    /// Flush every `flush_interval` until `cancel` fires.
    ///
    /// The first cycle runs immediately. Cancellation is only checked
    /// between cycles, never during a write.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = time::interval(self.config.flush_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);

        tracing::info!(
            addr = self.config.addr(),
            interval = ?self.config.flush_interval(),
            prefix = self.config.prefix(),
            "graphite reporter started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                tick = ticks.next() => {
                    if tick.is_none() {
                        break;
                    }
                }
            }
            self.cycle().await;
        }

        self.close().await;
        tracing::info!("graphite reporter stopped");
    }

    /// One scheduled cycle, with its outcome logged.
    async fn cycle(&mut self) {
        match self.flush_once().await {
            Ok(report) => {
                if self.failures > 0 {
                    tracing::info!(
                        failed_cycles = self.failures,
                        "graphite backend reachable again"
                    );
                    self.failures = 0;
                }
                tracing::debug!(
                    metrics = report.metrics,
                    lines = report.lines,
                    bytes = report.bytes,
                    "flushed metrics"
                );
            }
            Err(e) => {
                self.failures += 1;
                if self.failures == 1 {
                    tracing::warn!(error = %e, "flush cycle skipped");
                } else {
                    tracing::debug!(error = %e, failed_cycles = self.failures, "flush cycle skipped");
                }
            }
        }
    }

    async fn connect(&self) -> Result<TcpStream, FlushError> {
        let addr = self.config.addr();
        let timeout = self.config.connect_timeout();

        let stream = time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| FlushError::ConnectTimeout {
                addr: addr.to_string(),
                timeout,
            })?
            .map_err(|source| FlushError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        // Small batches should go out now rather than wait for Nagle
        let _ = stream.set_nodelay(true);
        tracing::debug!(addr, "connected to graphite");
        Ok(stream)
    }
}

/// Write the whole batch or fail; bounded by `timeout`.
async fn write_batch(conn: &mut TcpStream, batch: &[u8], timeout: Duration) -> Result<(), FlushError> {
    time::timeout(timeout, async {
        conn.write_all(batch).await?;
        conn.flush().await
    })
    .await
    .map_err(|_| FlushError::WriteTimeout(timeout))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::DurationUnit;
    use crate::registry::Registry;

    fn config(addr: &str, registry: Arc<Registry>) -> Config {
        Config::builder(addr, registry)
            .prefix("app")
            .duration_unit(DurationUnit::Milliseconds)
            .percentiles(vec![0.5])
            .connect_timeout(Duration::from_millis(500))
            .build()
            .unwrap()
    }

    #[test]
    fn render_stamps_every_line_with_the_same_timestamp() {
        let registry = Arc::new(Registry::new());
        registry.get_or_register_counter("a").unwrap().inc(1);
        registry.get_or_register_gauge("b").unwrap().update(2);
        let reporter = Reporter::new(config("127.0.0.1:2003", registry));

        let batch = reporter.render(1234);
        assert_eq!(batch.text, "app.a.count 1 1234\napp.b.value 2 1234\n");
        assert_eq!(batch.metrics, 2);
        assert_eq!(batch.lines, 2);
    }

    #[test]
    fn render_empty_registry() {
        let reporter = Reporter::new(config("127.0.0.1:2003", Arc::new(Registry::new())));
        let batch = reporter.render(0);
        assert!(batch.text.is_empty());
        assert_eq!(batch.lines, 0);
    }

    #[tokio::test]
    async fn unreachable_then_reachable() {
        // Grab a free port, then close it so the first connect is refused
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let registry = Arc::new(Registry::new());
        registry.get_or_register_counter("hits").unwrap().inc(3);
        let mut reporter = Reporter::new(config(&addr.to_string(), registry));

        let err = reporter.flush_once().await.unwrap_err();
        assert!(matches!(err, FlushError::Connect { .. }), "{err}");
        assert!(!reporter.is_connected());

        let listener = TcpListener::bind(addr).await.unwrap();
        let report = reporter.flush_once().await.unwrap();
        assert_eq!(report.lines, 1);
        assert!(reporter.is_connected());

        let (mut sock, _) = listener.accept().await.unwrap();
        reporter.close().await;
        let mut received = String::new();
        sock.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, format!("app.hits.count 3 {}\n", report.timestamp));
    }

    #[tokio::test]
    async fn connection_is_reused_across_cycles() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let registry = Arc::new(Registry::new());
        let counter = registry.get_or_register_counter("c").unwrap();
        let mut reporter = Reporter::new(config(&addr, registry));

        counter.inc(1);
        reporter.flush_once().await.unwrap();
        counter.inc(1);
        reporter.flush_once().await.unwrap();
        reporter.close().await;

        let (mut sock, _) = listener.accept().await.unwrap();
        let mut received = String::new();
        sock.read_to_string(&mut received).await.unwrap();
        let counts: Vec<_> = received
            .lines()
            .map(|l| l.split(' ').nth(1).unwrap().to_string())
            .collect();
        assert_eq!(counts, vec!["1", "2"]);
    }
}
