//! Reporter configuration.
//!
//! `Config` is built once through `ConfigBuilder`, validated, and then
//! shared read-only by every flush cycle. `ReporterSettings` is the
//! serde-friendly form loaded from a JSON file by the binary.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::registry::Registry;

// ─── Defaults ────────────────────────────────────────────────────

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PERCENTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];

// ─── Duration unit ───────────────────────────────────────────────

/// Unit that timer durations are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl DurationUnit {
    /// Size of one unit in nanoseconds.
    pub fn nanos(self) -> f64 {
        match self {
            Self::Nanoseconds => 1.0,
            Self::Microseconds => 1e3,
            Self::Milliseconds => 1e6,
            Self::Seconds => 1e9,
            Self::Minutes => 60e9,
            Self::Hours => 3_600e9,
        }
    }

    /// Convert a raw nanosecond value into this unit.
    pub fn convert(self, nanos: f64) -> f64 {
        nanos / self.nanos()
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
        };
        f.write_str(s)
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    /// Accepts the short form (`ms`) or the full name (`milliseconds`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ns" | "nanoseconds" => Ok(Self::Nanoseconds),
            "us" | "microseconds" => Ok(Self::Microseconds),
            "ms" | "milliseconds" => Ok(Self::Milliseconds),
            "s" | "seconds" => Ok(Self::Seconds),
            "min" | "minutes" => Ok(Self::Minutes),
            "h" | "hours" => Ok(Self::Hours),
            other => Err(format!("unknown duration unit {other:?}")),
        }
    }
}

// ─── Config ──────────────────────────────────────────────────────

/// Validated, immutable reporter parameters.
#[derive(Debug, Clone)]
pub struct Config {
    addr: String,
    registry: Arc<Registry>,
    flush_interval: Duration,
    prefix: String,
    duration_unit: DurationUnit,
    percentiles: Vec<f64>,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl Config {
    /// Start building a config for the backend at `addr` (`host:port`).
    pub fn builder(addr: impl Into<String>, registry: Arc<Registry>) -> ConfigBuilder {
        ConfigBuilder {
            addr: addr.into(),
            registry,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            prefix: String::new(),
            duration_unit: DurationUnit::default(),
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn duration_unit(&self) -> DurationUnit {
        self.duration_unit
    }

    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
}

/// Builder for [`Config`]; everything but the address and registry
/// has a default.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    addr: String,
    registry: Arc<Registry>,
    flush_interval: Duration,
    prefix: String,
    duration_unit: DurationUnit,
    percentiles: Vec<f64>,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl ConfigBuilder {
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn duration_unit(mut self, unit: DurationUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    pub fn percentiles(mut self, percentiles: impl Into<Vec<f64>>) -> Self {
        self.percentiles = percentiles.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        validate_addr(&self.addr)?;
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("connect"));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("write"));
        }
        if let Some(&p) = self
            .percentiles
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(ConfigError::InvalidPercentile(p));
        }

        Ok(Config {
            addr: self.addr,
            registry: self.registry,
            flush_interval: self.flush_interval,
            prefix: self.prefix,
            duration_unit: self.duration_unit,
            percentiles: self.percentiles,
            connect_timeout: self.connect_timeout,
            write_timeout: self.write_timeout,
        })
    }
}

/// `host:port` with a non-empty host and a non-zero port.
/// Name resolution is left to connect time.
fn validate_addr(addr: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidAddress(addr.to_string());
    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match port.parse::<u16>() {
        Ok(p) if p != 0 => Ok(()),
        _ => Err(invalid()),
    }
}

// ─── File settings ───────────────────────────────────────────────

/// On-disk reporter settings (JSON). Missing fields take the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterSettings {
    /// Graphite plaintext endpoint, `host:port`
    #[serde(default = "default_addr")]
    pub addr: String,

    /// How often to flush (milliseconds)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Prepended to every key, dot-separated
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub duration_unit: DurationUnit,

    /// Fractions in [0, 1]
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

fn default_addr() -> String {
    "127.0.0.1:2003".into()
}
fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL.as_millis() as u64
}
fn default_percentiles() -> Vec<f64> {
    DEFAULT_PERCENTILES.to_vec()
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}
fn default_write_timeout_ms() -> u64 {
    DEFAULT_WRITE_TIMEOUT.as_millis() as u64
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            flush_interval_ms: default_flush_interval_ms(),
            prefix: String::new(),
            duration_unit: DurationUnit::default(),
            percentiles: default_percentiles(),
            connect_timeout_ms: default_connect_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl ReporterSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate against `registry` and produce a [`Config`].
    pub fn into_config(self, registry: Arc<Registry>) -> Result<Config, ConfigError> {
        Config::builder(self.addr, registry)
            .flush_interval(Duration::from_millis(self.flush_interval_ms))
            .prefix(self.prefix)
            .duration_unit(self.duration_unit)
            .percentiles(self.percentiles)
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .write_timeout(Duration::from_millis(self.write_timeout_ms))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::new())
    }

    #[test]
    fn defaults() {
        let c = Config::builder("localhost:2003", registry()).build().unwrap();
        assert_eq!(c.flush_interval(), DEFAULT_FLUSH_INTERVAL);
        assert_eq!(c.prefix(), "");
        assert_eq!(c.duration_unit(), DurationUnit::Nanoseconds);
        assert_eq!(c.percentiles(), &DEFAULT_PERCENTILES);
    }

    #[test]
    fn rejects_bad_addresses() {
        for addr in ["", "localhost", ":2003", "host:", "host:0", "host:99999", "a b:1"] {
            let err = Config::builder(addr, registry()).build().unwrap_err();
            assert_eq!(err, ConfigError::InvalidAddress(addr.to_string()));
        }
        assert!(Config::builder("[::1]:2003", registry()).build().is_ok());
        assert!(Config::builder("graphite.internal:2003", registry()).build().is_ok());
    }

    #[test]
    fn rejects_zero_interval_and_timeouts() {
        let b = Config::builder("127.0.0.1:2003", registry());
        assert_eq!(
            b.clone().flush_interval(Duration::ZERO).build().unwrap_err(),
            ConfigError::ZeroInterval
        );
        assert_eq!(
            b.clone().connect_timeout(Duration::ZERO).build().unwrap_err(),
            ConfigError::ZeroTimeout("connect")
        );
        assert_eq!(
            b.write_timeout(Duration::ZERO).build().unwrap_err(),
            ConfigError::ZeroTimeout("write")
        );
    }

    #[test]
    fn rejects_out_of_range_percentiles() {
        let err = Config::builder("127.0.0.1:2003", registry())
            .percentiles(vec![0.5, 1.5])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPercentile(1.5));

        let err = Config::builder("127.0.0.1:2003", registry())
            .percentiles(vec![f64::NAN])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPercentile(p) if p.is_nan()));
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(DurationUnit::Milliseconds.convert(5e9), 5000.0);
        assert_eq!(DurationUnit::Seconds.convert(1.5e9), 1.5);
        assert_eq!(DurationUnit::Nanoseconds.convert(42.0), 42.0);
        assert_eq!(DurationUnit::Minutes.convert(120e9), 2.0);
    }

    #[test]
    fn unit_from_str() {
        assert_eq!("ms".parse::<DurationUnit>(), Ok(DurationUnit::Milliseconds));
        assert_eq!("Seconds".parse::<DurationUnit>(), Ok(DurationUnit::Seconds));
        for unit in ["ns", "us", "ms", "s", "min", "h"] {
            let parsed: DurationUnit = unit.parse().unwrap();
            assert_eq!(parsed.to_string(), unit);
        }
        assert!("fortnights".parse::<DurationUnit>().is_err());
    }

    #[test]
    fn settings_from_json() {
        let s = ReporterSettings::from_json(
            r#"{"addr":"10.0.0.5:2003","prefix":"app","duration_unit":"milliseconds","percentiles":[0.5,0.99]}"#,
        )
        .unwrap();
        assert_eq!(s.flush_interval_ms, 10_000);
        let c = s.into_config(registry()).unwrap();
        assert_eq!(c.addr(), "10.0.0.5:2003");
        assert_eq!(c.prefix(), "app");
        assert_eq!(c.duration_unit(), DurationUnit::Milliseconds);
        assert_eq!(c.percentiles(), &[0.5, 0.99]);
    }

    #[test]
    fn settings_reject_unknown_fields() {
        assert!(ReporterSettings::from_json(r#"{"interval":5}"#).is_err());
    }
}
