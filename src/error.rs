//! Error types for the registry, configuration and flush cycle.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::registry::MetricKind;

/// Registration failure.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The name is already taken.
    #[error("metric {0:?} is already registered")]
    Duplicate(String),

    /// The name is registered under another kind.
    #[error("metric {name:?} is a {found}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: MetricKind,
        found: MetricKind,
    },

    /// The HdrHistogram backing a sample rejected its parameters.
    #[error("cannot build sample: {0}")]
    Sample(#[from] hdrhistogram::CreationError),
}

/// Rejected reporter configuration. Surfaced once, at construction.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid backend address {0:?}: expected host:port")]
    InvalidAddress(String),

    #[error("flush interval must be greater than zero")]
    ZeroInterval,

    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("percentile {0} is outside [0, 1]")]
    InvalidPercentile(f64),
}

/// Why a flush cycle was abandoned.
///
/// None of these are fatal: the reporter drops its connection and the
/// next tick starts over.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
}
