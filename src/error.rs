//! Typed error kinds (spec.md §7). Grounded on the pack's `thiserror` idiom
//! (e.g. `botho-project-botho`'s crates), replacing the teacher's
//! `Box<dyn std::error::Error>` convention with enums callers can match on.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("number_of_nodes must be >= 1, got {0}")]
    NodeCountTooLow(i64),
    #[error("percent_malicious must be within 0..=100, got {0}")]
    PercentMaliciousOutOfRange(i64),
    #[error("mean_transaction_inter_arrival_time must be > 0, got {0}")]
    NonPositiveMeanTxInterArrival(i64),
    #[error("block_inter_arrival_time must be > 0, got {0}")]
    NonPositiveBlockInterArrival(i64),
    #[error("timeout_ms must be > 0, got {0}")]
    NonPositiveTimeout(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("could not open log file at {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not open stats file at {path}: {source}")]
    StatsOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write network graph dump at {path}: {source}")]
    GraphDumpOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write run configuration summary at {path}: {source}")]
    ConfigDumpOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
