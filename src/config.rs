//! CLI parsing and simulation configuration (spec.md §6).
//!
//! Grounded on `original_source/main.cpp` for the exact positional argument
//! list, validation ranges, and the tunable constants it hardcodes at file
//! scope (`transaction_amount_min`, `queuing_delay_constant`, ...). The
//! `clap`-derive idiom follows `Pauli-Group-Hegemon/node/src/bin/node.rs`.

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

/// Discrete-event simulator of a PoW network under selfish mining and
/// eclipse attacks.
#[derive(Debug, Parser)]
#[command(name = "chainsim", about = "Selfish-mining / eclipse-attack PoW network simulator")]
pub struct Cli {
    /// Number of nodes in the network.
    pub num_nodes: i64,
    /// Percentage of nodes in the malicious coalition (0..=100).
    pub percent_malicious: i64,
    /// Mean transaction inter-arrival time, in milliseconds.
    pub mean_tx_inter_arrival_ms: i64,
    /// Mean block inter-arrival time, in seconds (multiplied by 1000 internally).
    pub block_inter_arrival_s: i64,
    /// Per-block-fetch timer timeout, in milliseconds.
    pub timeout_ms: i64,
    /// Output directory for logs, graph dumps, and stats CSVs.
    pub output_dir: PathBuf,

    /// Enable the eclipse attack: malicious nodes withhold honest-origin
    /// blocks from non-coalition requesters.
    #[arg(long)]
    pub eclipse: bool,

    /// Disable the peer-eviction mitigation (enabled by default).
    #[arg(long)]
    pub no_mitigation: bool,

    /// RNG seed, for reproducible runs.
    #[arg(long, default_value_t = 911)]
    pub seed: u64,
}

/// Validated simulation parameters, plus the original's hardcoded tunables
/// (kept as associated constants rather than CLI flags, matching
/// `original_source/main.cpp`'s file-scope globals).
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimConfig {
    pub number_of_nodes: usize,
    pub percent_malicious: u8,
    pub mean_transaction_inter_arrival_time_ms: f64,
    pub block_inter_arrival_time_ms: f64,
    pub timer_timeout_time_ms: u64,
    pub output_dir: PathBuf,
    pub eclipse_attack: bool,
    pub mitigation: bool,
    pub seed: u64,

    pub selfish_mining: bool,
    pub initial_bitcoin: i64,
    pub initial_number_of_transactions: u64,
    pub transaction_amount_min: u64,
    pub transaction_amount_max: u64,
    pub queuing_delay_constant: u64,
    pub transaction_size_bits: u64,
    pub hash_size_bits: u64,
    pub get_message_size_bits: u64,
    pub mining_reward: u64,
    pub maximum_retries: u32,
    pub propagation_delay_min: u64,
    pub propagation_delay_max: u64,
    pub propagation_delay_malicious_min: u64,
    pub propagation_delay_malicious_max: u64,
}

impl SimConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if cli.num_nodes < 1 {
            return Err(ConfigError::NodeCountTooLow(cli.num_nodes));
        }
        if !(0..=100).contains(&cli.percent_malicious) {
            return Err(ConfigError::PercentMaliciousOutOfRange(cli.percent_malicious));
        }
        if cli.mean_tx_inter_arrival_ms <= 0 {
            return Err(ConfigError::NonPositiveMeanTxInterArrival(cli.mean_tx_inter_arrival_ms));
        }
        if cli.block_inter_arrival_s <= 0 {
            return Err(ConfigError::NonPositiveBlockInterArrival(cli.block_inter_arrival_s));
        }
        if cli.timeout_ms <= 0 {
            return Err(ConfigError::NonPositiveTimeout(cli.timeout_ms));
        }

        Ok(SimConfig {
            number_of_nodes: cli.num_nodes as usize,
            percent_malicious: cli.percent_malicious as u8,
            mean_transaction_inter_arrival_time_ms: cli.mean_tx_inter_arrival_ms as f64,
            block_inter_arrival_time_ms: (cli.block_inter_arrival_s * 1000) as f64,
            timer_timeout_time_ms: cli.timeout_ms as u64,
            output_dir: cli.output_dir.clone(),
            eclipse_attack: cli.eclipse,
            mitigation: !cli.no_mitigation,
            seed: cli.seed,

            selfish_mining: true,
            initial_bitcoin: 1000,
            initial_number_of_transactions: 20_000,
            transaction_amount_min: 5,
            transaction_amount_max: 20,
            queuing_delay_constant: 96,
            transaction_size_bits: 1024 * 8,
            hash_size_bits: 64 * 8,
            get_message_size_bits: 64 * 8,
            mining_reward: 50,
            maximum_retries: 100,
            propagation_delay_min: 10,
            propagation_delay_max: 500,
            propagation_delay_malicious_min: 1,
            propagation_delay_malicious_max: 10,
        })
    }
}

impl SimConfig {
    /// Writes `<output_dir>/run_config.json`, a record of the parameters a
    /// run was launched with, matching the teacher's "serialize then write"
    /// idiom for `Chain::save_blockchain_to_file`.
    pub fn write_summary(&self, dir: &std::path::Path) -> Result<(), crate::error::OutputError> {
        std::fs::create_dir_all(dir).map_err(|source| crate::error::OutputError::ConfigDumpOpen {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join("run_config.json");
        let file = std::fs::File::create(&path).map_err(|source| crate::error::OutputError::ConfigDumpOpen {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(file, self).map_err(|err| crate::error::OutputError::ConfigDumpOpen {
            path,
            source: std::io::Error::new(std::io::ErrorKind::Other, err),
        })
    }
}

pub fn usage() -> &'static str {
    "Usage: chainsim <num_nodes> <percent_malicious> <mean_tx_inter_arrival_ms> \
<block_inter_arrival_s> <timeout_ms> <output_dir> [--eclipse] [--no-mitigation] [--seed N]"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            num_nodes: 10,
            percent_malicious: 30,
            mean_tx_inter_arrival_ms: 100,
            block_inter_arrival_s: 60,
            timeout_ms: 1000,
            output_dir: PathBuf::from("/tmp/out"),
            eclipse: false,
            no_mitigation: false,
            seed: 1,
        }
    }

    #[test]
    fn valid_config_converts() {
        let cfg = SimConfig::from_cli(&base_cli()).unwrap();
        assert_eq!(cfg.number_of_nodes, 10);
        assert_eq!(cfg.block_inter_arrival_time_ms, 60_000.0);
        assert!(cfg.mitigation);
    }

    #[test]
    fn rejects_zero_nodes() {
        let mut cli = base_cli();
        cli.num_nodes = 0;
        assert!(matches!(
            SimConfig::from_cli(&cli),
            Err(ConfigError::NodeCountTooLow(0))
        ));
    }

    #[test]
    fn rejects_out_of_range_percent_malicious() {
        let mut cli = base_cli();
        cli.percent_malicious = 101;
        assert!(SimConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn rejects_non_positive_timers() {
        let mut cli = base_cli();
        cli.timeout_ms = 0;
        assert!(SimConfig::from_cli(&cli).is_err());
    }
}
