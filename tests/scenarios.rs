//! End-to-end scenarios (spec.md §8). Each builds a `SimConfig` via the same
//! `Cli` struct the binary parses, runs the full simulation against a
//! temporary output directory, and checks the artifacts it produces.

use std::path::PathBuf;

use chainsim::config::{Cli, SimConfig};
use chainsim::driver::run_simulation;

fn cli(
    num_nodes: i64,
    percent_malicious: i64,
    output_dir: PathBuf,
    eclipse: bool,
    no_mitigation: bool,
    seed: u64,
) -> Cli {
    Cli {
        num_nodes,
        percent_malicious,
        mean_tx_inter_arrival_ms: 50,
        block_inter_arrival_s: 5,
        timeout_ms: 2000,
        output_dir,
        eclipse,
        no_mitigation,
        seed,
    }
}

#[test]
fn honest_only_network_produces_logs_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SimConfig::from_cli(&cli(10, 0, dir.path().to_path_buf(), false, false, 1)).unwrap();
    run_simulation(&cfg).unwrap();

    assert!(dir.path().join("Log").join("log.txt").exists());
    assert!(dir.path().join("Temp_files").join("network_common.txt").exists());
    assert!(dir.path().join("Temp_files").join("network_common_adj_list.txt").exists());
    assert!(dir.path().join("run_config.json").exists());
    for id in 0..10 {
        assert!(dir.path().join(format!("stats_node_{id}.csv")).exists());
    }
}

#[test]
fn selfish_mining_coalition_produces_malicious_overlay_dump() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SimConfig::from_cli(&cli(20, 30, dir.path().to_path_buf(), false, false, 2)).unwrap();
    run_simulation(&cfg).unwrap();

    assert!(dir.path().join("Temp_files").join("network_malicious.txt").exists());
}

#[test]
fn eclipse_attack_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SimConfig::from_cli(&cli(15, 25, dir.path().to_path_buf(), true, false, 3)).unwrap();
    run_simulation(&cfg).unwrap();
    assert!(dir.path().join("Log").join("log.txt").exists());
}

#[test]
fn mitigation_disabled_still_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SimConfig::from_cli(&cli(15, 25, dir.path().to_path_buf(), true, true, 4)).unwrap();
    run_simulation(&cfg).unwrap();
    assert!(dir.path().join("Log").join("log.txt").exists());
}

#[test]
fn same_seed_produces_the_same_number_of_events() {
    // Block and transaction ids come from process-global counters, so two
    // runs in the same test binary don't emit byte-identical logs even with
    // the same seed; the event *count* reproducibility is still a
    // meaningful determinism check on the RNG-driven scheduling.
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let cfg_a = SimConfig::from_cli(&cli(8, 20, dir_a.path().to_path_buf(), false, false, 42)).unwrap();
    let cfg_b = SimConfig::from_cli(&cli(8, 20, dir_b.path().to_path_buf(), false, false, 42)).unwrap();

    run_simulation(&cfg_a).unwrap();
    run_simulation(&cfg_b).unwrap();

    let log_a = std::fs::read_to_string(dir_a.path().join("Log").join("log.txt")).unwrap();
    let log_b = std::fs::read_to_string(dir_b.path().join("Log").join("log.txt")).unwrap();
    assert_eq!(log_a.lines().count(), log_b.lines().count());
}

#[test]
fn single_node_network_does_not_panic() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SimConfig::from_cli(&cli(1, 0, dir.path().to_path_buf(), false, false, 5)).unwrap();
    run_simulation(&cfg).unwrap();
}
