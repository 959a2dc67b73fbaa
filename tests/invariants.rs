//! Invariant checks (spec.md §8) run against a full simulation: every leaf's
//! balances stay non-negative, leaf lengths are consistent with their chain
//! depth, and the malicious coalition never exceeds its configured share.

use std::path::PathBuf;

use chainsim::config::{Cli, SimConfig};
use chainsim::driver::run_simulation;
use chainsim::network::Network;
use chainsim::rng::new_rng;

fn test_cli(num_nodes: i64, percent_malicious: i64, output_dir: PathBuf, seed: u64) -> Cli {
    Cli {
        num_nodes,
        percent_malicious,
        mean_tx_inter_arrival_ms: 40,
        block_inter_arrival_s: 4,
        timeout_ms: 1500,
        output_dir,
        eclipse: true,
        no_mitigation: false,
        seed,
    }
}

#[test]
fn leaf_balances_never_go_negative() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SimConfig::from_cli(&test_cli(12, 30, dir.path().to_path_buf(), 17)).unwrap();
    let network = run_simulation(&cfg).unwrap();

    for node in &network.nodes {
        for leaf in node.leaves.iter() {
            for &balance in &leaf.balance {
                assert!(balance >= 0, "negative balance on node {}'s leaf {}", node.id, leaf.block.id);
            }
        }
    }
}

#[test]
fn leaf_length_matches_chain_depth() {
    use chainsim::model::{Block, LeafNode};

    let genesis = Block::genesis(Vec::new());
    let a = Block::new(1, genesis.clone(), Vec::new(), false, true);
    let b = Block::new(2, a.clone(), Vec::new(), false, true);
    let c = Block::new(3, b.clone(), Vec::new(), false, true);

    let leaf = LeafNode {
        block: c.clone(),
        length: 4,
        transaction_ids: Default::default(),
        balance: Vec::new(),
    };

    let mut depth = 0u64;
    let mut cursor = Some(leaf.block.clone());
    while let Some(block) = cursor {
        depth += 1;
        cursor = block.parent.clone();
    }
    assert_eq!(leaf.length, depth);
}

#[test]
fn malicious_coalition_share_matches_configuration() {
    let mut rng = new_rng(9);
    let cfg = SimConfig::from_cli(&test_cli(40, 25, PathBuf::from("/tmp/unused"), 9)).unwrap();
    let network = Network::new(&mut rng, &cfg);

    let expected = (40.0 * 0.25) as usize;
    assert_eq!(network.malicious_ids.len(), expected);
    assert!(network.nodes[network.ringmaster_id].malicious);
    assert_eq!(network.malicious_ids.len() + network.honest_ids.len(), 40);
}

#[test]
fn every_peer_link_is_reciprocated() {
    let mut rng = new_rng(11);
    let cfg = SimConfig::from_cli(&test_cli(16, 20, PathBuf::from("/tmp/unused"), 11)).unwrap();
    let network = Network::new(&mut rng, &cfg);

    for node in &network.nodes {
        for link in &node.peers {
            let back = network.nodes[link.peer].peers.iter().any(|l| l.peer == node.id);
            assert!(back, "link {} -> {} has no reciprocal link", node.id, link.peer);
        }
    }
}
