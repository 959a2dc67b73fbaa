//! The `Network` context: owns every node and the two overlay topologies,
//! and assigns the malicious coalition and its ringmaster.
//!
//! Grounded on `original_source/Network.h`/`Network.cpp`'s `Network`
//! constructor: percentage-based malicious selection, a single ringmaster
//! with all coalition hashing power, and two independently built overlay
//! graphs (common, malicious-only).

use crate::config::SimConfig;
use crate::graph::{self, Overlay};
use crate::model::Link;
use crate::node::Node;
use crate::rng::{choose_percent, uniform_range, SimRng};

/// Owns every simulated node plus bookkeeping about which ids are
/// malicious/honest and which malicious node is the ringmaster.
#[derive(Debug)]
pub struct Network {
    pub nodes: Vec<Node>,
    pub malicious_ids: Vec<usize>,
    pub honest_ids: Vec<usize>,
    pub ringmaster_id: usize,
}

impl Network {
    /// Builds the full node population, assigns roles and hashing power,
    /// and wires up both overlay graphs (spec.md §4.8).
    pub fn new(rng: &mut SimRng, cfg: &SimConfig) -> Self {
        let n = cfg.number_of_nodes;
        let mut nodes: Vec<Node> = (0..n).map(Node::new).collect();

        let malicious_ids = choose_percent(rng, n, cfg.percent_malicious as f64 / 100.0);
        let malicious_set: std::collections::HashSet<usize> = malicious_ids.iter().copied().collect();
        let honest_ids: Vec<usize> = (0..n).filter(|id| !malicious_set.contains(id)).collect();

        let ringmaster_id = *malicious_ids.first().unwrap_or(&0);

        let fast_ids = choose_percent(rng, n, 0.5);
        let fast_set: std::collections::HashSet<usize> = fast_ids.iter().copied().collect();

        for &id in &malicious_ids {
            nodes[id].malicious = true;
            nodes[id].ringmaster = id == ringmaster_id;
        }
        for node in nodes.iter_mut() {
            node.fast = fast_set.contains(&node.id);
        }

        // Every honest node carries one hashing-power unit; the ringmaster
        // carries the whole coalition's share (coalition size units) while
        // every other coalition member carries none (spec.md §4.5, §4.8;
        // `original_source/Network.cpp:776,785,529`). The power pool's total
        // is therefore always `n`, so `mine_block` normalizes by
        // `number_of_nodes` rather than a separate constant.
        for &id in &honest_ids {
            nodes[id].hashing_power = 1;
        }
        if !malicious_ids.is_empty() {
            nodes[ringmaster_id].hashing_power = malicious_ids.len() as u64;
        }

        let all_ids: Vec<usize> = (0..n).collect();
        let common_overlay = graph::build_overlay(rng, &all_ids);
        let malicious_overlay = if malicious_ids.len() > 1 {
            graph::build_overlay(rng, &malicious_ids)
        } else {
            Overlay::new()
        };

        wire_overlay(&mut nodes, rng, cfg, &common_overlay, false);
        wire_overlay(&mut nodes, rng, cfg, &malicious_overlay, true);

        Network {
            nodes,
            malicious_ids,
            honest_ids,
            ringmaster_id,
        }
    }

    pub fn dump_overlays(&self, dir: &std::path::Path) -> Result<(), crate::error::OutputError> {
        let common: Overlay = self
            .nodes
            .iter()
            .map(|n| (n.id, n.peers.iter().map(|l| l.peer).collect()))
            .collect();
        graph::dump_overlay(dir, "common", &common)?;

        if self.malicious_ids.len() > 1 {
            let malicious: Overlay = self
                .malicious_ids
                .iter()
                .map(|&id| (id, self.nodes[id].malicious_peers.iter().map(|l| l.peer).collect()))
                .collect();
            graph::dump_overlay(dir, "malicious", &malicious)?;
        }
        Ok(())
    }
}

fn wire_overlay(nodes: &mut [Node], rng: &mut SimRng, cfg: &SimConfig, adjacency: &Overlay, malicious: bool) {
    let (delay_min, delay_max) = if malicious {
        (cfg.propagation_delay_malicious_min, cfg.propagation_delay_malicious_max)
    } else {
        (cfg.propagation_delay_min, cfg.propagation_delay_max)
    };

    let edges = graph::edges_with_delays(rng, adjacency, |id| nodes[id].fast, delay_min, delay_max);
    for (u, v, delay, bandwidth) in edges {
        if malicious {
            nodes[u].malicious_peers.push(Link::new(v, delay, bandwidth));
            nodes[v].malicious_peers.push(Link::new(u, delay, bandwidth));
        } else {
            nodes[u].peers.push(Link::new(v, delay, bandwidth));
            nodes[v].peers.push(Link::new(u, delay, bandwidth));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use crate::rng::new_rng;
    use std::path::PathBuf;

    fn cfg(num_nodes: i64, percent_malicious: i64) -> SimConfig {
        SimConfig::from_cli(&Cli {
            num_nodes,
            percent_malicious,
            mean_tx_inter_arrival_ms: 100,
            block_inter_arrival_s: 60,
            timeout_ms: 1000,
            output_dir: PathBuf::from("/tmp/out"),
            eclipse: false,
            no_mitigation: false,
            seed: 1,
        })
        .unwrap()
    }

    #[test]
    fn every_node_gets_a_role_and_peers() {
        let mut rng = new_rng(1);
        let network = Network::new(&mut rng, &cfg(20, 30));
        assert_eq!(network.nodes.len(), 20);
        for node in &network.nodes {
            assert!(!node.peers.is_empty());
        }
        assert!(network.nodes[network.ringmaster_id].ringmaster);
    }

    #[test]
    fn ringmaster_carries_the_whole_coalition_share() {
        let mut rng = new_rng(2);
        let network = Network::new(&mut rng, &cfg(30, 40));
        for &id in &network.malicious_ids {
            if id != network.ringmaster_id {
                assert_eq!(network.nodes[id].hashing_power, 0);
            }
        }
        assert_eq!(network.nodes[network.ringmaster_id].hashing_power, network.malicious_ids.len() as u64);
    }

    #[test]
    fn hashing_power_pool_always_equals_node_count() {
        let mut rng = new_rng(3);
        let network = Network::new(&mut rng, &cfg(10, 0));
        let total: u64 = network.nodes.iter().map(|n| n.hashing_power).sum();
        assert_eq!(total, 10);

        let mut rng = new_rng(4);
        let network = Network::new(&mut rng, &cfg(25, 40));
        let total: u64 = network.nodes.iter().map(|n| n.hashing_power).sum();
        assert_eq!(total, 25);
    }
}
