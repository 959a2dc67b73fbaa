//! Simulation driver: genesis seeding, transaction-arrival scheduling, and
//! the main event-loop drain (spec.md §4.1, §4.2).
//!
//! Grounded on `original_source/Simulator.h`/`Simulator.cpp`'s `run()`:
//! seed genesis balances, inject a Poisson stream of `CreateTransaction`
//! events capped at `initial_number_of_transactions`, then drain the event
//! queue until empty.

use std::collections::HashSet;
use std::rc::Rc;

use log::info;

use crate::config::SimConfig;
use crate::error::OutputError;
use crate::event::{EventKind, EventQueue};
use crate::model::{LeafNode, Transaction};
use crate::network::Network;
use crate::node;
use crate::rng::{exponential_ms, new_rng};
use crate::sim_log::SimLog;
use crate::stats;

/// Runs a full simulation and returns the final network state, mainly so
/// tests can inspect leaf balances and chain structure after the event
/// queue drains.
pub fn run_simulation(cfg: &SimConfig) -> Result<Network, OutputError> {
    let mut rng = new_rng(cfg.seed);
    let mut network = Network::new(&mut rng, cfg);

    seed_genesis(&mut network, cfg);
    network.dump_overlays(&cfg.output_dir)?;
    cfg.write_summary(&cfg.output_dir)?;

    let mut log = SimLog::open(&cfg.output_dir)?;
    let mut queue = EventQueue::new();
    let mut release_counter: u64 = 0;

    let mut remaining = cfg.initial_number_of_transactions;
    for node_id in 0..cfg.number_of_nodes {
        if remaining == 0 {
            break;
        }
        let arrival = exponential_ms(&mut rng, cfg.mean_transaction_inter_arrival_time_ms);
        queue.push(arrival, EventKind::CreateTransaction { node: node_id });
        remaining -= 1;
    }

    info!(
        "simulation starting: {} nodes, {}% malicious, ringmaster={}, eclipse={}, mitigation={}",
        cfg.number_of_nodes, cfg.percent_malicious, network.ringmaster_id, cfg.eclipse_attack, cfg.mitigation
    );

    let mut dispatched = 0u64;
    while let Some(event) = queue.pop() {
        dispatched += 1;
        let time = event.time;

        if let EventKind::CreateTransaction { node: node_id } = &event.kind {
            let node_id = *node_id;
            node::create_transaction(&mut network, node_id, time, &mut queue, &mut rng, cfg, &mut log);
            if remaining > 0 {
                remaining -= 1;
                let next = time + exponential_ms(&mut rng, cfg.mean_transaction_inter_arrival_time_ms);
                queue.push(next, EventKind::CreateTransaction { node: node_id });
            }
            continue;
        }

        node::dispatch(&mut network, &mut queue, &mut rng, cfg, &mut log, &mut release_counter, event);
    }

    log.flush();
    info!("simulation finished after {dispatched} dispatched events");

    stats::write_block_stats(&cfg.output_dir, &network)?;
    Ok(network)
}

/// Creates the genesis block, paying `initial_bitcoin` to every node, and
/// installs the resulting leaf at every node's fork tree.
fn seed_genesis(network: &mut Network, cfg: &SimConfig) {
    let coinbases: Vec<Rc<Transaction>> = (0..cfg.number_of_nodes)
        .map(|id| Rc::new(Transaction::coinbase(id, cfg.initial_bitcoin as u64)))
        .collect();
    let transaction_ids: HashSet<u64> = coinbases.iter().map(|t| t.id).collect();
    let balance = vec![cfg.initial_bitcoin; cfg.number_of_nodes];

    let genesis = crate::model::Block::genesis(coinbases);

    for node in network.nodes.iter_mut() {
        node.block_ids_in_tree.insert(genesis.id, 0);
        node.leaves.insert(Rc::new(LeafNode::genesis(
            genesis.clone(),
            balance.clone(),
            transaction_ids.clone(),
        )));
    }
}
