//! Per-node end-of-run block statistics, written as CSV (spec.md §6).
//!
//! Grounded on `original_source/Simulator.h`'s `block_stats` struct and the
//! pack's `csv` usage for structured tabular output.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::error::OutputError;
use crate::network::Network;

#[derive(Debug, Serialize)]
struct BlockStat {
    block_id: u64,
    parent_id: Option<u64>,
    first_seen_time_ms: u64,
    transaction_count: usize,
    in_longest_chain: bool,
    is_honest: bool,
}

/// Writes `<dir>/stats_node_<id>.csv`, one row per block known to that
/// node's fork tree.
pub fn write_block_stats(dir: &Path, network: &Network) -> Result<(), OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::StatsOpen {
        path: dir.to_path_buf(),
        source,
    })?;

    for node in &network.nodes {
        let path = dir.join(format!("stats_node_{}.csv", node.id));
        let mut writer = csv::Writer::from_path(&path).map_err(|err| OutputError::StatsOpen {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, err),
        })?;

        let longest_chain_ids = node.leaves.head().map(longest_chain_block_ids).unwrap_or_default();

        let mut seen = HashSet::new();
        for leaf in node.leaves.iter() {
            let mut cursor = Some(leaf.block.clone());
            while let Some(block) = cursor {
                if !seen.insert(block.id) {
                    break;
                }
                let row = BlockStat {
                    block_id: block.id,
                    parent_id: block.parent.as_ref().map(|p| p.id),
                    first_seen_time_ms: node.block_ids_in_tree.get(&block.id).copied().unwrap_or(block.creation_time),
                    transaction_count: block.transactions.len(),
                    in_longest_chain: longest_chain_ids.contains(&block.id),
                    is_honest: block.is_honest,
                };
                writer.serialize(&row).map_err(|err| OutputError::StatsOpen {
                    path: path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, err),
                })?;
                cursor = block.parent.clone();
            }
        }
        writer.flush().map_err(|source| OutputError::StatsOpen {
            path: path.clone(),
            source,
        })?;
        log::info!("wrote block stats for node {} to {}", node.id, path.display());
    }
    Ok(())
}

fn longest_chain_block_ids(leaf: &std::rc::Rc<crate::model::LeafNode>) -> HashSet<u64> {
    let mut ids = HashSet::new();
    let mut cursor = Some(leaf.block.clone());
    while let Some(block) = cursor {
        ids.insert(block.id);
        cursor = block.parent.clone();
    }
    ids
}
