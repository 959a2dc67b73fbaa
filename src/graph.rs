//! Random overlay construction (spec.md §4.8) and the edge-list / adjacency-
//! list dumps required by spec.md §6.
//!
//! Grounded on `original_source/Network.cpp::build_network` (degree-bounded
//! random graph, rebuild-on-disconnect) and
//! `original_source/utility_functions.cpp` (`check_connected_map`,
//! `write_network_to_file_map`).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::error::OutputError;
use crate::rng::{choose_k_from, uniform_range, SimRng};

/// Undirected adjacency list over a subset of node ids.
pub type Overlay = HashMap<usize, Vec<usize>>;

const MAX_BUILD_ATTEMPTS: u32 = 10_000;

/// Builds a connected random graph over `node_ids` with per-node degree in
/// `[min(3, n-1), min(6, n-1)]`, retrying from scratch until the result is
/// connected (checked by DFS), matching the original's `build_network`.
///
/// Per spec.md §9's non-termination warning, this caps the number of rebuild
/// attempts rather than looping forever on a pathological input.
pub fn build_overlay(rng: &mut SimRng, node_ids: &[usize]) -> Overlay {
    let n = node_ids.len();
    if n <= 1 {
        return node_ids.iter().map(|&id| (id, Vec::new())).collect();
    }

    let min_peers = 3.min(n - 1);
    let max_peers = 6.min(n - 1);

    for attempt in 0..MAX_BUILD_ATTEMPTS {
        let adjacency = try_build_once(rng, node_ids, min_peers, max_peers);
        if is_connected(&adjacency, node_ids) {
            return adjacency;
        }
        log::debug!("overlay build attempt {attempt} was disconnected, retrying");
    }
    panic!("could not build a connected overlay over {n} nodes within {MAX_BUILD_ATTEMPTS} attempts");
}

fn try_build_once(rng: &mut SimRng, node_ids: &[usize], min_peers: usize, max_peers: usize) -> Overlay {
    let mut adjacency: Overlay = node_ids.iter().map(|&id| (id, Vec::new())).collect();

    for &node in node_ids {
        while adjacency[&node].len() < min_peers {
            let excluded: Vec<usize> = std::iter::once(node).chain(adjacency[&node].iter().copied()).collect();
            let needed = min_peers - adjacency[&node].len();
            let candidates = choose_k_from(rng, node_ids, needed, &excluded);

            for candidate in candidates {
                let candidate_degree = adjacency[&candidate].len();
                let already_linked = adjacency[&node].contains(&candidate);
                if candidate != node && candidate_degree < max_peers && !already_linked {
                    adjacency.get_mut(&node).unwrap().push(candidate);
                    adjacency.get_mut(&candidate).unwrap().push(node);
                }
            }
        }
    }
    adjacency
}

fn is_connected(adjacency: &Overlay, node_ids: &[usize]) -> bool {
    let n = node_ids.len();
    if n == 0 {
        return true;
    }
    let mut visited = std::collections::HashSet::new();
    let mut stack = vec![node_ids[0]];
    visited.insert(node_ids[0]);
    while let Some(node) = stack.pop() {
        for &neighbor in &adjacency[&node] {
            if visited.insert(neighbor) {
                stack.push(neighbor);
            }
        }
    }
    visited.len() == n
}

/// Assigns a propagation delay and bandwidth to every edge. Bandwidth is
/// 100000 bits/ms if both endpoints are fast, else 5000 bits/ms.
pub fn edges_with_delays(
    rng: &mut SimRng,
    adjacency: &Overlay,
    is_fast: impl Fn(usize) -> bool,
    delay_min: u64,
    delay_max: u64,
) -> Vec<(usize, usize, u64, u64)> {
    let mut edges = Vec::new();
    let mut node_ids: Vec<usize> = adjacency.keys().copied().collect();
    node_ids.sort_unstable();
    for &u in &node_ids {
        let mut neighbors = adjacency[&u].clone();
        neighbors.sort_unstable();
        for v in neighbors {
            if u < v {
                let bandwidth = if is_fast(u) && is_fast(v) { 100_000 } else { 5_000 };
                let delay = uniform_range(rng, delay_min as i64, delay_max as i64) as u64;
                edges.push((u, v, delay, bandwidth));
            }
        }
    }
    edges
}

/// Writes `<dir>/Temp_files/network_<name>.txt` (edge list, `u v` with `u<v`)
/// and `<dir>/Temp_files/network_<name>_adj_list.txt` (`Node k : n1 n2 ...`).
pub fn dump_overlay(dir: &Path, name: &str, adjacency: &Overlay) -> Result<(), OutputError> {
    let dir = &dir.join("Temp_files");
    std::fs::create_dir_all(dir).map_err(|source| OutputError::GraphDumpOpen {
        path: dir.to_path_buf(),
        source,
    })?;

    let edge_path = dir.join(format!("network_{name}.txt"));
    let mut edge_file = BufWriter::new(File::create(&edge_path).map_err(|source| OutputError::GraphDumpOpen {
        path: edge_path.clone(),
        source,
    })?);

    let mut node_ids: Vec<usize> = adjacency.keys().copied().collect();
    node_ids.sort_unstable();
    for &u in &node_ids {
        let mut neighbors = adjacency[&u].clone();
        neighbors.sort_unstable();
        for v in neighbors {
            if u < v {
                writeln!(edge_file, "{u} {v}").ok();
            }
        }
    }

    let adj_path = dir.join(format!("network_{name}_adj_list.txt"));
    let mut adj_file = BufWriter::new(File::create(&adj_path).map_err(|source| OutputError::GraphDumpOpen {
        path: adj_path.clone(),
        source,
    })?);
    for &u in &node_ids {
        let mut neighbors = adjacency[&u].clone();
        neighbors.sort_unstable();
        let neighbor_str = neighbors.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(adj_file, "Node {u} : {neighbor_str}").ok();
    }

    info!("network built for {name} overlay ({} edges)", edge_count(adjacency));
    Ok(())
}

fn edge_count(adjacency: &Overlay) -> usize {
    adjacency.values().map(|v| v.len()).sum::<usize>() / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::new_rng;

    #[test]
    fn single_node_has_no_edges() {
        let mut rng = new_rng(1);
        let overlay = build_overlay(&mut rng, &[0]);
        assert_eq!(overlay[&0].len(), 0);
    }

    #[test]
    fn overlay_is_connected_and_degree_bounded() {
        let mut rng = new_rng(3);
        let ids: Vec<usize> = (0..12).collect();
        let overlay = build_overlay(&mut rng, &ids);
        assert!(is_connected(&overlay, &ids));
        for &id in &ids {
            assert!(overlay[&id].len() >= 3);
            assert!(overlay[&id].len() <= 6);
        }
    }

    #[test]
    fn small_n_respects_n_minus_one_cap() {
        let mut rng = new_rng(5);
        let ids: Vec<usize> = (0..3).collect();
        let overlay = build_overlay(&mut rng, &ids);
        assert!(is_connected(&overlay, &ids));
        for &id in &ids {
            assert_eq!(overlay[&id].len(), 2);
        }
    }
}
