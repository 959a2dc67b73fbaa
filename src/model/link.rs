use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use super::block::Block;

/// A directed link one node holds toward a peer.
///
/// The per-kind dedup sets and the `failed` counter are mutated in place
/// through `&mut Link` borrowed from the owning node's peer list — never
/// through a by-value copy — so that "already sent to this peer" and
/// cumulative failure counts are durable across calls (see DESIGN.md, open
/// question resolutions 1 and 3).
#[derive(Debug, Clone)]
pub struct Link {
    pub peer: usize,
    pub propagation_delay: u64,
    pub bandwidth_bits_per_ms: u64,
    pub failed: u64,
    pub transactions_sent: HashSet<u64>,
    pub hashes_sent: HashSet<u64>,
    pub get_sent: HashSet<u64>,
    pub release_private_sent: HashSet<u64>,
}

impl Link {
    pub fn new(peer: usize, propagation_delay: u64, bandwidth_bits_per_ms: u64) -> Self {
        Link {
            peer,
            propagation_delay,
            bandwidth_bits_per_ms,
            failed: 0,
            transactions_sent: HashSet::new(),
            hashes_sent: HashSet::new(),
            get_sent: HashSet::new(),
            release_private_sent: HashSet::new(),
        }
    }
}

/// Tracks an outstanding fetch for a missing block (spec.md §3, §4.4).
#[derive(Debug, Clone)]
pub struct Timer {
    pub block: Rc<Block>,
    pub current_sender: usize,
    pub tried_senders: HashSet<usize>,
    pub candidates: VecDeque<usize>,
    pub is_running: bool,
}

impl Timer {
    pub fn new(block: Rc<Block>, first_sender: usize) -> Self {
        let mut tried = HashSet::new();
        tried.insert(first_sender);
        Timer {
            block,
            current_sender: first_sender,
            tried_senders: tried,
            candidates: VecDeque::new(),
            is_running: true,
        }
    }
}
