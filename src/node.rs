//! Per-node state machine: mempool, fork tree, mining, and the eight event
//! handlers (spec.md §4.3–§4.7). This is the core of the simulator.
//!
//! Grounded throughout on `original_source/Network.h::Node` (field and
//! method list) and `original_source/Network.cpp` (handler bodies).

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::config::SimConfig;
use crate::event::{Event, EventKind, EventQueue};
use crate::model::{Block, LeafNode, LeafSet, Link, Timer, Transaction};
use crate::network::Network;
use crate::rng::{choose_k_from, exponential_ms, uniform_range, SimRng};
use crate::sim_log::SimLog;

/// One simulated mining node (spec.md §3 `Node`).
#[derive(Debug)]
pub struct Node {
    pub id: usize,
    pub fast: bool,
    pub malicious: bool,
    pub ringmaster: bool,
    pub currently_mining: bool,

    pub mempool: VecDeque<Rc<Transaction>>,
    pub transactions_in_pool: HashSet<u64>,
    pub hashing_power: u64,

    pub peers: Vec<Link>,
    pub malicious_peers: Vec<Link>,

    pub leaves: LeafSet,
    pub block_ids_in_tree: HashMap<u64, u64>,
    pub private_leaf: Option<Rc<LeafNode>>,

    pub timers: HashMap<u64, Timer>,
    pub hashes_seen: HashSet<u64>,

    pub transactions_received: u64,
    pub blocks_received: u64,
}

impl Node {
    pub fn new(id: usize) -> Self {
        Node {
            id,
            fast: false,
            malicious: false,
            ringmaster: false,
            currently_mining: false,
            mempool: VecDeque::new(),
            transactions_in_pool: HashSet::new(),
            hashing_power: 0,
            peers: Vec::new(),
            malicious_peers: Vec::new(),
            leaves: LeafSet::new(),
            block_ids_in_tree: HashMap::new(),
            private_leaf: None,
            timers: HashMap::new(),
            hashes_seen: HashSet::new(),
            transactions_received: 0,
            blocks_received: 0,
        }
    }

    fn find_link_mut(&mut self, peer: usize, via_malicious_overlay: bool) -> Option<&mut Link> {
        if via_malicious_overlay {
            self.malicious_peers.iter_mut().find(|l| l.peer == peer)
        } else {
            self.peers.iter_mut().find(|l| l.peer == peer)
        }
    }

    /// Like `find_link_mut`, but falls back to the common-overlay link when
    /// `peer` isn't reachable on the requested malicious overlay: that
    /// overlay is degree-bounded, not complete, so a coalition node
    /// routinely learns of a peer over the common overlay (e.g. a public
    /// block broadcast) without holding a direct malicious-overlay edge to
    /// it (`original_source/Network.cpp:106-126,212-233` falls back to a
    /// default link rather than treating this as unreachable).
    fn find_link_mut_or_common(&mut self, peer: usize, via_malicious_overlay: bool) -> Option<&mut Link> {
        if via_malicious_overlay && self.malicious_peers.iter().any(|l| l.peer == peer) {
            return self.malicious_peers.iter_mut().find(|l| l.peer == peer);
        }
        self.peers.iter_mut().find(|l| l.peer == peer)
    }

    /// Picks which overlay to use toward `peer`: the malicious overlay when
    /// both ends are malicious, else the common overlay (spec.md §4.4).
    fn overlay_toward(&self, peer_is_malicious: bool) -> bool {
        self.malicious && peer_is_malicious
    }
}

/// Opaque block-identity stand-in for a cryptographic hash: the spec treats
/// hashing as the identity function over block ids (spec.md §1 Non-goals),
/// matching `original_source/Network.cpp::compute_hash`'s stubbed
/// `return blk->id`.
fn compute_hash(block: &Block) -> u64 {
    block.id
}

fn link_latency_ms(rng: &mut SimRng, link: &Link, message_size_bits: u64, queuing_delay_constant: u64) -> u64 {
    let transmission = message_size_bits / link.bandwidth_bits_per_ms.max(1);
    let queuing_mean = queuing_delay_constant as f64 / link.bandwidth_bits_per_ms.max(1) as f64;
    link.propagation_delay + transmission + exponential_ms(rng, queuing_mean)
}

/// §4.3 `CreateTransaction`.
pub fn create_transaction(
    network: &mut Network,
    node_id: usize,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
) {
    let receiver = uniform_range(rng, 0, network.nodes.len() as i64 - 1) as usize;
    let amount = uniform_range(rng, cfg.transaction_amount_min as i64, cfg.transaction_amount_max as i64) as u64;
    let txn = Rc::new(Transaction::regular(node_id, receiver, amount));

    let node = &mut network.nodes[node_id];
    node.transactions_in_pool.insert(txn.id);
    node.mempool.push_back(txn.clone());
    log.record(time, format!("Node {node_id} created transaction {} (to {receiver}, amount {amount})", txn.id));

    let peer_ids: Vec<usize> = node.peers.iter().map(|l| l.peer).collect();
    for peer in peer_ids {
        send_transaction_to_peer(network, node_id, peer, &txn, time, queue, rng, cfg);
    }

    if !network.nodes[node_id].currently_mining {
        mine_block(network, node_id, time, queue, rng, cfg, log);
    }
}

fn send_transaction_to_peer(
    network: &mut Network,
    node_id: usize,
    peer: usize,
    txn: &Rc<Transaction>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    let node = &mut network.nodes[node_id];
    let link = node.find_link_mut(peer, false).expect("peer must be in common overlay");
    let latency = link_latency_ms(rng, link, cfg.transaction_size_bits, cfg.queuing_delay_constant);
    link.transactions_sent.insert(txn.id);

    queue.push(
        time + latency,
        EventKind::ReceiveTransaction {
            sender: node_id,
            receiver: peer,
            txn: txn.clone(),
        },
    );
}

/// §4.3 `ReceiveTransaction`.
pub fn receive_transaction(
    network: &mut Network,
    node_id: usize,
    sender: usize,
    txn: Rc<Transaction>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
) {
    let node = &mut network.nodes[node_id];
    node.transactions_received += 1;

    let is_new = node.transactions_in_pool.insert(txn.id);
    if is_new {
        node.mempool.push_back(txn.clone());
        log.record(time, format!("Node {node_id} received transaction {} from {sender}", txn.id));
    } else {
        trace!("node {node_id} dropped duplicate transaction {}", txn.id);
    }

    if !network.nodes[node_id].currently_mining {
        mine_block(network, node_id, time, queue, rng, cfg, log);
    }

    if !is_new {
        return;
    }

    let node = &mut network.nodes[node_id];
    let forward_to = node
        .peers
        .iter()
        .find(|l| l.peer != sender && !l.transactions_sent.contains(&txn.id))
        .map(|l| l.peer);

    if let Some(peer) = forward_to {
        send_transaction_to_peer(network, node_id, peer, &txn, time, queue, rng, cfg);
    }
}

fn send_get_request(
    network: &mut Network,
    node_id: usize,
    peer: usize,
    via_malicious: bool,
    block: &Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    let node = &mut network.nodes[node_id];
    let Some(link) = node.find_link_mut_or_common(peer, via_malicious) else {
        warn!("node {node_id} has no link to {peer} on either overlay, dropping get-request");
        return;
    };
    let latency = link_latency_ms(rng, link, cfg.get_message_size_bits, cfg.queuing_delay_constant);
    link.get_sent.insert(block.id);

    queue.push(
        time + latency,
        EventKind::GetBlockRequest {
            sender: node_id,
            receiver: peer,
            block: block.clone(),
        },
    );
}

/// §4.4 `ReceiveHash`.
pub fn receive_hash(
    network: &mut Network,
    node_id: usize,
    sender: usize,
    block: Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    if network.nodes[node_id].block_ids_in_tree.contains_key(&block.id) {
        return;
    }

    let sender_is_malicious = network.nodes[sender].malicious;
    let via_malicious = network.nodes[node_id].overlay_toward(sender_is_malicious);

    let first_time_seen = network.nodes[node_id].hashes_seen.insert(block.id);
    if first_time_seen {
        send_get_request(network, node_id, sender, via_malicious, &block, time, queue, rng, cfg);

        let node = &mut network.nodes[node_id];
        node.timers.insert(block.id, Timer::new(block.clone(), sender));
        queue.push(
            time + cfg.timer_timeout_time_ms,
            EventKind::TimerExpired { node: node_id, block },
        );
    } else {
        let node = &mut network.nodes[node_id];
        if let Some(timer) = node.timers.get_mut(&block.id) {
            timer.candidates.push_back(sender);
            if !timer.is_running {
                let block = timer.block.clone();
                queue.push(time + cfg.timer_timeout_time_ms, EventKind::TimerExpired { node: node_id, block });
            }
        }
    }
}

/// §4.4 `TimerExpired`.
pub fn timer_expired(
    network: &mut Network,
    node_id: usize,
    block: Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    let node = &mut network.nodes[node_id];
    let Some(timer) = node.timers.get_mut(&block.id) else {
        return;
    };

    if timer.candidates.is_empty() {
        timer.is_running = false;
        return;
    }

    let current_sender = timer.current_sender;
    maybe_punish_and_evict(network, node_id, current_sender, time, cfg, rng);

    let node = &mut network.nodes[node_id];
    let timer = node.timers.get_mut(&block.id).expect("timer still present");
    let mut next_sender = timer.candidates.pop_front();
    while let Some(candidate) = next_sender {
        if !timer.tried_senders.contains(&candidate) {
            break;
        }
        next_sender = timer.candidates.pop_front();
    }

    let Some(next_sender) = next_sender else {
        timer.is_running = false;
        return;
    };
    timer.tried_senders.insert(next_sender);
    timer.current_sender = next_sender;

    let sender_is_malicious = network.nodes[next_sender].malicious;
    let via_malicious = network.nodes[node_id].overlay_toward(sender_is_malicious);
    send_get_request(network, node_id, next_sender, via_malicious, &block, time, queue, rng, cfg);
}

/// Increments the link's failure counter toward `peer` and, once it
/// exceeds 10 and mitigation is enabled, evicts `peer` from the common
/// overlay on both sides and replaces it with a fresh random honest peer
/// (spec.md §4.4). The counter lives on the durable `Link`, not a copy
/// (DESIGN.md open question 3).
fn maybe_punish_and_evict(
    network: &mut Network,
    node_id: usize,
    peer: usize,
    time: u64,
    cfg: &SimConfig,
    rng: &mut SimRng,
) {
    let failed_count = {
        let node = &mut network.nodes[node_id];
        let Some(link) = node.find_link_mut(peer, false) else {
            return;
        };
        link.failed += 1;
        link.failed
    };

    if failed_count <= 10 || !cfg.mitigation {
        return;
    }

    network.nodes[node_id].peers.retain(|l| l.peer != peer);
    network.nodes[peer].peers.retain(|l| l.peer != node_id);

    let excluded: Vec<usize> = network.nodes[node_id].peers.iter().map(|l| l.peer).chain([node_id]).collect();
    let candidates = choose_k_from(rng, &network.honest_ids, 1, &excluded);
    let Some(&new_peer) = candidates.first() else {
        warn!("node {node_id} could not find a replacement honest peer after evicting {peer}");
        return;
    };

    let bandwidth = if network.nodes[node_id].fast && network.nodes[new_peer].fast {
        100_000
    } else {
        5_000
    };
    let delay = uniform_range(rng, cfg.propagation_delay_min as i64, cfg.propagation_delay_max as i64) as u64;

    network.nodes[node_id].peers.push(Link::new(new_peer, delay, bandwidth));
    network.nodes[new_peer].peers.push(Link::new(node_id, delay, bandwidth));

    debug!("time {time}: node {node_id} evicted unresponsive peer {peer}, replaced with {new_peer}");
}

/// §4.4 `GetBlockRequest` / §4.6 `send_block`.
pub fn send_block(
    network: &mut Network,
    node_id: usize,
    requester: usize,
    block: Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    let this_node = &network.nodes[node_id];
    let requester_is_malicious = network.nodes[requester].malicious;

    // Eclipse-attack exception (spec.md §4.4): malicious nodes drop honest
    // blocks requested by non-coalition peers.
    if cfg.eclipse_attack && this_node.malicious && !requester_is_malicious && block.is_honest {
        return;
    }

    let via_malicious = network.nodes[node_id].overlay_toward(requester_is_malicious);
    let node = &mut network.nodes[node_id];
    let Some(link) = node.find_link_mut_or_common(requester, via_malicious) else {
        warn!("node {node_id} has no link to {requester} on either overlay, dropping block send");
        return;
    };
    let size = cfg.transaction_size_bits * block.transactions.len() as u64;
    let latency = link_latency_ms(rng, link, size, cfg.queuing_delay_constant);

    queue.push(
        time + latency,
        EventKind::ReceiveBlock {
            sender: node_id,
            receiver: requester,
            block,
            tries: 0,
        },
    );
}

/// §4.4 / §4.6 `ReceiveBlock`.
pub fn receive_block(
    network: &mut Network,
    node_id: usize,
    sender: usize,
    block: Rc<Block>,
    tries: u32,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
    release_counter: &mut u64,
) {
    if network.nodes[node_id].block_ids_in_tree.contains_key(&block.id) {
        return;
    }
    network.nodes[node_id].blocks_received += 1;
    log.record(time, format!("Node {node_id} received block {} from {sender}", block.id));

    let parent_known = match &block.parent {
        None => true,
        Some(parent) => network.nodes[node_id].block_ids_in_tree.contains_key(&parent.id),
    };

    if !parent_known {
        if tries > cfg.maximum_retries {
            trace!("node {node_id} gave up on orphan block {} after {tries} tries", block.id);
            return;
        }
        log.record(time, format!("Node {node_id} NACK block {} (orphan, retry {tries})", block.id));

        let sender_is_malicious = network.nodes[sender].malicious;
        let via_malicious = network.nodes[node_id].overlay_toward(sender_is_malicious);
        let node = &mut network.nodes[node_id];
        let Some(link) = node.find_link_mut_or_common(sender, via_malicious) else {
            warn!("node {node_id} has no link to {sender} on either overlay, dropping orphan retry");
            return;
        };
        let size = cfg.transaction_size_bits * block.transactions.len() as u64;
        let latency = link_latency_ms(rng, link, size, cfg.queuing_delay_constant);

        queue.push(
            time + latency,
            EventKind::ReceiveBlock {
                sender,
                receiver: node_id,
                block,
                tries: tries + 1,
            },
        );
        return;
    }

    let extended_longest = validate_and_add_block(network, node_id, &block, time, queue, rng, cfg);
    if !extended_longest.validated {
        return;
    }

    log.record(time, format!("Node {node_id} block {} extended longest chain", block.id));
    network.nodes[node_id].timers.remove(&block.id);

    let node = &network.nodes[node_id];
    if !node.malicious {
        mine_block(network, node_id, time, queue, rng, cfg, log);
        return;
    }

    if cfg.selfish_mining && node.ringmaster && block.is_private() {
        mine_block(network, node_id, time, queue, rng, cfg, log);
        return;
    }

    if cfg.selfish_mining && node.ringmaster && !block.is_private() {
        maybe_release_private_chain(network, node_id, time, queue, rng, cfg, log, release_counter);
    }
}

struct ValidationOutcome {
    validated: bool,
    /// Whether the node's publicly visible longest chain changed.
    #[allow(dead_code)]
    longest_changed: bool,
}

/// §4.6 `validate_and_add_block`.
fn validate_and_add_block(
    network: &mut Network,
    node_id: usize,
    block: &Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) -> ValidationOutcome {
    let node = &network.nodes[node_id];

    // Selfish-mining path: gated on `malicious` rather than `ringmaster`
    // (DESIGN.md open question 2) so any coalition node can extend its
    // private-chain knowledge, even though only the ringmaster mines.
    let use_private_leaf =
        cfg.selfish_mining && node.malicious && block.is_private() && node.private_leaf.is_some();

    let (mut balance, mut transaction_ids, length, extended_leaf_id) = if use_private_leaf {
        let leaf = node.private_leaf.as_ref().unwrap();
        (leaf.balance.clone(), leaf.transaction_ids.clone(), leaf.length + 1, None)
    } else if let Some(parent) = &block.parent {
        if let Some(leaf) = node.leaves.find_by_block_id(parent.id) {
            (leaf.balance.clone(), leaf.transaction_ids.clone(), leaf.length + 1, Some(leaf.block.id))
        } else {
            // Parent is an interior node: walk to genesis accumulating state.
            let mut balance = vec![0i64; network.nodes.len()];
            let mut transaction_ids = HashSet::new();
            let mut length = 1u64;
            let mut cursor = Some(parent.clone());
            while let Some(b) = cursor {
                apply_transactions_unchecked(&b, &mut balance, &mut transaction_ids);
                length += 1;
                cursor = b.parent.clone();
            }
            (balance, transaction_ids, length, None)
        }
    } else {
        (vec![0i64; network.nodes.len()], HashSet::new(), 1, None)
    };

    for txn in &block.transactions {
        transaction_ids.insert(txn.id);
        if txn.coinbase {
            balance[txn.receiver] += txn.amount as i64;
        } else {
            let sender = txn.sender.expect("non-coinbase transaction must have a sender");
            balance[sender] -= txn.amount as i64;
            if balance[sender] < 0 {
                return ValidationOutcome { validated: false, longest_changed: false };
            }
            balance[txn.receiver] += txn.amount as i64;
        }
    }

    broadcast_hash(network, node_id, block, time, queue, rng, cfg);

    let node = &mut network.nodes[node_id];
    if node.malicious || !block.is_private() {
        node.block_ids_in_tree.insert(block.id, time);
    }

    let new_leaf = Rc::new(LeafNode {
        block: block.clone(),
        length,
        transaction_ids,
        balance,
    });

    if cfg.selfish_mining && node.malicious && block.is_private() {
        node.private_leaf = Some(new_leaf);
        return ValidationOutcome { validated: true, longest_changed: false };
    }

    let previous_longest = node.leaves.head_block_id();
    if let Some(extended_leaf_id) = extended_leaf_id {
        node.leaves.remove_by_block_id(extended_leaf_id);
    }
    node.leaves.insert(new_leaf);
    let current_longest = node.leaves.head_block_id();

    ValidationOutcome {
        validated: true,
        longest_changed: previous_longest != current_longest,
    }
}

fn apply_transactions_unchecked(block: &Block, balance: &mut [i64], transaction_ids: &mut HashSet<u64>) {
    for txn in &block.transactions {
        transaction_ids.insert(txn.id);
        if txn.coinbase {
            balance[txn.receiver] += txn.amount as i64;
        } else {
            let sender = txn.sender.expect("non-coinbase transaction must have a sender");
            balance[sender] -= txn.amount as i64;
            balance[txn.receiver] += txn.amount as i64;
        }
    }
}

/// §4.4 `broadcast_hash`. Malicious nodes always announce over the
/// malicious overlay, and over the common overlay only if the block is
/// public; honest nodes only ever use the common overlay.
fn broadcast_hash(
    network: &mut Network,
    node_id: usize,
    block: &Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    if network.nodes[node_id].malicious {
        let peers: Vec<usize> = network.nodes[node_id].malicious_peers.iter().map(|l| l.peer).collect();
        for peer in peers {
            send_hash_if_unsent(network, node_id, peer, true, block, time, queue, rng, cfg);
        }
    }

    if !block.is_private() {
        let peers: Vec<usize> = network.nodes[node_id].peers.iter().map(|l| l.peer).collect();
        for peer in peers {
            send_hash_if_unsent(network, node_id, peer, false, block, time, queue, rng, cfg);
        }
    }
}

fn send_hash_if_unsent(
    network: &mut Network,
    node_id: usize,
    peer: usize,
    via_malicious: bool,
    block: &Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    let node = &mut network.nodes[node_id];
    let Some(link) = node.find_link_mut_or_common(peer, via_malicious) else {
        warn!("node {node_id} has no link to {peer} on either overlay, dropping hash announce");
        return;
    };
    if link.hashes_sent.contains(&block.id) {
        return;
    }
    link.hashes_sent.insert(block.id);
    let latency = link_latency_ms(rng, link, cfg.hash_size_bits, cfg.queuing_delay_constant);
    let _hash_value = compute_hash(block);

    queue.push(
        time + latency,
        EventKind::ReceiveHash {
            sender: node_id,
            receiver: peer,
            block: block.clone(),
        },
    );
}

/// §4.5 `mine_block`.
pub fn mine_block(
    network: &mut Network,
    node_id: usize,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
) {
    let node = &mut network.nodes[node_id];
    node.currently_mining = true;

    if node.mempool.is_empty() || node.hashing_power == 0 {
        node.currently_mining = false;
        return;
    }

    // Private-chain mining is gated on `ringmaster` (DESIGN.md open
    // question 2): non-ringmaster coalition members have zero hashing
    // power, so only the ringmaster ever reaches this path.
    let chosen_leaf = if cfg.selfish_mining && node.ringmaster && node.private_leaf.is_some() {
        node.private_leaf.clone().unwrap()
    } else {
        match node.leaves.head() {
            Some(leaf) => leaf.clone(),
            None => {
                node.currently_mining = false;
                return;
            }
        }
    };

    let mut balance = chosen_leaf.balance.clone();
    let mut transactions = vec![Rc::new(Transaction::coinbase(node_id, cfg.mining_reward))];
    balance[node_id] += cfg.mining_reward as i64;

    while transactions.len() < 1000 {
        let Some(txn) = node.mempool.pop_front() else { break };
        node.transactions_in_pool.remove(&txn.id);

        if chosen_leaf.transaction_ids.contains(&txn.id) {
            continue;
        }
        if txn.coinbase {
            balance[txn.receiver] += txn.amount as i64;
        } else {
            let sender = txn.sender.expect("non-coinbase transaction must have a sender");
            if balance[sender] - txn.amount as i64 < 0 {
                continue;
            }
            balance[sender] -= txn.amount as i64;
            balance[txn.receiver] += txn.amount as i64;
        }
        transactions.push(txn);
    }

    if transactions.len() < 2 {
        node.currently_mining = false;
        return;
    }

    let is_private = node.ringmaster;
    let is_honest = !node.ringmaster;
    let block = Block::new(time, chosen_leaf.block.clone(), transactions, is_private, is_honest);

    log.record(time, format!("Node {node_id} started mining {}", block.id));

    let hashing_fraction = node.hashing_power as f64 / cfg.number_of_nodes as f64;
    let mining_time = exponential_ms(rng, cfg.block_inter_arrival_time_ms / hashing_fraction);

    queue.push(time + mining_time, EventKind::BlockMined { miner: node_id, block });
}

/// §4.5 `complete_mining`.
pub fn complete_mining(
    network: &mut Network,
    node_id: usize,
    block: Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
) {
    let node = &network.nodes[node_id];
    let still_tip = match node.leaves.head() {
        Some(head) => head.block.id == block.parent.as_ref().map(|p| p.id).unwrap_or(u64::MAX),
        None => false,
    };
    let still_private_tip = cfg.selfish_mining && node.ringmaster && node.private_leaf.is_some();

    if still_private_tip || still_tip {
        let outcome = validate_and_add_block(network, node_id, &block, time, queue, rng, cfg);
        debug_assert!(outcome.validated, "freshly mined blocks must always validate");
        log.record(time, format!("Node {node_id} successfully mined {}", block.id));
        mine_block(network, node_id, time, queue, rng, cfg, log);
    } else {
        log.record(time, format!("Node {node_id} mining of {} ignored (stale tip)", block.id));
        let node = &mut network.nodes[node_id];
        for txn in &block.transactions {
            if !txn.coinbase && !node.transactions_in_pool.contains(&txn.id) {
                node.transactions_in_pool.insert(txn.id);
                node.mempool.push_back(txn.clone());
            }
        }
        mine_block(network, node_id, time, queue, rng, cfg, log);
    }
}

/// §4.7: after an honest block extends the public chain at the ringmaster,
/// release the private chain once the public chain has caught up to within
/// one block.
fn maybe_release_private_chain(
    network: &mut Network,
    node_id: usize,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
    release_counter: &mut u64,
) {
    let node = &network.nodes[node_id];
    let public_length = node.leaves.head().map(|l| l.length).unwrap_or(0);
    let private_length = node.private_leaf.as_ref().map(|l| l.length).unwrap_or(0);

    if public_length == private_length.saturating_sub(1) || public_length == private_length {
        *release_counter += 1;
        release_private(network, node_id, *release_counter, time, queue, rng, cfg, log);
    }
}

/// §4.7 `release_private` + `release_private_helper`.
fn release_private(
    network: &mut Network,
    node_id: usize,
    counter: u64,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
) {
    let Some(private_leaf) = network.nodes[node_id].private_leaf.clone() else {
        return;
    };

    let peers: Vec<usize> = network.nodes[node_id].malicious_peers.iter().map(|l| l.peer).collect();
    for peer in peers {
        let node = &mut network.nodes[node_id];
        let Some(link) = node.find_link_mut_or_common(peer, true) else {
            warn!("node {node_id} has no link to {peer} on either overlay, dropping release-private");
            continue;
        };
        if link.release_private_sent.contains(&counter) {
            continue;
        }
        link.release_private_sent.insert(counter);
        let latency = link_latency_ms(rng, link, cfg.get_message_size_bits, cfg.queuing_delay_constant);
        queue.push(time + latency, EventKind::ReleasePrivate { node: peer, counter });
    }

    log.record(time, format!("Node {node_id} released private chain (leaf {}, counter {counter})", private_leaf.block.id));

    release_chain_walk(network, node_id, &private_leaf.block, time, queue, rng, cfg);

    network.nodes[node_id].leaves.insert(private_leaf);
    network.nodes[node_id].private_leaf = None;
}

fn release_chain_walk(
    network: &mut Network,
    node_id: usize,
    block: &Rc<Block>,
    time: u64,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
) {
    if let Some(parent) = &block.parent {
        if parent.is_private() {
            release_chain_walk(network, node_id, parent, time, queue, rng, cfg);
        }
    }
    block.clear_private();
    broadcast_hash(network, node_id, block, time, queue, rng, cfg);
}

/// Dispatches a popped event to the appropriate handler.
pub fn dispatch(
    network: &mut Network,
    queue: &mut EventQueue,
    rng: &mut SimRng,
    cfg: &SimConfig,
    log: &mut SimLog,
    release_counter: &mut u64,
    event: Event,
) {
    let time = event.time;
    match event.kind {
        EventKind::CreateTransaction { node } => {
            create_transaction(network, node, time, queue, rng, cfg, log);
        }
        EventKind::ReceiveTransaction { sender, receiver, txn } => {
            receive_transaction(network, receiver, sender, txn, time, queue, rng, cfg, log);
        }
        EventKind::ReceiveBlock { sender, receiver, block, tries } => {
            receive_block(network, receiver, sender, block, tries, time, queue, rng, cfg, log, release_counter);
        }
        EventKind::BlockMined { miner, block } => {
            complete_mining(network, miner, block, time, queue, rng, cfg, log);
        }
        EventKind::ReceiveHash { sender, receiver, block } => {
            receive_hash(network, receiver, sender, block, time, queue, rng, cfg);
        }
        EventKind::GetBlockRequest { sender, receiver, block } => {
            send_block(network, sender, receiver, block, time, queue, rng, cfg);
        }
        EventKind::TimerExpired { node, block } => {
            timer_expired(network, node, block, time, queue, rng, cfg);
        }
        EventKind::ReleasePrivate { node, counter } => {
            release_private(network, node, counter, time, queue, rng, cfg, log);
        }
    }
}
