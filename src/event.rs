//! Event queue and the eight event kinds dispatched by the simulation
//! driver (spec.md §4.1).
//!
//! Grounded on `original_source/Event.h`/`Event.cpp`: the `VO` tagged
//! variant becomes `EventKind`, and `Event::operator>` (comparing
//! `(time, type)` with whatever the underlying `priority_queue` does on a
//! tie) becomes `Event`'s `Ord` impl, with an explicit monotonic `seq` as
//! the tiebreak the original leaves to chance (spec.md §9 REDESIGN FLAG).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use crate::model::{Block, Transaction};

#[derive(Debug, Clone)]
pub enum EventKind {
    CreateTransaction {
        node: usize,
    },
    ReceiveTransaction {
        sender: usize,
        receiver: usize,
        txn: Rc<Transaction>,
    },
    ReceiveBlock {
        sender: usize,
        receiver: usize,
        block: Rc<Block>,
        tries: u32,
    },
    BlockMined {
        miner: usize,
        block: Rc<Block>,
    },
    ReceiveHash {
        sender: usize,
        receiver: usize,
        block: Rc<Block>,
    },
    GetBlockRequest {
        sender: usize,
        receiver: usize,
        block: Rc<Block>,
    },
    TimerExpired {
        node: usize,
        block: Rc<Block>,
    },
    ReleasePrivate {
        node: usize,
        counter: u64,
    },
}

impl EventKind {
    /// Type code used for same-time tie-breaking, in the order spec.md
    /// §4.1 mandates.
    pub fn type_code(&self) -> u8 {
        match self {
            EventKind::CreateTransaction { .. } => 0,
            EventKind::ReceiveTransaction { .. } => 1,
            EventKind::ReceiveBlock { .. } => 2,
            EventKind::BlockMined { .. } => 3,
            EventKind::ReceiveHash { .. } => 4,
            EventKind::GetBlockRequest { .. } => 5,
            EventKind::TimerExpired { .. } => 6,
            EventKind::ReleasePrivate { .. } => 7,
        }
    }

    /// The node whose handler this event is dispatched to.
    pub fn target_node(&self) -> usize {
        match self {
            EventKind::CreateTransaction { node } => *node,
            EventKind::ReceiveTransaction { receiver, .. } => *receiver,
            EventKind::ReceiveBlock { receiver, .. } => *receiver,
            EventKind::BlockMined { miner, .. } => *miner,
            EventKind::ReceiveHash { receiver, .. } => *receiver,
            EventKind::GetBlockRequest { receiver, .. } => *receiver,
            EventKind::TimerExpired { node, .. } => *node,
            EventKind::ReleasePrivate { node, .. } => *node,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub time: u64,
    pub seq: u64,
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.kind.type_code() == other.kind.type_code() && self.seq == other.seq
    }
}
impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    /// Reversed so that `BinaryHeap` (a max-heap) pops the
    /// smallest-time/type/seq event first, i.e. behaves as a min-heap over
    /// `(time, type, seq)`.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.kind.type_code().cmp(&self.kind.type_code()))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-priority queue ordered by `(time, type, insertion sequence)`.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, time: u64, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { time, seq, kind });
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.push(10, EventKind::CreateTransaction { node: 0 });
        q.push(5, EventKind::CreateTransaction { node: 1 });
        q.push(7, EventKind::CreateTransaction { node: 2 });

        let times: Vec<u64> = std::iter::from_fn(|| q.pop()).map(|e| e.time).collect();
        assert_eq!(times, vec![5, 7, 10]);
    }

    #[test]
    fn same_time_breaks_tie_by_type_code() {
        let mut q = EventQueue::new();
        q.push(10, EventKind::TimerExpired { node: 0, block: genesis() });
        q.push(10, EventKind::CreateTransaction { node: 0 });
        q.push(10, EventKind::BlockMined { miner: 0, block: genesis() });

        let codes: Vec<u8> = std::iter::from_fn(|| q.pop()).map(|e| e.kind.type_code()).collect();
        assert_eq!(codes, vec![0, 3, 6]);
    }

    #[test]
    fn same_time_same_type_breaks_tie_by_insertion_order() {
        let mut q = EventQueue::new();
        q.push(10, EventKind::CreateTransaction { node: 1 });
        q.push(10, EventKind::CreateTransaction { node: 2 });
        q.push(10, EventKind::CreateTransaction { node: 3 });

        let nodes: Vec<usize> = std::iter::from_fn(|| q.pop())
            .map(|e| e.kind.target_node())
            .collect();
        assert_eq!(nodes, vec![1, 2, 3]);
    }

    fn genesis() -> Rc<Block> {
        Block::genesis(Vec::new())
    }
}
