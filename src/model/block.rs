use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::transaction::Transaction;

static BLOCK_TICKET: AtomicU64 = AtomicU64::new(0);

/// A mined block. Forms an upward-linked tree through `parent`: a child holds
/// a strong reference to its parent, so a subtree stays alive exactly as long
/// as some leaf still references it (spec.md §3 "Ownership").
///
/// Every field but `is_private` is fixed at construction. `is_private` is the
/// one documented exception: selfish-mining release (§4.7) flips it from
/// `true` to `false` on every block along a released private chain, in place,
/// so that all outstanding `Rc<Block>` handles observe the block becoming
/// public without re-announcing a new identity for it.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: u64,
    pub parent: Option<Rc<Block>>,
    pub creation_time: u64,
    pub transactions: Vec<Rc<Transaction>>,
    is_private: Cell<bool>,
    pub is_honest: bool,
}

impl Block {
    pub fn genesis(transactions: Vec<Rc<Transaction>>) -> Rc<Block> {
        Rc::new(Block {
            id: BLOCK_TICKET.fetch_add(1, Ordering::Relaxed),
            parent: None,
            creation_time: 0,
            transactions,
            is_private: Cell::new(false),
            is_honest: true,
        })
    }

    pub fn new(
        creation_time: u64,
        parent: Rc<Block>,
        transactions: Vec<Rc<Transaction>>,
        is_private: bool,
        is_honest: bool,
    ) -> Rc<Block> {
        Rc::new(Block {
            id: BLOCK_TICKET.fetch_add(1, Ordering::Relaxed),
            parent: Some(parent),
            creation_time,
            transactions,
            is_private: Cell::new(is_private),
            is_honest,
        })
    }

    pub fn is_private(&self) -> bool {
        self.is_private.get()
    }

    /// Clears the private flag. Called only while walking a released private
    /// chain (§4.7); never toggles a block back to private.
    pub fn clear_private(&self) {
        self.is_private.set(false);
    }

    pub fn wire_size_bits(&self, transaction_size_bits: u64) -> u64 {
        transaction_size_bits * self.transactions.len() as u64
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Block {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_id_exceeds_parent_id() {
        let genesis = Block::genesis(Vec::new());
        let child = Block::new(10, genesis.clone(), Vec::new(), false, true);
        assert!(child.id > genesis.id);
    }

    #[test]
    fn clear_private_is_observed_through_shared_handles() {
        let genesis = Block::genesis(Vec::new());
        let private = Block::new(5, genesis, Vec::new(), true, false);
        let alias = private.clone();
        assert!(alias.is_private());
        private.clear_private();
        assert!(!alias.is_private());
    }
}
