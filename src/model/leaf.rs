use std::collections::HashSet;
use std::rc::Rc;

use super::block::Block;

/// A chain tip: the ledger state projected from genesis to `block`.
///
/// Invariants (spec.md §3, §8): `length` is one more than the parent leaf's
/// length (or the genesis length of 1); every entry of `balance` is
/// non-negative; `transaction_ids` is exactly the union of transaction ids
/// on the chain from genesis to `block`.
#[derive(Debug, Clone)]
pub struct LeafNode {
    pub block: Rc<Block>,
    pub length: u64,
    pub transaction_ids: HashSet<u64>,
    pub balance: Vec<i64>,
}

impl LeafNode {
    pub fn genesis(block: Rc<Block>, balance: Vec<i64>, transaction_ids: HashSet<u64>) -> Self {
        LeafNode {
            block,
            length: 1,
            transaction_ids,
            balance,
        }
    }
}

/// The set of known chain tips for one node, ordered by descending length
/// with ties broken by insertion order (spec.md §3, §9).
///
/// Modeled as a plain insertion-ordered `Vec` rather than a sorted tree: the
/// number of live leaves per node is small (bounded by fork depth), and a
/// linear scan for the head keeps "first leaf reaching a given length wins
/// ties" trivially correct, which a comparator-only ordered set cannot
/// express without an explicit sequence key.
#[derive(Debug, Clone, Default)]
pub struct LeafSet {
    leaves: Vec<Rc<LeafNode>>,
}

impl LeafSet {
    pub fn new() -> Self {
        LeafSet { leaves: Vec::new() }
    }

    /// The leaf of maximum length (ties go to the earliest inserted).
    pub fn head(&self) -> Option<&Rc<LeafNode>> {
        let mut best: Option<&Rc<LeafNode>> = None;
        for leaf in &self.leaves {
            match best {
                Some(b) if leaf.length <= b.length => {}
                _ => best = Some(leaf),
            }
        }
        best
    }

    pub fn head_block_id(&self) -> Option<u64> {
        self.head().map(|l| l.block.id)
    }

    pub fn insert(&mut self, leaf: Rc<LeafNode>) {
        self.leaves.push(leaf);
    }

    /// Finds the leaf whose tip block has the given id.
    pub fn find_by_block_id(&self, block_id: u64) -> Option<&Rc<LeafNode>> {
        self.leaves.iter().find(|l| l.block.id == block_id)
    }

    pub fn remove_by_block_id(&mut self, block_id: u64) -> Option<Rc<LeafNode>> {
        let pos = self.leaves.iter().position(|l| l.block.id == block_id)?;
        Some(self.leaves.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<LeafNode>> {
        self.leaves.iter()
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::Block;

    fn leaf(block: Rc<Block>, length: u64) -> Rc<LeafNode> {
        Rc::new(LeafNode {
            block,
            length,
            transaction_ids: HashSet::new(),
            balance: Vec::new(),
        })
    }

    #[test]
    fn head_prefers_first_inserted_on_tie() {
        let genesis = Block::genesis(Vec::new());
        let a = Block::new(1, genesis.clone(), Vec::new(), false, true);
        let b = Block::new(2, genesis, Vec::new(), false, true);

        let mut set = LeafSet::new();
        set.insert(leaf(a.clone(), 5));
        set.insert(leaf(b, 5));

        assert_eq!(set.head_block_id(), Some(a.id));
    }

    #[test]
    fn head_picks_strictly_longer() {
        let genesis = Block::genesis(Vec::new());
        let a = Block::new(1, genesis.clone(), Vec::new(), false, true);
        let b = Block::new(2, genesis, Vec::new(), false, true);

        let mut set = LeafSet::new();
        set.insert(leaf(a, 3));
        set.insert(leaf(b.clone(), 4));

        assert_eq!(set.head_block_id(), Some(b.id));
    }
}
