use std::sync::atomic::{AtomicU64, Ordering};

static TRANSACTION_TICKET: AtomicU64 = AtomicU64::new(0);

/// A transfer of value between two nodes, or a coinbase payout when `sender` is `None`.
///
/// Immutable once created. Ids are monotonically increasing in creation order,
/// matching `original_source/Blockchain.h::Transaction::transaction_ticket`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Transaction {
    pub id: u64,
    pub sender: Option<usize>,
    pub receiver: usize,
    pub amount: u64,
    pub coinbase: bool,
}

impl Transaction {
    pub fn new(sender: Option<usize>, receiver: usize, amount: u64, coinbase: bool) -> Self {
        let id = TRANSACTION_TICKET.fetch_add(1, Ordering::Relaxed);
        Transaction {
            id,
            sender,
            receiver,
            amount,
            coinbase,
        }
    }

    pub fn coinbase(receiver: usize, amount: u64) -> Self {
        Self::new(None, receiver, amount, true)
    }

    pub fn regular(sender: usize, receiver: usize, amount: u64) -> Self {
        Self::new(Some(sender), receiver, amount, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_has_no_sender() {
        let t = Transaction::coinbase(3, 50);
        assert!(t.coinbase);
        assert_eq!(t.sender, None);
        assert_eq!(t.receiver, 3);
    }

    #[test]
    fn ids_are_monotonically_increasing() {
        let a = Transaction::regular(0, 1, 5);
        let b = Transaction::regular(1, 2, 5);
        assert!(b.id > a.id);
    }
}
