pub mod block;
pub mod leaf;
pub mod link;
pub mod transaction;

pub use block::Block;
pub use leaf::{LeafNode, LeafSet};
pub use link::{Link, Timer};
pub use transaction::Transaction;
