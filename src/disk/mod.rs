pub mod block;
pub mod block_store;

pub use block::Block;
pub use block_store::BlockStore;
