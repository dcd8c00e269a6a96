use log::debug;

use crate::disk::block::Block;
use crate::fs::error::{Result, SimError};

/// The simulated disk: a fixed arena of blocks with chained allocation.
///
/// Files occupy singly-linked chains of not-necessarily-contiguous blocks.
/// `free_count + occupied == len()` holds after every mutation.
#[derive(Debug)]
pub struct BlockStore {
    blocks: Vec<Block>,
    free_count: usize,
}

impl BlockStore {
    pub fn new(total_blocks: usize) -> Self {
        Self {
            blocks: (0..total_blocks).map(Block::new).collect(),
            free_count: total_blocks,
        }
    }

    /// Allocates `size` blocks for `owner` and links them into a chain.
    ///
    /// Scans in ascending id order and claims the first free blocks found,
    /// in discovery order. All-or-nothing: on `OutOfSpace` no block has
    /// been touched.
    pub fn allocate(&mut self, owner: &str, size: usize) -> Result<usize> {
        if size == 0 {
            return Err(SimError::InvalidState(
                "allocation of zero blocks".to_string(),
            ));
        }
        if size > self.free_count {
            return Err(SimError::OutOfSpace);
        }

        let mut head = None;
        let mut prev: Option<usize> = None;
        let mut found = 0;

        for id in 0..self.blocks.len() {
            if found == size {
                break;
            }
            if self.blocks[id].occupied {
                continue;
            }
            self.blocks[id].assign(owner);
            if head.is_none() {
                head = Some(id);
            }
            if let Some(p) = prev {
                self.blocks[p].next = Some(id);
            }
            prev = Some(id);
            found += 1;
            self.free_count -= 1;
        }

        // free_count was checked up front, so the scan cannot come up short
        let head = head.expect("free_count said blocks were available");
        debug!("allocated {} block(s) for '{}', head {}", size, owner, head);
        Ok(head)
    }

    /// Frees the chain starting at `head`, returning how many blocks were
    /// released.
    ///
    /// An out-of-range or already-free head is a harmless no-op returning 0.
    /// The walk stops at the chain tail, at a pointer past the arena, or at
    /// a block that is not occupied (corruption guards, not expected paths).
    pub fn free_chain(&mut self, head: usize) -> usize {
        if head >= self.blocks.len() || !self.blocks[head].occupied {
            return 0;
        }

        let mut freed = 0;
        let mut current = Some(head);
        while let Some(id) = current {
            if id >= self.blocks.len() || !self.blocks[id].occupied {
                break;
            }
            current = self.blocks[id].next;
            self.blocks[id].release();
            self.free_count += 1;
            freed += 1;
        }

        debug!("freed {} block(s) from head {}", freed, head);
        freed
    }

    /// Ordered block ids of the chain starting at `head`.
    ///
    /// Walked on demand, never cached. The hop count is capped at the arena
    /// size so a corrupted cyclic chain cannot loop forever.
    pub fn chain_of(&self, head: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = Some(head);
        while let Some(id) = current {
            if id >= self.blocks.len() || chain.len() == self.blocks.len() {
                break;
            }
            chain.push(id);
            current = self.blocks[id].next;
        }
        chain
    }

    /// Rewrites the owner name on every block of a chain (file rename).
    pub fn rename_chain(&mut self, head: usize, new_owner: &str) {
        for id in self.chain_of(head) {
            self.blocks[id].owner = Some(new_owner.to_string());
        }
    }

    pub fn has_space(&self, size: usize) -> bool {
        size <= self.free_count
    }

    /// Fraction of the disk in use, in `[0, 1]`.
    pub fn usage_fraction(&self) -> f64 {
        self.occupied_count() as f64 / self.blocks.len() as f64
    }

    /// Clears every block and restores the full free pool.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.release();
        }
        self.free_count = self.blocks.len();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn occupied_count(&self) -> usize {
        self.blocks.len() - self.free_count
    }

    pub fn block(&self, id: usize) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Overwrites one block's state from a snapshot record.
    ///
    /// Used only by the persistence loader; `free_count` is recomputed in
    /// one pass once every record has been applied.
    pub(crate) fn restore_block(
        &mut self,
        id: usize,
        occupied: bool,
        next: Option<usize>,
        owner: Option<String>,
    ) -> Result<()> {
        if id >= self.blocks.len() {
            return Err(SimError::OutOfRange(id));
        }
        if let Some(n) = next {
            if n >= self.blocks.len() {
                return Err(SimError::OutOfRange(n));
            }
        }
        let block = &mut self.blocks[id];
        block.occupied = occupied;
        block.next = next;
        block.owner = owner;
        Ok(())
    }

    pub(crate) fn recount_free(&mut self) {
        self.free_count = self.blocks.iter().filter(|b| !b.occupied).count();
    }
}
