/// One block of the simulated disk.
///
/// Blocks form per-file singly-linked chains: `next` holds the id of the
/// following block in the file, `None` marks the tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: usize,
    pub occupied: bool,
    pub next: Option<usize>,
    pub owner: Option<String>, // file name occupying this block
}

impl Block {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            occupied: false,
            next: None,
            owner: None,
        }
    }

    /// Claims the block for a file. Chain linkage is the store's job.
    pub fn assign(&mut self, owner: &str) {
        self.occupied = true;
        self.owner = Some(owner.to_string());
    }

    /// Returns the block to the free pool.
    pub fn release(&mut self) {
        self.occupied = false;
        self.next = None;
        self.owner = None;
    }
}
