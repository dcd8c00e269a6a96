/// Number of blocks on the simulated disk.
pub const TOTAL_BLOCKS: usize = 100;

/// Default snapshot location for `save`/`load` without an explicit path.
pub const DEFAULT_SNAPSHOT: &str = "chainfs_state.dat";
