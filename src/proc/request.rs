use crate::proc::process::FileOp;

/// One pending or serviced I/O request against a single block.
///
/// `id` doubles as the arrival sequence number: the coordinator hands ids
/// out from a monotonic counter, so FIFO order is id order. Everything but
/// `serviced` is immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: u64,
    pub process_id: u64,
    pub target: usize,
    pub op: FileOp,
    pub serviced: bool,
}

impl Request {
    pub fn new(id: u64, process_id: u64, target: usize, op: FileOp) -> Self {
        Self {
            id,
            process_id,
            target,
            op,
            serviced: false,
        }
    }

    /// Seek distance from `head` to this request's target.
    pub fn distance_from(&self, head: usize) -> usize {
        self.target.abs_diff(head)
    }
}
