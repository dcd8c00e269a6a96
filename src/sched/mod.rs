//! Disk scheduling policies.
//!
//! Four interchangeable seek-optimization strategies over the pending
//! request queue. The coordinator owns one `Policy` at a time; SCAN is the
//! only one carrying mutable state (its sweep direction), and that state
//! lives inside the variant.

pub mod cscan;
pub mod fifo;
pub mod scan;
pub mod sstf;

use std::fmt;

use crate::proc::request::Request;

/// Names one of the four algorithms; used for selection and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Fifo,
    Sstf,
    Scan,
    Cscan,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
            Self::Sstf => "SSTF",
            Self::Scan => "SCAN",
            Self::Cscan => "C-SCAN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Some(Self::Fifo),
            "SSTF" => Some(Self::Sstf),
            "SCAN" => Some(Self::Scan),
            "C-SCAN" | "CSCAN" => Some(Self::Cscan),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active scheduling algorithm, with any per-policy state inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    Fifo,
    Sstf,
    Scan { ascending: bool },
    Cscan,
}

impl Policy {
    /// Fresh policy instance for a kind; SCAN starts its sweep ascending.
    pub fn new(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Fifo => Self::Fifo,
            PolicyKind::Sstf => Self::Sstf,
            PolicyKind::Scan => Self::Scan { ascending: true },
            PolicyKind::Cscan => Self::Cscan,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Fifo => PolicyKind::Fifo,
            Self::Sstf => PolicyKind::Sstf,
            Self::Scan { .. } => PolicyKind::Scan,
            Self::Cscan => PolicyKind::Cscan,
        }
    }

    /// Index into `queue` of the next request to service, or `None` on an
    /// empty queue. Only SCAN mutates itself here (direction reversal).
    pub fn select_next(&mut self, queue: &[Request], head: usize) -> Option<usize> {
        match self {
            Self::Fifo => fifo::select_next(queue),
            Self::Sstf => sstf::select_next(queue, head),
            Self::Scan { ascending } => scan::select_next(queue, head, ascending),
            Self::Cscan => cscan::select_next(queue, head),
        }
    }

    /// Non-destructive full service ordering, for display and dry runs.
    ///
    /// Consistent with `select_next`: popping the queue through repeated
    /// selections reproduces exactly this sequence.
    pub fn order_queue(&self, queue: &[Request], head: usize) -> Vec<Request> {
        match self {
            Self::Fifo => fifo::order_queue(queue),
            Self::Sstf => sstf::order_queue(queue, head),
            Self::Scan { ascending } => scan::order_queue(queue, head, *ascending),
            Self::Cscan => cscan::order_queue(queue, head),
        }
    }

    /// Seek cost of one move from `pos` to `target` under this policy's
    /// cost model. `max_block` is the last block of the disk; C-SCAN pays
    /// the run-out to that edge when it wraps.
    pub fn seek_cost(&self, pos: usize, target: usize, max_block: usize) -> usize {
        match self {
            Self::Cscan => cscan::wrap_cost(pos, target, max_block),
            _ => target.abs_diff(pos),
        }
    }

    /// Cumulative head movement of servicing the whole queue in policy
    /// order, starting from `head`.
    pub fn movement_total(&self, queue: &[Request], head: usize, max_block: usize) -> usize {
        let ordered = self.order_queue(queue, head);
        let mut movement = 0;
        let mut pos = head;
        for request in &ordered {
            movement += self.seek_cost(pos, request.target, max_block);
            pos = request.target;
        }
        movement
    }
}
