//! C-SCAN: circular SCAN.
//!
//! The head only ever services ascending. When nothing remains at or above
//! it, it jumps to the globally smallest pending target and resumes the
//! upward sweep from there. No direction state is needed.

use crate::proc::request::Request;

/// Nearest request with `target >= head`, or on wrap the request with the
/// globally smallest target. First-encountered wins ties.
pub fn select_next(queue: &[Request], head: usize) -> Option<usize> {
    let mut ahead: Option<(usize, usize)> = None; // (index, distance)
    let mut wrap: Option<(usize, usize)> = None; // (index, target)

    for (i, request) in queue.iter().enumerate() {
        if request.target >= head {
            let distance = request.target - head;
            if ahead.map_or(true, |(_, d)| distance < d) {
                ahead = Some((i, distance));
            }
        } else if wrap.map_or(true, |(_, t)| request.target < t) {
            wrap = Some((i, request.target));
        }
    }

    ahead.or(wrap).map(|(i, _)| i)
}

/// Requests at or above the head ascending, then the wrapped segment
/// ascending from block 0.
pub fn order_queue(queue: &[Request], head: usize) -> Vec<Request> {
    let mut ahead: Vec<Request> = queue.iter().filter(|r| r.target >= head).cloned().collect();
    let mut wrapped: Vec<Request> = queue.iter().filter(|r| r.target < head).cloned().collect();

    ahead.sort_by_key(|r| r.target);
    wrapped.sort_by_key(|r| r.target);

    ahead.extend(wrapped);
    ahead
}

/// Seek cost of moving from `pos` to `target` on a disk whose last block
/// is `max_block`, paying the run-out to that edge when the move wraps.
///
/// The circular jump itself is conceptual and costs nothing; only physical
/// sweep distance is charged.
pub fn wrap_cost(pos: usize, target: usize, max_block: usize) -> usize {
    if target < pos {
        (max_block - pos) + target
    } else {
        target - pos
    }
}
