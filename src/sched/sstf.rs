//! SSTF: shortest seek time first.
//!
//! Always services the request closest to the current head position.
//! Minimizes average seek, but far-away requests can starve.

use crate::proc::request::Request;

/// Index of the request with the smallest `|target - head|`.
///
/// Equal distances keep the first-encountered candidate (strict `<` over a
/// lowest-index scan), so the pick is deterministic.
pub fn select_next(queue: &[Request], head: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None; // (index, distance)
    for (i, request) in queue.iter().enumerate() {
        let distance = request.distance_from(head);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// Simulates repeated greedy selection with an advancing virtual head.
pub fn order_queue(queue: &[Request], head: usize) -> Vec<Request> {
    let mut remaining = queue.to_vec();
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut virtual_head = head;

    while let Some(i) = select_next(&remaining, virtual_head) {
        let request = remaining.remove(i);
        virtual_head = request.target;
        ordered.push(request);
    }

    ordered
}
