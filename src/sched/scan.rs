//! SCAN: the elevator algorithm.
//!
//! The head sweeps in one direction servicing everything on the way, then
//! reverses when nothing is left ahead of it. The direction bit is owned by
//! the policy instance and persists across selections.

use crate::proc::request::Request;

/// Picks the closest request in the current direction.
///
/// If the current side is empty, flips `*ascending` and re-scans before
/// returning: a non-empty queue never yields `None`. Equal distances keep
/// the first-encountered candidate.
pub fn select_next(queue: &[Request], head: usize, ascending: &mut bool) -> Option<usize> {
    if queue.is_empty() {
        return None;
    }

    if let Some(i) = closest_in_direction(queue, head, *ascending) {
        return Some(i);
    }

    // Nothing left on this side of the head; reverse and sweep the other way.
    *ascending = !*ascending;
    closest_in_direction(queue, head, *ascending)
}

fn closest_in_direction(queue: &[Request], head: usize, ascending: bool) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, request) in queue.iter().enumerate() {
        let on_side = if ascending {
            request.target >= head
        } else {
            request.target <= head
        };
        if !on_side {
            continue;
        }
        let distance = request.distance_from(head);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// Partitions into the sweep ahead of the head and the return sweep.
///
/// Ascending: targets `>= head` sorted ascending, then targets `< head`
/// sorted descending. Descending: the mirror image. Does not touch the
/// stored direction.
pub fn order_queue(queue: &[Request], head: usize, ascending: bool) -> Vec<Request> {
    // Head-equal targets belong to the current sweep.
    let on_sweep = |r: &Request| {
        if ascending {
            r.target >= head
        } else {
            r.target <= head
        }
    };

    let mut sweep: Vec<Request> = queue.iter().filter(|&r| on_sweep(r)).cloned().collect();
    let mut reverse: Vec<Request> = queue.iter().filter(|&r| !on_sweep(r)).cloned().collect();

    if ascending {
        sweep.sort_by_key(|r| r.target);
        reverse.sort_by_key(|r| std::cmp::Reverse(r.target));
    } else {
        sweep.sort_by_key(|r| std::cmp::Reverse(r.target));
        reverse.sort_by_key(|r| r.target);
    }

    sweep.extend(reverse);
    sweep
}
