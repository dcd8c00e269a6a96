//! FIFO: service requests strictly in arrival order.
//!
//! No seek optimization at all, but no starvation either.

use crate::proc::request::Request;

/// Arrival order is queue order, so the pick is always the front.
pub fn select_next(queue: &[Request]) -> Option<usize> {
    if queue.is_empty() {
        None
    } else {
        Some(0)
    }
}

/// The queue is already in service order.
pub fn order_queue(queue: &[Request]) -> Vec<Request> {
    queue.to_vec()
}
