//! Auth completion events
//!
//! Events wait here until the host pump drains them one at a time, in the
//! order they were pushed. The queue itself is not synchronized; the owning
//! [`NpAuth`](crate::NpAuth) context holds it behind its lock.

use std::collections::VecDeque;

/// A pending request completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthEvent {
    /// Request id, `handler_id + 1`
    pub request_id: u32,
    /// Result passed to the callback (ticket length)
    pub result: u32,
    /// Guest argument pointer passed to the callback
    pub arg_addr: u32,
}

impl AuthEvent {
    pub fn new(request_id: u32, result: u32, arg_addr: u32) -> Self {
        Self {
            request_id,
            result,
            arg_addr,
        }
    }

    /// Handler this event is delivered to, `None` for request id 0
    pub fn handler_id(&self) -> Option<u32> {
        self.request_id.checked_sub(1)
    }

    /// Callback arguments in guest order
    pub fn args(&self) -> [u32; 3] {
        [self.request_id, self.result, self.arg_addr]
    }
}

/// FIFO of pending events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<AuthEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: AuthEvent) {
        self.events.push_back(event);
    }

    pub fn pop_front(&mut self) -> Option<AuthEvent> {
        self.events.pop_front()
    }

    /// Drop every queued event for `request_id`, returning how many went
    pub fn cancel_by_request(&mut self, request_id: u32) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.request_id != request_id);
        before - self.events.len()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_with_cancel() {
        let mut queue = EventQueue::new();
        for id in [5, 6, 7] {
            queue.push(AuthEvent::new(id, 246, 0));
        }

        assert_eq!(queue.cancel_by_request(6), 1);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_front())
            .map(|e| e.request_id)
            .collect();
        assert_eq!(order, vec![5, 7]);
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_cancel_removes_all_matches() {
        let mut queue = EventQueue::new();
        queue.push(AuthEvent::new(2, 0, 0));
        queue.push(AuthEvent::new(3, 0, 0));
        queue.push(AuthEvent::new(2, 0, 0));

        assert_eq!(queue.cancel_by_request(2), 2);
        assert_eq!(queue.cancel_by_request(9), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_request_zero_has_no_handler() {
        assert_eq!(AuthEvent::new(0, 0, 0).handler_id(), None);
        assert_eq!(AuthEvent::new(1, 0, 0).handler_id(), Some(0));
    }
}
