//! Bounded Circular Queue
//!
//! Fixed-capacity FIFO ring over ticket records. One slot is deliberately
//! kept unusable so a full ring is distinguishable from an empty one
//! without a separate counter: usable capacity is `capacity - 1`.
//!
//! A circular queue was chosen over a priority heap on purpose: it
//! guarantees complete fairness (no ticket is ever skipped) and the
//! escalation sweep handles urgency orthogonally.

use crate::{EngineError, Result, Ticket};

/// Sentinel index meaning "queue is empty".
const EMPTY: usize = usize::MAX;

/// Fixed-capacity FIFO store of tickets.
pub struct TicketQueue {
    slots: Vec<Option<Ticket>>,
    front: usize,
    rear: usize,
}

impl TicketQueue {
    /// Create a queue with the given total capacity (`capacity - 1` usable).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring needs at least one usable slot");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            front: EMPTY,
            rear: EMPTY,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.front == EMPTY
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity() - 1
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.rear + self.capacity() - self.front) % self.capacity() + 1
        }
    }

    /// Append a ticket at the rear. Fails with [`EngineError::QueueFull`]
    /// when at usable capacity; the engine records the overflow event.
    pub fn enqueue(&mut self, ticket: Ticket) -> Result<()> {
        if self.is_full() {
            return Err(EngineError::QueueFull {
                ticket_id: ticket.ticket_id,
            });
        }
        if self.is_empty() {
            self.front = 0;
            self.rear = 0;
        } else {
            self.rear = (self.rear + 1) % self.capacity();
        }
        self.slots[self.rear] = Some(ticket);
        Ok(())
    }

    /// Remove and return the head ticket. Resets both indices to the empty
    /// sentinel when the last element is removed.
    pub fn dequeue(&mut self) -> Option<Ticket> {
        if self.is_empty() {
            return None;
        }
        let ticket = self.slots[self.front].take();
        if self.front == self.rear {
            self.front = EMPTY;
            self.rear = EMPTY;
        } else {
            self.front = (self.front + 1) % self.capacity();
        }
        ticket
    }

    /// Head ticket without removing it.
    pub fn peek(&self) -> Option<&Ticket> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.front].as_ref()
        }
    }

    /// Lazy, restartable FIFO iteration from front to rear. Never mutates
    /// queue state.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            queue: self,
            next: if self.is_empty() {
                None
            } else {
                Some(self.front)
            },
        }
    }

    /// Visit every ticket in FIFO order with mutable access to the record.
    /// Used by the escalation sweep for in-place priority edits; the ring
    /// structure itself is never changed.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Ticket)) {
        if self.is_empty() {
            return;
        }
        let capacity = self.capacity();
        let mut i = self.front;
        loop {
            if let Some(ticket) = self.slots[i].as_mut() {
                f(ticket);
            }
            if i == self.rear {
                break;
            }
            i = (i + 1) % capacity;
        }
    }

    /// Drop all tickets and reset to empty. Used when re-loading from the
    /// durable store.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.front = EMPTY;
        self.rear = EMPTY;
    }
}

/// FIFO iterator over queued tickets.
pub struct Iter<'a> {
    queue: &'a TicketQueue,
    next: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Ticket;

    fn next(&mut self) -> Option<&'a Ticket> {
        let i = self.next?;
        self.next = if i == self.queue.rear {
            None
        } else {
            Some((i + 1) % self.queue.capacity())
        };
        self.queue.slots[i].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Priority;
    use chrono::Utc;

    fn ticket(id: u32) -> Ticket {
        Ticket {
            ticket_id: id,
            customer_name: "Test Customer".to_string(),
            email: "customer@example.com".to_string(),
            product: "Widget".to_string(),
            purchase_date: "2026-01-01".to_string(),
            issue_description: format!("issue number {id}"),
            priority: Priority::Low,
            entered_queue_at: Utc::now(),
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut q = TicketQueue::new(16);
        for id in 1..=10 {
            q.enqueue(ticket(id)).unwrap();
        }
        for id in 1..=10 {
            assert_eq!(q.dequeue().unwrap().ticket_id, id);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_capacity_is_one_less_than_ring_size() {
        let mut q = TicketQueue::new(5);
        for id in 1..=4 {
            q.enqueue(ticket(id)).unwrap();
        }
        assert!(q.is_full());
        match q.enqueue(ticket(5)) {
            Err(EngineError::QueueFull { ticket_id }) => assert_eq!(ticket_id, 5),
            other => panic!("expected QueueFull, got {other:?}"),
        }
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn test_wraparound_preserves_fifo() {
        let mut q = TicketQueue::new(9);
        // fill half
        for id in 1..=4 {
            q.enqueue(ticket(id)).unwrap();
        }
        // drain a quarter
        assert_eq!(q.dequeue().unwrap().ticket_id, 1);
        assert_eq!(q.dequeue().unwrap().ticket_id, 2);
        // fill a quarter more, advancing past the buffer end over time
        for id in 5..=10 {
            q.enqueue(ticket(id)).unwrap();
        }
        for id in 3..=10 {
            assert_eq!(q.dequeue().unwrap().ticket_id, id);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_empty_after_last_dequeue_then_reusable() {
        let mut q = TicketQueue::new(4);
        q.enqueue(ticket(1)).unwrap();
        assert_eq!(q.dequeue().unwrap().ticket_id, 1);
        assert!(q.is_empty());
        assert!(q.dequeue().is_none());
        q.enqueue(ticket(2)).unwrap();
        assert_eq!(q.peek().unwrap().ticket_id, 2);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_iter_is_restartable_and_non_mutating() {
        let mut q = TicketQueue::new(8);
        for id in 1..=3 {
            q.enqueue(ticket(id)).unwrap();
        }
        let first: Vec<u32> = q.iter().map(|t| t.ticket_id).collect();
        let second: Vec<u32> = q.iter().map(|t| t.ticket_id).collect();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_for_each_mut_edits_in_place() {
        let mut q = TicketQueue::new(8);
        for id in 1..=3 {
            q.enqueue(ticket(id)).unwrap();
        }
        q.for_each_mut(|t| t.priority = Priority::High);
        assert!(q.iter().all(|t| t.priority == Priority::High));
        assert_eq!(q.len(), 3);
    }
}
