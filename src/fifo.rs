//! Fixed-capacity FIFO with a drop-oldest overflow policy.
//!
//! Serial adapters buffer incoming bytes in a small circular queue. When the
//! producer outruns the consumer the oldest unread entry is overwritten, the
//! same data loss a real overrun produces. `BoundedFifo` implements that
//! policy on top of a `VecDeque`.

use std::collections::VecDeque;

/// Bounded first-in first-out queue.
///
/// # Examples
///
/// ```
/// use sbc6502::BoundedFifo;
///
/// let mut fifo = BoundedFifo::new(2);
/// assert_eq!(fifo.push(1), None);
/// assert_eq!(fifo.push(2), None);
/// assert_eq!(fifo.push(3), Some(1)); // oldest entry displaced
/// assert_eq!(fifo.pop(), Some(2));
/// assert_eq!(fifo.pop(), Some(3));
/// assert!(fifo.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BoundedFifo<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedFifo<T> {
    /// Create an empty FIFO holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one so every push has somewhere to go.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the displaced oldest entry if the FIFO was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let displaced = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        displaced
    }

    /// Remove and return the oldest entry.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Oldest entry without removing it.
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry without releasing the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
