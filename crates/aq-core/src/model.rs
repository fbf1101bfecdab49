//! Sequential reference model of the adaptive capacity policy.
//!
//! The model has no slots and no indices: a `VecDeque` plus a capacity
//! number. Replaying a recorded history through it tells us what every
//! reported count, capacity and resize should have been.

use std::collections::VecDeque;

use crate::history::ResizeDirection;

/// Growth rule: an insert that leaves the queue full doubles it.
#[must_use]
pub fn grows_after_insert(count: usize, capacity: usize) -> bool {
    count == capacity
}

/// Shrink rule: a remove that leaves fewer than `capacity / 4` elements
/// halves it, unless capacity is already 1. Integer division is intended.
#[must_use]
pub fn shrinks_after_remove(count: usize, capacity: usize) -> bool {
    capacity > 1 && count < capacity / 4
}

/// Observable result of one model operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStep {
    /// Count after the operation
    pub count: usize,
    /// Capacity after the operation (post-resize)
    pub capacity: usize,
    /// Resize triggered by the operation, if any
    pub resized: Option<(ResizeDirection, usize)>,
}

/// Reference queue.
#[derive(Debug, Clone)]
pub struct QueueModel {
    items: VecDeque<u64>,
    capacity: usize,
}

impl QueueModel {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "capacity must be positive");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// True when an insert would have to wait.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn insert(&mut self, value: u64) -> ModelStep {
        debug_assert!(!self.is_full(), "model insert into a full queue");
        self.items.push_back(value);

        let mut resized = None;
        if grows_after_insert(self.items.len(), self.capacity) {
            self.capacity *= 2;
            resized = Some((ResizeDirection::Grew, self.capacity));
        }
        self.step(resized)
    }

    pub fn remove(&mut self) -> Option<(u64, ModelStep)> {
        let value = self.items.pop_front()?;

        let mut resized = None;
        if shrinks_after_remove(self.items.len(), self.capacity) {
            self.capacity /= 2;
            resized = Some((ResizeDirection::Shrank, self.capacity));
        }
        Some((value, self.step(resized)))
    }

    fn step(&self, resized: Option<(ResizeDirection, usize)>) -> ModelStep {
        ModelStep {
            count: self.items.len(),
            capacity: self.capacity,
            resized,
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Elements front to back.
    #[must_use]
    pub fn contents(&self) -> Vec<u64> {
        self.items.iter().copied().collect()
    }
}
