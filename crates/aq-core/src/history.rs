//! Linearized operation history.
//!
//! A history is recorded from inside the queue's critical section, so the
//! order of operations here is the order in which they mutated the queue.
//! Each insert or remove that triggered a resize is preceded by its
//! `Resize` entry; the insert/remove entry then reports post-resize values.

use std::fmt;

/// Direction of a capacity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeDirection {
    /// Capacity doubled after an insert filled the queue.
    Grew,
    /// Capacity halved after a remove left it under a quarter full.
    Shrank,
}

impl fmt::Display for ResizeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeDirection::Grew => f.write_str("grew"),
            ResizeDirection::Shrank => f.write_str("shrank"),
        }
    }
}

/// What an operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOpKind {
    Insert {
        value: u64,
        count: usize,
        capacity: usize,
    },
    Remove {
        value: u64,
        count: usize,
        capacity: usize,
    },
    Resize {
        direction: ResizeDirection,
        capacity: usize,
    },
}

impl fmt::Display for QueueOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueOpKind::Insert { value, .. } => write!(f, "insert({})", value),
            QueueOpKind::Remove { value, .. } => write!(f, "remove() -> {}", value),
            QueueOpKind::Resize {
                direction,
                capacity,
            } => write!(f, "{} to {}", direction, capacity),
        }
    }
}

/// A single recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOperation {
    /// 1-based position in the history
    pub step: u64,
    pub kind: QueueOpKind,
}

/// History of queue operations in linearization order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueHistory {
    /// Capacity the queue was constructed with, once known
    pub initial_capacity: Option<usize>,
    /// Operations in the order they completed under the lock
    pub operations: Vec<QueueOperation>,
}

impl QueueHistory {
    /// Create a new empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history for a queue of known initial capacity.
    #[must_use]
    pub fn with_initial_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "initial capacity must be positive");
        Self {
            initial_capacity: Some(capacity),
            operations: Vec::new(),
        }
    }

    /// Record the queue's construction.
    pub fn record_start(&mut self, capacity: usize) {
        debug_assert!(
            self.operations.is_empty(),
            "start must precede every operation"
        );
        self.initial_capacity = Some(capacity);
    }

    pub fn record_insert(&mut self, value: u64, count: usize, capacity: usize) {
        self.push(QueueOpKind::Insert {
            value,
            count,
            capacity,
        });
    }

    pub fn record_remove(&mut self, value: u64, count: usize, capacity: usize) {
        self.push(QueueOpKind::Remove {
            value,
            count,
            capacity,
        });
    }

    pub fn record_resize(&mut self, direction: ResizeDirection, capacity: usize) {
        self.push(QueueOpKind::Resize {
            direction,
            capacity,
        });
    }

    fn push(&mut self, kind: QueueOpKind) {
        let step = self.operations.len() as u64 + 1;
        self.operations.push(QueueOperation { step, kind });
    }

    /// Inserted values in insertion order.
    #[must_use]
    pub fn inserted(&self) -> Vec<u64> {
        self.operations
            .iter()
            .filter_map(|op| match op.kind {
                QueueOpKind::Insert { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Removed values in removal order.
    #[must_use]
    pub fn removed(&self) -> Vec<u64> {
        self.operations
            .iter()
            .filter_map(|op| match op.kind {
                QueueOpKind::Remove { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Resize events as `(direction, new capacity)`.
    #[must_use]
    pub fn resizes(&self) -> Vec<(ResizeDirection, usize)> {
        self.operations
            .iter()
            .filter_map(|op| match op.kind {
                QueueOpKind::Resize {
                    direction,
                    capacity,
                } => Some((direction, capacity)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
