//! Adaptive queue invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | CapacityBounds | `0 <= count <= capacity` and `capacity >= 1`, now and at every recorded step |
//! | NoLostElements | Every inserted element was removed or is still queued |
//! | NoDuplicates | Nothing is removed or queued more often than it was inserted |
//! | FifoOrder | Every remove returned the oldest element still present |
//! | AdaptivePolicy | Every reported count, capacity and resize matches the reference model |
//!
//! Elements may repeat (producers draw from a small value range), so the
//! element properties compare multisets, not sets.

use std::collections::{BTreeMap, VecDeque};

use crate::counterexample::Counterexample;
use crate::history::{QueueHistory, QueueOpKind, ResizeDirection};
use crate::model::QueueModel;
use crate::property::{PropertyChecker, PropertyResult};

/// Observable state an adaptive queue implementation exposes for checking.
pub trait QueueProperties {
    /// Every inserted element, in insertion order.
    fn inserted_elements(&self) -> Vec<u64>;

    /// Every removed element, in removal order.
    fn removed_elements(&self) -> Vec<u64>;

    /// Current contents, front to back.
    fn current_contents(&self) -> Vec<u64>;

    /// Current capacity.
    fn capacity(&self) -> usize;

    /// Linearized operation history.
    /// Returns owned data to avoid lifetime issues with internal mutexes.
    fn history(&self) -> QueueHistory;
}

/// Property checker for adaptive queue implementations.
pub struct QueuePropertyChecker<'a, T: QueueProperties> {
    queue: &'a T,
    dst_seed: Option<u64>,
}

fn multiset(values: &[u64]) -> BTreeMap<u64, usize> {
    let mut counts = BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
}

impl<'a, T: QueueProperties> QueuePropertyChecker<'a, T> {
    #[must_use]
    pub fn new(queue: &'a T) -> Self {
        Self {
            queue,
            dst_seed: None,
        }
    }

    /// Set DST seed for counterexample reproduction.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        self.dst_seed = Some(seed);
        self
    }

    fn counterexample(&self, history: &QueueHistory, step: u64, description: String) -> Counterexample {
        Counterexample::from_history(history, step, self.dst_seed).with_description(description)
    }

    fn check_capacity_bounds(&self) -> PropertyResult {
        let count = self.queue.current_contents().len();
        let capacity = self.queue.capacity();

        if capacity == 0 {
            return PropertyResult::fail("CapacityBounds", "capacity is 0", None);
        }
        if count > capacity {
            return PropertyResult::fail(
                "CapacityBounds",
                format!("queue holds {} elements but capacity is {}", count, capacity),
                None,
            );
        }

        let history = self.queue.history();
        for op in &history.operations {
            let (count, capacity) = match op.kind {
                QueueOpKind::Insert {
                    count, capacity, ..
                }
                | QueueOpKind::Remove {
                    count, capacity, ..
                } => (count, capacity),
                QueueOpKind::Resize { capacity, .. } => (0, capacity),
            };
            if capacity == 0 || count > capacity {
                let message = format!(
                    "step {} reported count {} with capacity {}",
                    op.step, count, capacity
                );
                let ce = self.counterexample(&history, op.step, message.clone());
                return PropertyResult::fail("CapacityBounds", message, Some(ce));
            }
        }

        PropertyResult::pass("CapacityBounds")
    }

    fn check_no_lost_elements(&self) -> PropertyResult {
        let inserted = multiset(&self.queue.inserted_elements());
        let removed = multiset(&self.queue.removed_elements());
        let contents = multiset(&self.queue.current_contents());

        for (value, &times) in &inserted {
            let accounted =
                removed.get(value).copied().unwrap_or(0) + contents.get(value).copied().unwrap_or(0);
            if accounted < times {
                let mut ce = match self.dst_seed {
                    Some(seed) => Counterexample::with_seed(seed),
                    None => Counterexample::new(),
                };
                ce.add_state(crate::counterexample::StateSnapshot {
                    step: 1,
                    description: format!("Element {} lost", value),
                    variables: vec![
                        ("inserted".to_string(), times.to_string()),
                        ("removed".to_string(), removed.get(value).copied().unwrap_or(0).to_string()),
                        ("queued".to_string(), contents.get(value).copied().unwrap_or(0).to_string()),
                    ],
                });
                return PropertyResult::fail(
                    "NoLostElements",
                    format!(
                        "Element {} was inserted {} time(s) but only {} are removed or queued",
                        value, times, accounted
                    ),
                    Some(ce),
                );
            }
        }

        PropertyResult::pass("NoLostElements")
    }

    fn check_no_duplicates(&self) -> PropertyResult {
        let inserted = multiset(&self.queue.inserted_elements());
        let mut seen = multiset(&self.queue.removed_elements());
        for value in self.queue.current_contents() {
            *seen.entry(value).or_insert(0) += 1;
        }

        for (value, &times) in &seen {
            let allowed = inserted.get(value).copied().unwrap_or(0);
            if times > allowed {
                return PropertyResult::fail(
                    "NoDuplicates",
                    format!(
                        "Element {} seen {} time(s) but inserted only {}",
                        value, times, allowed
                    ),
                    None,
                );
            }
        }

        PropertyResult::pass("NoDuplicates")
    }

    /// Replays inserts and removes in history order; every remove must
    /// return the front of the replayed queue.
    fn check_fifo_order(&self) -> PropertyResult {
        let history = self.queue.history();
        let mut replay: VecDeque<u64> = VecDeque::new();

        for op in &history.operations {
            match op.kind {
                QueueOpKind::Insert { value, .. } => replay.push_back(value),
                QueueOpKind::Remove { value, .. } => match replay.pop_front() {
                    Some(expected) if expected == value => {}
                    Some(expected) => {
                        let message = format!(
                            "remove returned {} but the oldest element was {} (step {})",
                            value, expected, op.step
                        );
                        let ce = self.counterexample(&history, op.step, message.clone());
                        return PropertyResult::fail("FifoOrder", message, Some(ce));
                    }
                    None => {
                        let message = format!(
                            "remove returned {} from an empty queue (step {})",
                            value, op.step
                        );
                        let ce = self.counterexample(&history, op.step, message.clone());
                        return PropertyResult::fail("FifoOrder", message, Some(ce));
                    }
                },
                QueueOpKind::Resize { .. } => {}
            }
        }

        PropertyResult::pass("FifoOrder")
    }

    /// Replays the history through the model and compares the reported
    /// count and capacity of every step, and every resize.
    fn check_adaptive_policy(&self) -> PropertyResult {
        let history = self.queue.history();
        let Some(initial) = history.initial_capacity else {
            return PropertyResult::pass("AdaptivePolicy");
        };

        let mut model = QueueModel::new(initial);
        let mut pending: Option<(ResizeDirection, usize)> = None;

        for op in &history.operations {
            let (reported_count, reported_capacity, step) = match op.kind {
                QueueOpKind::Resize {
                    direction,
                    capacity,
                } => {
                    if pending.is_some() {
                        let message = format!("two resizes in a row (step {})", op.step);
                        let ce = self.counterexample(&history, op.step, message.clone());
                        return PropertyResult::fail("AdaptivePolicy", message, Some(ce));
                    }
                    pending = Some((direction, capacity));
                    continue;
                }
                QueueOpKind::Insert {
                    value,
                    count,
                    capacity,
                } => {
                    if model.is_full() {
                        let message = format!("insert into a full queue (step {})", op.step);
                        let ce = self.counterexample(&history, op.step, message.clone());
                        return PropertyResult::fail("AdaptivePolicy", message, Some(ce));
                    }
                    (count, capacity, model.insert(value))
                }
                QueueOpKind::Remove {
                    count, capacity, ..
                } => match model.remove() {
                    Some((_, step)) => (count, capacity, step),
                    // Reported by FifoOrder
                    None => return PropertyResult::pass("AdaptivePolicy"),
                },
            };

            let resized = pending.take();
            if step.resized != resized {
                let message = format!(
                    "step {}: expected resize {:?} but recorded {:?}",
                    op.step, step.resized, resized
                );
                let ce = self.counterexample(&history, op.step, message.clone());
                return PropertyResult::fail("AdaptivePolicy", message, Some(ce));
            }
            if (reported_count, reported_capacity) != (step.count, step.capacity) {
                let message = format!(
                    "step {}: reported count={} capacity={} but model has count={} capacity={}",
                    op.step, reported_count, reported_capacity, step.count, step.capacity
                );
                let ce = self.counterexample(&history, op.step, message.clone());
                return PropertyResult::fail("AdaptivePolicy", message, Some(ce));
            }
        }

        if let Some((direction, capacity)) = pending {
            return PropertyResult::fail(
                "AdaptivePolicy",
                format!(
                    "history ends with a resize ({} to {}) that no operation reported",
                    direction, capacity
                ),
                None,
            );
        }

        PropertyResult::pass("AdaptivePolicy")
    }
}

impl<T: QueueProperties> PropertyChecker for QueuePropertyChecker<'_, T> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_capacity_bounds(),
            self.check_no_lost_elements(),
            self.check_no_duplicates(),
            self.check_fifo_order(),
            self.check_adaptive_policy(),
        ]
    }
}
