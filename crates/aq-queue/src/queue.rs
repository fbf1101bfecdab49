//! Bounded adaptive queue.
//!
//! # Protocol
//!
//! One mutex guards the ring and the event sink. Two condition variables
//! hang off it:
//!
//! | Condvar | Waiters | Predicate | Signalled by |
//! |---------|---------|-----------|--------------|
//! | `not_full` | inserters | `count < capacity` | every remove (`notify_one`) |
//! | `not_empty` | removers | `count > 0` | every insert (`notify_one`) |
//!
//! Waiters re-check their predicate after every wake. A resize always
//! runs as the last mutation inside the critical section of the insert or
//! remove that triggered it, so no other thread can observe new indices
//! with the old capacity.
//!
//! # Capacity policy
//!
//! - After an insert, `count == capacity` doubles capacity.
//! - After a remove, `count < capacity / 4 && capacity > 1` halves it.
//!
//! Both thresholds use integer division. Under the first rule no completed
//! operation leaves the queue full, so with this policy the `not_full` wait
//! is never entered in practice.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use aq_core::{QueueHistory, QueueProperties, ResizeDirection};

use crate::error::QueueError;
use crate::ring::Ring;
use crate::sink::{EventSink, FileSink, MemorySink, QueueEvent, TracingSink};
use crate::sync::{Condvar, Mutex, MutexGuard};

const POISONED: &str = "adaptive queue mutex poisoned by a panicking thread";

/// Consistent view of the queue indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub count: usize,
    pub capacity: usize,
    pub head: usize,
    pub tail: usize,
}

/// Everything behind the lock.
struct State<T, S> {
    ring: Ring<T>,
    sink: S,
}

impl<T, S: EventSink<T>> State<T, S> {
    fn insert(&mut self, element: T) {
        self.ring.push_back(element);

        if self.ring.is_full() {
            let capacity = self.ring.capacity() * 2;
            self.ring.resize(capacity);
            self.sink.record(&QueueEvent::Resized {
                direction: ResizeDirection::Grew,
                capacity,
            });
        }
        self.ring.assert_consistent();

        let (count, capacity) = (self.ring.len(), self.ring.capacity());
        let Some(value) = self.ring.back() else {
            unreachable!("ring is empty right after an insert");
        };
        self.sink.record(&QueueEvent::Inserted {
            value,
            count,
            capacity,
        });
    }

    fn remove(&mut self) -> Option<T> {
        let value = self.ring.pop_front()?;

        let capacity = self.ring.capacity();
        if self.ring.len() < capacity / 4 && capacity > 1 {
            self.ring.resize(capacity / 2);
            self.sink.record(&QueueEvent::Resized {
                direction: ResizeDirection::Shrank,
                capacity: capacity / 2,
            });
        }
        self.ring.assert_consistent();

        self.sink.record(&QueueEvent::Removed {
            value: &value,
            count: self.ring.len(),
            capacity: self.ring.capacity(),
        });
        Some(value)
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            count: self.ring.len(),
            capacity: self.ring.capacity(),
            head: self.ring.head(),
            tail: self.ring.tail(),
        }
    }
}

/// A bounded MPMC queue that doubles when it fills and halves when it
/// drops under a quarter full.
///
/// Share it between producer and consumer threads through an `Arc`; every
/// method takes `&self`.
pub struct AdaptiveQueue<T, S = TracingSink> {
    state: Mutex<State<T, S>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T, S: EventSink<T>> AdaptiveQueue<T, S> {
    /// Create an empty queue with `initial_capacity` slots.
    ///
    /// Records a `Started` event on `sink` before returning.
    pub fn new(initial_capacity: usize, mut sink: S) -> Result<Self, QueueError> {
        if initial_capacity == 0 {
            return Err(QueueError::InvalidCapacity {
                requested: initial_capacity,
            });
        }

        sink.record(&QueueEvent::Started {
            capacity: initial_capacity,
        });

        Ok(Self {
            state: Mutex::new(State {
                ring: Ring::with_capacity(initial_capacity),
                sink,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State<T, S>> {
        self.state.lock().expect(POISONED)
    }

    /// Insert `element`, waiting for as long as the queue is full.
    ///
    /// Wakes one blocked remover.
    pub fn insert(&self, element: T) {
        let mut state = self.lock();
        while state.ring.is_full() {
            state = self.not_full.wait(state).expect(POISONED);
        }

        state.insert(element);
        self.not_empty.notify_one();
    }

    /// Insert `element`, waiting at most `timeout` for free capacity.
    ///
    /// Returns the element back if the deadline passes while the queue
    /// stays full.
    pub fn insert_timeout(&self, element: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now().checked_add(timeout);

        let mut state = self.lock();
        while state.ring.is_full() {
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(element);
                    }
                    let (guard, _) = self
                        .not_full
                        .wait_timeout(state, deadline - now)
                        .expect(POISONED);
                    guard
                }
                None => self.not_full.wait(state).expect(POISONED),
            };
        }

        state.insert(element);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest element, waiting at most `timeout` for one.
    ///
    /// Returns `None` once the deadline has passed with the queue still
    /// empty. That is the normal end-of-work signal for consumers, not an
    /// error, and it leaves the queue untouched. An element that is present
    /// is always taken, even if the deadline has also passed. A zero
    /// timeout polls.
    ///
    /// Wakes one blocked inserter.
    pub fn remove(&self, timeout: Duration) -> Option<T> {
        // A timeout too large for an Instant waits without deadline.
        let deadline = Instant::now().checked_add(timeout);

        let mut state = self.lock();
        while state.ring.is_empty() {
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    let (guard, _) = self
                        .not_empty
                        .wait_timeout(state, deadline - now)
                        .expect(POISONED);
                    guard
                }
                None => self.not_empty.wait(state).expect(POISONED),
            };
        }

        let value = state.remove();
        self.not_full.notify_one();
        value
    }

    /// Remove the oldest element if there is one, without waiting.
    pub fn try_remove(&self) -> Option<T> {
        self.remove(Duration::ZERO)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().ring.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().ring.capacity()
    }

    /// Count, capacity and indices read under one lock acquisition.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` against the sink while holding the queue lock.
    pub fn with_sink<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().sink)
    }
}

impl<T: Clone, S: EventSink<T>> AdaptiveQueue<T, S> {
    /// Current elements, front to back.
    #[must_use]
    pub fn contents(&self) -> Vec<T> {
        self.lock().ring.iter().cloned().collect()
    }
}

impl<T: fmt::Debug> AdaptiveQueue<T, TracingSink> {
    /// Queue that reports through `tracing`.
    pub fn traced(initial_capacity: usize) -> Result<Self, QueueError> {
        Self::new(initial_capacity, TracingSink)
    }
}

impl<T: fmt::Display> AdaptiveQueue<T, FileSink> {
    /// Queue that writes one line per event to the file at `path`.
    ///
    /// Fails if the file cannot be created; no queue exists without its
    /// log.
    pub fn with_log_file(initial_capacity: usize, path: impl AsRef<Path>) -> Result<Self, QueueError> {
        // Checked before the sink exists so an invalid capacity creates no file.
        if initial_capacity == 0 {
            return Err(QueueError::InvalidCapacity {
                requested: initial_capacity,
            });
        }
        Self::new(initial_capacity, FileSink::create(path)?)
    }
}

impl AdaptiveQueue<u64, MemorySink> {
    /// Queue that records its history in memory, plus a handle to read it.
    pub fn recorded(initial_capacity: usize) -> Result<(Self, MemorySink), QueueError> {
        let sink = MemorySink::new();
        let queue = Self::new(initial_capacity, sink.clone())?;
        Ok((queue, sink))
    }
}

/// History and contents are read under separate lock acquisitions: check
/// properties only while no other thread is operating on the queue.
impl QueueProperties for AdaptiveQueue<u64, MemorySink> {
    fn inserted_elements(&self) -> Vec<u64> {
        self.history().inserted()
    }

    fn removed_elements(&self) -> Vec<u64> {
        self.history().removed()
    }

    fn current_contents(&self) -> Vec<u64> {
        self.contents()
    }

    fn capacity(&self) -> usize {
        AdaptiveQueue::capacity(self)
    }

    fn history(&self) -> QueueHistory {
        self.with_sink(MemorySink::history)
    }
}

impl<T, S> fmt::Debug for AdaptiveQueue<T, S>
where
    S: EventSink<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("AdaptiveQueue")
            .field("count", &snapshot.count)
            .field("capacity", &snapshot.capacity)
            .field("head", &snapshot.head)
            .field("tail", &snapshot.tail)
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use aq_core::{PropertyChecker, QueuePropertyChecker};
    use std::sync::Arc;
    use std::thread;

    fn recorded(capacity: usize) -> AdaptiveQueue<u64, MemorySink> {
        AdaptiveQueue::recorded(capacity).unwrap().0
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = AdaptiveQueue::<u64, _>::new(0, MemorySink::new()).unwrap_err();
        assert!(matches!(err, QueueError::InvalidCapacity { requested: 0 }));
    }

    #[test]
    fn test_starts_empty() {
        let queue = recorded(3);
        assert_eq!(
            queue.snapshot(),
            QueueSnapshot {
                count: 0,
                capacity: 3,
                head: 0,
                tail: 0
            }
        );
        assert!(queue.is_empty());
        assert_eq!(queue.history().initial_capacity, Some(3));
    }

    #[test]
    fn test_grows_when_filled() {
        let queue = recorded(4);
        for v in 1..=3 {
            queue.insert(v);
        }
        assert_eq!(queue.capacity(), 4);

        queue.insert(4);
        let snapshot = queue.snapshot();
        assert_eq!(snapshot.capacity, 8);
        assert_eq!(snapshot.count, 4);
        assert_eq!((snapshot.head, snapshot.tail), (0, 4));
    }

    #[test]
    fn test_fifo_across_growth() {
        let queue = recorded(4);
        for v in [1, 2, 3, 4] {
            queue.insert(v);
        }
        assert_eq!(queue.capacity(), 8);

        let removed: Vec<u64> = (0..4)
            .map(|_| queue.remove(Duration::from_millis(10)).unwrap())
            .collect();
        assert_eq!(removed, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_shrinks_under_a_quarter() {
        let queue = recorded(8);
        for v in 1..=3 {
            queue.insert(v);
        }

        queue.try_remove();
        assert_eq!(queue.capacity(), 8, "2 of 8 is not under a quarter");
        queue.try_remove();
        assert_eq!(queue.capacity(), 4, "1 of 8 is");
        queue.try_remove();
        assert_eq!(queue.capacity(), 2, "0 of 4 is");
    }

    #[test]
    fn test_capacity_one_never_shrinks() {
        let queue = recorded(1);
        queue.insert(1);
        assert_eq!(queue.capacity(), 2);
        queue.try_remove();
        // 0 < 2/4 is false
        assert_eq!(queue.capacity(), 2);

        let queue = recorded(2);
        for _ in 0..10 {
            queue.try_remove();
        }
        assert_eq!(queue.capacity(), 2);
    }

    #[test]
    fn test_never_shrinks_below_one() {
        let queue = recorded(64);
        queue.insert(1);
        queue.try_remove();
        // 64 -> 32 on the first remove, nothing further without removes
        assert_eq!(queue.capacity(), 32);

        for round in 0..20 {
            queue.insert(round);
            queue.try_remove();
            assert!(queue.capacity() >= 1);
        }
        assert!(queue.capacity() >= 2);
    }

    #[test]
    fn test_relinearizes_wrapped_ring_on_shrink() {
        let queue = recorded(16);
        // Walk head around so the live range wraps.
        for v in 0..15 {
            queue.insert(v);
        }
        assert_eq!(queue.capacity(), 16);
        for _ in 0..10 {
            queue.try_remove();
        }
        for v in 100..108 {
            queue.insert(v);
        }
        while queue.len() > 3 {
            queue.try_remove();
        }

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.head, 0, "{:?}", snapshot);
        assert_eq!(queue.contents(), vec![105, 106, 107]);
        QueuePropertyChecker::new(&queue).assert_all_hold();
    }

    #[test]
    fn test_remove_times_out_on_empty_queue() {
        let queue = recorded(2);
        let timeout = Duration::from_millis(30);

        let started = Instant::now();
        assert_eq!(queue.remove(timeout), None);
        assert!(started.elapsed() >= timeout);
        assert_eq!(queue.len(), 0);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn test_zero_timeout_polls() {
        let queue = recorded(2);
        assert_eq!(queue.try_remove(), None);
        queue.insert(9);
        assert_eq!(queue.try_remove(), Some(9));
    }

    #[test]
    fn test_huge_timeout_still_returns_present_element() {
        let queue = recorded(2);
        queue.insert(5);
        assert_eq!(queue.remove(Duration::MAX), Some(5));
    }

    #[test]
    fn test_blocked_remove_wakes_on_insert() {
        let queue = Arc::new(recorded(2));

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.remove(Duration::from_secs(10)))
        };

        thread::sleep(Duration::from_millis(20));
        queue.insert(77);

        assert_eq!(consumer.join().unwrap(), Some(77));
    }

    #[test]
    fn test_insert_timeout_succeeds() {
        let queue = recorded(1);
        assert_eq!(queue.insert_timeout(1, Duration::ZERO), Ok(()));
        assert_eq!(queue.insert_timeout(2, Duration::from_millis(5)), Ok(()));
        assert_eq!(queue.contents(), vec![1, 2]);
    }

    #[test]
    fn test_event_order_matches_mutations() {
        let (queue, sink) = AdaptiveQueue::recorded(1).unwrap();
        queue.insert(10);
        queue.insert(11);
        queue.try_remove();
        queue.try_remove();

        let kinds: Vec<String> = sink
            .history()
            .operations
            .iter()
            .map(|op| op.kind.to_string())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "grew to 2",
                "insert(10)",
                "grew to 4",
                "insert(11)",
                "remove() -> 10",
                "shrank to 2",
                "remove() -> 11",
            ]
        );
    }

    #[test]
    fn test_properties_hold_after_mixed_sequence() {
        let queue = recorded(3);
        for round in 0..50u64 {
            for v in 0..(round % 7) {
                queue.insert(round * 10 + v);
            }
            for _ in 0..(round % 5) {
                queue.try_remove();
            }
        }

        let checker = QueuePropertyChecker::new(&queue);
        assert!(checker.all_hold(), "{:?}", checker.failures());
    }

    #[test]
    fn test_property_view_derives_count_and_initial_capacity() {
        let queue = recorded(3);
        for v in 1..=5 {
            queue.insert(v);
        }
        queue.try_remove();

        let history = QueueProperties::history(&queue);
        assert_eq!(history.initial_capacity, Some(3));
        assert_eq!(queue.current_contents().len(), queue.len());
        assert_eq!(queue.current_contents(), vec![2, 3, 4, 5]);
        assert_eq!(QueueProperties::capacity(&queue), queue.snapshot().capacity);
    }

    #[test]
    fn test_generic_elements() {
        let queue: AdaptiveQueue<String> = AdaptiveQueue::traced(2).unwrap();
        queue.insert("a".to_string());
        queue.insert("b".to_string());
        assert_eq!(queue.contents(), vec!["a", "b"]);
        assert_eq!(queue.try_remove().as_deref(), Some("a"));
    }

    #[test]
    fn test_debug_shows_indices() {
        let queue = recorded(2);
        queue.insert(1);
        let rendered = format!("{:?}", queue);
        assert!(rendered.contains("count: 1"));
        assert!(rendered.contains("capacity: 2"));
    }
}

#[cfg(loom)]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    // Timeouts are not modelled by loom; every remove below is guaranteed
    // an element in every interleaving.
    const WAIT: Duration = Duration::from_secs(60);

    #[test]
    fn test_insert_remove_handoff() {
        loom::model(|| {
            let queue = Arc::new(AdaptiveQueue::recorded(1).unwrap().0);

            let producer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.insert(1))
            };
            let consumer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.remove(WAIT))
            };

            producer.join().unwrap();
            assert_eq!(consumer.join().unwrap(), Some(1));
            assert!(queue.is_empty());
        });
    }

    #[test]
    fn test_concurrent_inserts_resize() {
        loom::model(|| {
            let queue = Arc::new(AdaptiveQueue::recorded(1).unwrap().0);

            let handles: Vec<_> = [1, 2]
                .into_iter()
                .map(|v| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || queue.insert(v))
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(queue.capacity(), 4);
            let mut values = queue.contents();
            values.sort_unstable();
            assert_eq!(values, vec![1, 2]);
        });
    }

    #[test]
    fn test_two_consumers_two_elements() {
        loom::model(|| {
            let queue = Arc::new(AdaptiveQueue::recorded(2).unwrap().0);

            let consumers: Vec<_> = (0..2)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || queue.remove(WAIT))
                })
                .collect();

            queue.insert(1);
            queue.insert(2);

            let mut got: Vec<u64> = consumers
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect();
            got.sort_unstable();
            assert_eq!(got, vec![1, 2]);
        });
    }
}
