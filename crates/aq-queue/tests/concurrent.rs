//! Multi-threaded tests against the real queue.
//!
//! Producers insert disjoint value ranges, consumers remove until they
//! observe a timeout, and the recorded history is checked against the
//! reference model afterwards.
#![cfg(not(loom))]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use aq_core::{PropertyChecker, QueuePropertyChecker};
use aq_queue::AdaptiveQueue;

const PRODUCERS: u64 = 4;
const CONSUMERS: usize = 4;
const ITEMS_PER_PRODUCER: u64 = 250;

#[test]
fn test_no_lost_or_duplicated_elements() {
    let (queue, sink) = AdaptiveQueue::recorded(2).unwrap();
    let queue = Arc::new(queue);
    let start = Arc::new(Barrier::new(PRODUCERS as usize + CONSUMERS));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for i in 0..ITEMS_PER_PRODUCER {
                    queue.insert(p * 10_000 + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut got = Vec::new();
                while let Some(v) = queue.remove(Duration::from_millis(200)) {
                    got.push(v);
                }
                got
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    let mut removed = Vec::new();
    for handle in consumers {
        removed.extend(handle.join().unwrap());
    }

    let total = (PRODUCERS * ITEMS_PER_PRODUCER) as usize;
    assert_eq!(removed.len(), total, "every element removed exactly once");
    let unique: HashSet<u64> = removed.iter().copied().collect();
    assert_eq!(unique.len(), total);
    assert!(queue.is_empty());

    // Each producer's values leave the queue in the order it inserted them.
    let history = sink.history();
    for p in 0..PRODUCERS {
        let mine: Vec<u64> = history
            .removed()
            .into_iter()
            .filter(|v| v / 10_000 == p)
            .collect();
        let expected: Vec<u64> = (0..ITEMS_PER_PRODUCER).map(|i| p * 10_000 + i).collect();
        assert_eq!(mine, expected, "producer {} order", p);
    }

    let checker = QueuePropertyChecker::new(queue.as_ref());
    assert!(checker.all_hold(), "{:?}", checker.failures());
}

#[test]
fn test_observed_count_within_capacity_under_stress() {
    let (queue, _sink) = AdaptiveQueue::recorded(1).unwrap();
    let queue = Arc::new(queue);
    let stop = Arc::new(AtomicBool::new(false));

    let observer = {
        let queue = Arc::clone(&queue);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut observations = 0u64;
            while !stop.load(Ordering::Acquire) {
                let snapshot = queue.snapshot();
                assert!(snapshot.capacity >= 1);
                assert!(
                    snapshot.count <= snapshot.capacity,
                    "observed {:?}",
                    snapshot
                );
                assert_eq!((snapshot.head + snapshot.count) % snapshot.capacity, snapshot.tail);
                observations += 1;
            }
            observations
        })
    };

    let workers: Vec<_> = (0..8u64)
        .map(|w| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..500 {
                    if (w + i) % 3 == 0 {
                        queue.remove(Duration::from_micros(50));
                    } else {
                        queue.insert(w * 1_000 + i);
                    }
                }
            })
        })
        .collect();

    for handle in workers {
        handle.join().unwrap();
    }
    stop.store(true, Ordering::Release);
    assert!(observer.join().unwrap() > 0);

    while queue.try_remove().is_some() {}
    let checker = QueuePropertyChecker::new(queue.as_ref());
    assert!(checker.all_hold(), "{:?}", checker.failures());
}

#[test]
fn test_timeout_is_not_consumed_by_late_insert() {
    let (queue, _sink) = AdaptiveQueue::recorded(4).unwrap();
    let queue = Arc::new(queue);

    // First remove times out, then a late element must still be delivered.
    assert_eq!(queue.remove(Duration::from_millis(5)), None);

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.remove(Duration::from_secs(5)))
    };
    thread::sleep(Duration::from_millis(10));
    queue.insert(3);

    assert_eq!(consumer.join().unwrap(), Some(3));
    assert_eq!(queue.len(), 0);
}
