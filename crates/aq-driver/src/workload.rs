//! Producer/consumer workload.
//!
//! P producers each insert `items_per_producer` random values in `0..100`,
//! sleeping `insert_delay` after every insert. C consumers loop on
//! `remove(remove_timeout)`, pausing `consume_pause` after every success,
//! and stop at their first timeout.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aq_queue::{AdaptiveQueue, EventSink, FileSink, QueueError, TracingSink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, WorkloadConfig};

/// Exclusive upper bound of inserted values.
const VALUE_MAX: u64 = 100;

/// Queue type the driver runs against: log file plus tracing events.
pub type DriverQueue = AdaptiveQueue<u64, (FileSink, TracingSink)>;

/// Errors from running a workload.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("{role} thread {index} panicked")]
    WorkerPanicked { role: &'static str, index: usize },
}

/// Summary of a finished workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadReport {
    pub seed: u64,
    pub producers: usize,
    pub consumers: usize,
    pub inserted: u64,
    pub removed: u64,
    pub final_count: usize,
    pub final_capacity: usize,
    pub elapsed_ms: u64,
}

/// Validate `config` and build the queue with a file log at
/// `config.log_file` and tracing events.
pub fn build_queue(config: &WorkloadConfig) -> Result<DriverQueue, DriverError> {
    // Validated before the sink exists so an invalid config creates no file.
    config.validate()?;
    let file = FileSink::create(&config.log_file)?;
    Ok(AdaptiveQueue::new(config.initial_capacity, (file, TracingSink))?)
}

/// Run the workload against `queue` and wait for every thread.
///
/// The queue is passed in so callers choose its sink.
pub fn run_workload<S>(
    config: &WorkloadConfig,
    queue: Arc<AdaptiveQueue<u64, S>>,
) -> Result<WorkloadReport, DriverError>
where
    S: EventSink<u64> + 'static,
{
    config.validate()?;
    let seed = config.seed.unwrap_or_else(rand::random);
    let started = Instant::now();

    tracing::info!(
        seed,
        producers = config.producers,
        consumers = config.consumers,
        initial_capacity = config.initial_capacity,
        "workload starting"
    );

    let producers: Vec<_> = (0..config.producers)
        .map(|index| {
            let queue = Arc::clone(&queue);
            let items = config.items_per_producer;
            let delay = config.insert_delay;
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
            thread::spawn(move || {
                for _ in 0..items {
                    queue.insert(rng.gen_range(0..VALUE_MAX));
                    thread::sleep(delay);
                }
                tracing::debug!(producer = index, items, "producer finished");
                items
            })
        })
        .collect();

    let consumers: Vec<_> = (0..config.consumers)
        .map(|index| {
            let queue = Arc::clone(&queue);
            let timeout = config.remove_timeout;
            let pause = config.consume_pause;
            thread::spawn(move || consume(&queue, index, timeout, pause))
        })
        .collect();

    let mut inserted = 0;
    for (index, handle) in producers.into_iter().enumerate() {
        inserted += handle
            .join()
            .map_err(|_| DriverError::WorkerPanicked { role: "producer", index })?;
    }

    let mut removed = 0;
    for (index, handle) in consumers.into_iter().enumerate() {
        removed += handle
            .join()
            .map_err(|_| DriverError::WorkerPanicked { role: "consumer", index })?;
    }

    let snapshot = queue.snapshot();
    let report = WorkloadReport {
        seed,
        producers: config.producers,
        consumers: config.consumers,
        inserted,
        removed,
        final_count: snapshot.count,
        final_capacity: snapshot.capacity,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    if report.removed < report.inserted {
        tracing::warn!(
            inserted = report.inserted,
            removed = report.removed,
            "consumers stopped before draining the queue"
        );
    }
    tracing::info!(elapsed_ms = report.elapsed_ms, "workload finished");

    Ok(report)
}

fn consume<S: EventSink<u64>>(
    queue: &AdaptiveQueue<u64, S>,
    index: usize,
    timeout: Duration,
    pause: Duration,
) -> u64 {
    let mut removed = 0;
    while queue.remove(timeout).is_some() {
        removed += 1;
        thread::sleep(pause);
    }
    tracing::debug!(consumer = index, removed, "consumer timed out");
    removed
}
