//! Multi-threaded stress harness.
//!
//! Real producer and consumer threads share one recorded queue. The seed
//! shuffles the order threads are spawned in, and each thread gets its own
//! RNG forked from the run seed, which makes fault decisions reproducible
//! per thread. Interleavings are left to the OS scheduler, so a
//! failing seed narrows a bug down rather than replaying it exactly.
//!
//! Producers insert disjoint values (`producer << 32 | index`). Consumers
//! remove until they see a timeout, or until a `Crash` fault makes them
//! exit early holding the element they just removed.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use aq_core::{PropertyChecker, QueuePropertyChecker};
use aq_queue::{AdaptiveQueue, MemorySink, QueueError};

use crate::fault::{FaultConfig, FaultInjector, FaultPoint, FaultType};
use crate::random::DeterministicRng;

/// Configuration for a stress run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: u64,
    pub initial_capacity: usize,
    /// Consumers give up after waiting this long for an element
    pub remove_timeout: Duration,
    pub fault_config: FaultConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: 4,
            items_per_producer: 200,
            initial_capacity: 2,
            remove_timeout: Duration::from_millis(250),
            fault_config: FaultConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Configuration for stress testing.
    pub fn stress() -> Self {
        Self {
            producers: 8,
            consumers: 8,
            items_per_producer: 1000,
            initial_capacity: 1,
            remove_timeout: Duration::from_millis(500),
            fault_config: FaultConfig::aggressive(),
        }
    }

    /// Configuration for quick testing.
    pub fn quick() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            items_per_producer: 50,
            initial_capacity: 2,
            remove_timeout: Duration::from_millis(100),
            fault_config: FaultConfig::none(),
        }
    }
}

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct HarnessResult {
    pub seed: u64,
    pub inserted_count: u64,
    pub removed_count: u64,
    /// Elements still in the queue after every thread stopped
    pub remaining_count: u64,
    pub crashed_consumers: usize,
    pub faults_injected_count: u64,
    pub max_capacity: usize,
    pub all_invariants_held: bool,
    pub first_violation: Option<String>,
}

impl HarnessResult {
    /// Format result for display.
    #[must_use]
    pub fn format(&self) -> String {
        let status = if self.all_invariants_held { "PASS" } else { "FAIL" };

        let mut result = format!(
            "[{}] DST_SEED={} inserted={} removed={} remaining={} crashed={} faults={} max_capacity={}",
            status,
            self.seed,
            self.inserted_count,
            self.removed_count,
            self.remaining_count,
            self.crashed_consumers,
            self.faults_injected_count,
            self.max_capacity
        );

        if let Some(ref violation) = self.first_violation {
            result.push_str(&format!("\n  Violation: {}", violation));
        }

        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Worker {
    Producer(u64),
    Consumer,
}

/// Seeded interleaving of producer and consumer spawns.
fn spawn_order(rng: &mut DeterministicRng, producers: usize, consumers: usize) -> Vec<Worker> {
    let mut order: Vec<Worker> = (0..producers as u64)
        .map(Worker::Producer)
        .chain((0..consumers).map(|_| Worker::Consumer))
        .collect();
    rng.shuffle(&mut order);
    order
}

struct ConsumerOutcome {
    removed: u64,
    max_capacity: usize,
    crashed: bool,
    faults: u64,
    violation: Option<String>,
}

/// Stress harness over one recorded queue.
pub struct StressHarness {
    config: HarnessConfig,
    seed: u64,
}

impl StressHarness {
    #[must_use]
    pub fn new(seed: u64, config: HarnessConfig) -> Self {
        debug_assert!(seed != 0, "seed must be non-zero for reproducibility");
        debug_assert!(config.producers > 0 && config.consumers > 0);
        Self { config, seed }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run all threads to completion and check the recorded history.
    pub fn run(&self) -> Result<HarnessResult, QueueError> {
        let (queue, _sink) = AdaptiveQueue::recorded(self.config.initial_capacity)?;
        let queue = Arc::new(queue);
        let start = Arc::new(Barrier::new(self.config.producers + self.config.consumers));
        let mut rng = DeterministicRng::new(self.seed);

        tracing::debug!(
            seed = self.seed,
            producers = self.config.producers,
            consumers = self.config.consumers,
            "stress run starting"
        );

        let mut producers = Vec::with_capacity(self.config.producers);
        let mut consumers = Vec::with_capacity(self.config.consumers);
        for worker in spawn_order(&mut rng, self.config.producers, self.config.consumers) {
            let queue = Arc::clone(&queue);
            let start = Arc::clone(&start);
            let mut faults = FaultInjector::new(rng.fork(), self.config.fault_config.clone());
            match worker {
                Worker::Producer(p) => {
                    let items = self.config.items_per_producer;
                    producers.push(thread::spawn(move || {
                        start.wait();
                        for i in 0..items {
                            if let Some(FaultType::Delay(delay)) = faults.maybe_inject(FaultPoint::BeforeOperation) {
                                thread::sleep(delay);
                            }
                            queue.insert((p << 32) | i);
                        }
                        faults.stats().faults_count
                    }));
                }
                Worker::Consumer => {
                    let timeout = self.config.remove_timeout;
                    consumers.push(thread::spawn(move || {
                        start.wait();
                        consume(&queue, &mut faults, timeout)
                    }));
                }
            }
        }

        let mut first_violation = None;
        let mut faults_injected_count = 0;
        for handle in producers {
            match handle.join() {
                Ok(faults) => faults_injected_count += faults,
                Err(_) => {
                    first_violation.get_or_insert_with(|| "producer thread panicked".to_string());
                }
            }
        }

        let mut removed_count = 0;
        let mut crashed_consumers = 0;
        let mut max_capacity = self.config.initial_capacity;
        for handle in consumers {
            match handle.join() {
                Ok(outcome) => {
                    removed_count += outcome.removed;
                    faults_injected_count += outcome.faults;
                    max_capacity = max_capacity.max(outcome.max_capacity);
                    if outcome.crashed {
                        crashed_consumers += 1;
                    }
                    if let Some(violation) = outcome.violation {
                        first_violation.get_or_insert(violation);
                    }
                }
                Err(_) => {
                    first_violation.get_or_insert_with(|| "consumer thread panicked".to_string());
                }
            }
        }

        let inserted_count = self.config.producers as u64 * self.config.items_per_producer;
        let remaining_count = queue.len() as u64;
        if first_violation.is_none() && inserted_count != removed_count + remaining_count {
            first_violation = Some(format!(
                "inserted {} but removed {} with {} remaining",
                inserted_count, removed_count, remaining_count
            ));
        }

        if first_violation.is_none() {
            let checker = QueuePropertyChecker::new(queue.as_ref()).with_seed(self.seed);
            first_violation = checker
                .failures()
                .first()
                .map(|failure| failure.to_string());
        }

        let result = HarnessResult {
            seed: self.seed,
            inserted_count,
            removed_count,
            remaining_count,
            crashed_consumers,
            faults_injected_count,
            max_capacity,
            all_invariants_held: first_violation.is_none(),
            first_violation,
        };
        tracing::info!("{}", result.format());
        Ok(result)
    }
}

fn consume(
    queue: &AdaptiveQueue<u64, MemorySink>,
    faults: &mut FaultInjector,
    timeout: Duration,
) -> ConsumerOutcome {
    let mut outcome = ConsumerOutcome {
        removed: 0,
        max_capacity: 0,
        crashed: false,
        faults: 0,
        violation: None,
    };

    loop {
        if let Some(FaultType::Delay(delay)) = faults.maybe_inject(FaultPoint::BeforeOperation) {
            thread::sleep(delay);
        }
        if queue.remove(timeout).is_none() {
            break;
        }
        outcome.removed += 1;

        let snapshot = queue.snapshot();
        outcome.max_capacity = outcome.max_capacity.max(snapshot.capacity);
        if snapshot.capacity == 0 || snapshot.count > snapshot.capacity {
            outcome.violation = Some(format!("observed count {} over capacity {}", snapshot.count, snapshot.capacity));
            break;
        }

        if faults.maybe_inject(FaultPoint::AfterOperation) == Some(FaultType::Crash) {
            outcome.crashed = true;
            break;
        }
    }

    outcome.faults = faults.stats().faults_count;
    outcome
}
