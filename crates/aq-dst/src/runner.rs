//! Single-threaded DST runner for the adaptive queue.
//!
//! A seeded RNG picks every operation and value; faults are injected between
//! operations by a `FaultInjector`. The queue itself is unchanged.
//!
//! The insert/remove mix drifts between insert-heavy and remove-heavy
//! phases so that capacity repeatedly doubles and halves over a run.

use std::thread;

use aq_core::{PropertyChecker, QueuePropertyChecker};
use aq_queue::{AdaptiveQueue, MemorySink, QueueError};

use crate::fault::{FaultConfig, FaultInjector, FaultPoint, FaultType};
use crate::random::DeterministicRng;

/// Operations per insert-heavy or remove-heavy phase.
const PHASE_LEN: u64 = 64;

/// Values are drawn from a small range so duplicates occur.
const VALUE_RANGE: u64 = 128;

/// Operation chosen by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstOp {
    Insert(u64),
    Remove,
}

/// Statistics of a runner so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DstStats {
    pub operations_count: u64,
    pub inserts_count: u64,
    pub removes_count: u64,
    pub empty_removes_count: u64,
    pub abandoned_count: u64,
    pub max_capacity: usize,
    pub invariant_checks_count: u64,
}

/// Outcome of [`QueueDstRunner::run`].
#[derive(Debug, Clone)]
pub struct DstResult {
    pub seed: u64,
    pub stats: DstStats,
    pub faults_injected_count: u64,
    pub first_violation: Option<String>,
}

impl DstResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.first_violation.is_none()
    }

    /// One-line summary, plus the violation if there is one.
    #[must_use]
    pub fn format(&self) -> String {
        let status = if self.passed() { "PASS" } else { "FAIL" };
        let mut result = format!(
            "[{}] DST_SEED={} ops={} inserts={} removes={} max_capacity={} faults={} abandoned={} checks={}",
            status,
            self.seed,
            self.stats.operations_count,
            self.stats.inserts_count,
            self.stats.removes_count,
            self.stats.max_capacity,
            self.faults_injected_count,
            self.stats.abandoned_count,
            self.stats.invariant_checks_count
        );
        if let Some(ref violation) = self.first_violation {
            result.push_str(&format!("\n  Violation: {}", violation));
        }
        result
    }
}

/// DST runner wrapping a recorded queue.
pub struct QueueDstRunner {
    queue: AdaptiveQueue<u64, MemorySink>,
    rng: DeterministicRng,
    faults: FaultInjector,
    seed: u64,
    stats: DstStats,
}

impl QueueDstRunner {
    /// Create a runner over a fresh queue of `initial_capacity`.
    pub fn new(seed: u64, initial_capacity: usize, fault_config: FaultConfig) -> Result<Self, QueueError> {
        debug_assert!(seed != 0, "seed must be non-zero for reproducibility");

        let (queue, _sink) = AdaptiveQueue::recorded(initial_capacity)?;
        let mut rng = DeterministicRng::new(seed);
        let faults = FaultInjector::new(rng.fork(), fault_config);
        let stats = DstStats {
            max_capacity: queue.capacity(),
            ..DstStats::default()
        };

        Ok(Self {
            queue,
            rng,
            faults,
            seed,
            stats,
        })
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn queue(&self) -> &AdaptiveQueue<u64, MemorySink> {
        &self.queue
    }

    #[must_use]
    pub fn stats(&self) -> DstStats {
        self.stats
    }

    /// Choose the next operation. Never inserts into a full queue, since
    /// that would block the only thread.
    pub fn next_op(&mut self) -> DstOp {
        let phase = self.stats.operations_count / PHASE_LEN;
        let insert_probability = if phase % 2 == 0 { 0.75 } else { 0.25 };

        if self.queue.is_empty() || self.rng.gen_bool(insert_probability) {
            DstOp::Insert(self.rng.gen_range(0..VALUE_RANGE))
        } else {
            DstOp::Remove
        }
    }

    /// Insert with fault injection at the boundaries.
    pub fn insert(&mut self, value: u64) -> Result<(), FaultType> {
        self.before_operation();
        self.queue.insert(value);
        self.stats.inserts_count += 1;
        self.after_operation()
    }

    /// Non-blocking remove with fault injection at the boundaries.
    ///
    /// On `Err(FaultType::Crash)` the element was removed from the queue but
    /// the caller never received it.
    pub fn remove(&mut self) -> Result<Option<u64>, FaultType> {
        self.before_operation();
        let removed = self.queue.try_remove();
        match removed {
            Some(_) => self.stats.removes_count += 1,
            None => self.stats.empty_removes_count += 1,
        }
        self.after_operation()?;
        Ok(removed)
    }

    /// Run one randomly chosen operation.
    pub fn step(&mut self) -> Result<DstOp, FaultType> {
        let op = self.next_op();
        match op {
            DstOp::Insert(value) => self.insert(value)?,
            DstOp::Remove => {
                self.remove()?;
            }
        }
        Ok(op)
    }

    /// Check every queue property against the recorded history.
    pub fn check(&mut self) -> Result<(), String> {
        self.stats.invariant_checks_count += 1;
        let checker = QueuePropertyChecker::new(&self.queue).with_seed(self.seed);
        let failures = checker.failures();
        if failures.is_empty() {
            return Ok(());
        }
        Err(failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Run `operations` steps, checking properties every `check_interval`
    /// steps (0 = only at the end).
    pub fn run(&mut self, operations: u64, check_interval: u64) -> DstResult {
        let mut first_violation = None;

        for i in 0..operations {
            // An abandoned operation is still a valid history.
            let _ = self.step();

            if check_interval > 0 && (i + 1) % check_interval == 0 {
                if let Err(violation) = self.check() {
                    first_violation = Some(violation);
                    break;
                }
            }
        }

        if first_violation.is_none() {
            first_violation = self.check().err();
        }
        if let Some(ref violation) = first_violation {
            tracing::error!(seed = self.seed, "dst run failed: {}", violation);
        }

        DstResult {
            seed: self.seed,
            stats: self.stats,
            faults_injected_count: self.faults.stats().faults_count,
            first_violation,
        }
    }

    fn before_operation(&mut self) {
        if let Some(FaultType::Delay(delay)) = self.faults.maybe_inject(FaultPoint::BeforeOperation) {
            thread::sleep(delay);
        }
    }

    fn after_operation(&mut self) -> Result<(), FaultType> {
        self.stats.operations_count += 1;
        self.stats.max_capacity = self.stats.max_capacity.max(self.queue.capacity());

        match self.faults.maybe_inject(FaultPoint::AfterOperation) {
            Some(FaultType::Crash) => {
                self.stats.abandoned_count += 1;
                Err(FaultType::Crash)
            }
            Some(FaultType::Delay(delay)) => {
                thread::sleep(delay);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Run one seeded scenario with the default fault configuration.
pub fn run_queue_scenario(seed: u64, initial_capacity: usize, operations: u64) -> Result<DstResult, QueueError> {
    let mut runner = QueueDstRunner::new(seed, initial_capacity, FaultConfig::default())?;
    Ok(runner.run(operations, 50))
}
