//! Fault injection at operation boundaries.
//!
//! Faults are injected by the test harness between queue operations, never
//! inside them. The queue code is unchanged.
//!
//! | Fault | Effect |
//! |-------|--------|
//! | `Delay` | The calling thread sleeps before its next operation |
//! | `Crash` | The calling thread abandons its work; an element it already removed is never used |

use std::time::Duration;

use crate::random::DeterministicRng;

/// Where a fault is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Before starting an operation
    BeforeOperation,
    /// After the operation completed, before the caller sees its result
    AfterOperation,
}

/// Types of faults that can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    Delay(Duration),
    Crash,
}

/// Fault probabilities, checked once per fault point.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    pub delay_probability: f64,
    pub delay_max: Duration,
    pub crash_probability: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            delay_probability: 0.05,
            delay_max: Duration::from_micros(200),
            crash_probability: 0.001,
        }
    }
}

impl FaultConfig {
    /// No faults at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            delay_probability: 0.0,
            delay_max: Duration::ZERO,
            crash_probability: 0.0,
        }
    }

    /// Frequent delays and crashes.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            delay_probability: 0.2,
            delay_max: Duration::from_millis(1),
            crash_probability: 0.01,
        }
    }
}

/// Counters of injected faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    pub faults_count: u64,
    pub delays_count: u64,
    pub crashes_count: u64,
}

/// Decides, deterministically, which faults happen.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    stats: FaultStats,
}

impl FaultInjector {
    #[must_use]
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.delay_probability)
                && (0.0..=1.0).contains(&config.crash_probability),
            "fault probabilities must be in [0, 1]"
        );
        Self {
            rng,
            config,
            stats: FaultStats::default(),
        }
    }

    /// Roll for a fault at `point`. Crashes are only injected after an
    /// operation, so a crash never hides an operation that did not happen.
    pub fn maybe_inject(&mut self, point: FaultPoint) -> Option<FaultType> {
        if point == FaultPoint::AfterOperation && self.rng.gen_bool(self.config.crash_probability) {
            self.stats.faults_count += 1;
            self.stats.crashes_count += 1;
            return Some(FaultType::Crash);
        }

        if self.config.delay_max > Duration::ZERO && self.rng.gen_bool(self.config.delay_probability) {
            let max_us = self.config.delay_max.as_micros().max(1) as u64;
            let delay = Duration::from_micros(self.rng.gen_range(1..=max_us));
            self.stats.faults_count += 1;
            self.stats.delays_count += 1;
            return Some(FaultType::Delay(delay));
        }

        None
    }

    #[must_use]
    pub fn stats(&self) -> FaultStats {
        self.stats
    }
}
