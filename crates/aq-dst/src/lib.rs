//! # aq-dst
//!
//! Deterministic simulation testing for the adaptive queue.
//!
//! All randomness (operation choice, values, faults) comes from a seed, and
//! faults are injected at operation boundaries by the harness. The queue
//! code is unchanged.
//!
//! - `runner`: single-threaded, fully reproducible runs with property checks
//!   every N operations
//! - `harness`: real producer/consumer threads with per-thread seeded faults
//!
//! ## Usage
//!
//! ```rust
//! use aq_dst::{FaultConfig, QueueDstRunner};
//!
//! let mut runner = QueueDstRunner::new(12345, 2, FaultConfig::none()).unwrap();
//! let result = runner.run(200, 20);
//! assert!(result.passed(), "{}", result.format());
//! ```
//!
//! ## Reproducibility
//!
//! To reproduce a failing test:
//! ```bash
//! DST_SEED=12345 cargo test -p aq-dst
//! ```

pub mod fault;
pub mod harness;
pub mod random;
pub mod runner;

pub use fault::{FaultConfig, FaultInjector, FaultPoint, FaultStats, FaultType};
pub use harness::{HarnessConfig, HarnessResult, StressHarness};
pub use random::DeterministicRng;
pub use runner::{run_queue_scenario, DstOp, DstResult, DstStats, QueueDstRunner};

/// Get DST seed from environment or generate random one.
///
/// Prints the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("DST_SEED") {
        Ok(s) => {
            let seed = seed_from_env_value(&s);
            println!("DST_SEED={} (from environment)", seed);
            seed
        }
        Err(_) => {
            let seed = rand::random::<u64>().max(1);
            println!("DST_SEED={} (randomly generated)", seed);
            seed
        }
    }
}

/// Parse a `DST_SEED` value. Zero is reserved and maps to 1, the seed that
/// is then printed and used.
fn seed_from_env_value(value: &str) -> u64 {
    let seed: u64 = value.trim().parse().expect("DST_SEED must be a valid u64");
    if seed == 0 {
        println!("DST_SEED=0 is reserved, using 1");
    }
    seed.max(1)
}

/// Number of seeds a test should sweep, from `DST_ITERATIONS`.
#[must_use]
pub fn iterations_from_env(default: u64) -> u64 {
    std::env::var("DST_ITERATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_seed_parsed() {
        assert_eq!(seed_from_env_value("12345"), 12345);
        assert_eq!(seed_from_env_value(" 7\n"), 7);
    }

    #[test]
    fn test_env_seed_zero_runs() {
        let seed = seed_from_env_value("0");
        assert_eq!(seed, 1);

        let mut runner = QueueDstRunner::new(seed, 2, FaultConfig::none()).unwrap();
        assert!(runner.run(50, 10).passed());
        assert!(StressHarness::new(seed, HarnessConfig::quick()).run().unwrap().all_invariants_held);
    }

    #[test]
    #[should_panic(expected = "DST_SEED must be a valid u64")]
    fn test_env_seed_garbage_rejected() {
        seed_from_env_value("abc");
    }
}
