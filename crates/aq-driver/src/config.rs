//! Workload configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Items each producer inserts when not configured.
pub const ITEMS_PER_PRODUCER_DEFAULT: u64 = 20;

/// Pause between successful removes when not configured (milliseconds).
pub const CONSUME_PAUSE_MS_DEFAULT: u64 = 10;

/// Log file path when not configured.
pub const LOG_FILE_DEFAULT: &str = "log.txt";

/// Invalid workload parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("number of producers must be greater than 0")]
    ZeroProducers,

    #[error("number of consumers must be greater than 0")]
    ZeroConsumers,

    #[error("initial capacity must be greater than 0")]
    ZeroCapacity,

    #[error("items per producer must be greater than 0")]
    ZeroItems,

    #[error("insert delay must be greater than 0")]
    ZeroDelay,

    #[error("remove timeout must be greater than 0")]
    ZeroTimeout,
}

/// Parameters of one producer/consumer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    pub producers: usize,
    pub consumers: usize,
    pub initial_capacity: usize,
    pub items_per_producer: u64,
    /// Sleep after every insert
    pub insert_delay: Duration,
    /// Consumers stop after one remove times out
    pub remove_timeout: Duration,
    /// Sleep after every successful remove
    pub consume_pause: Duration,
    pub log_file: PathBuf,
    /// Seed for the inserted values; random when `None`
    pub seed: Option<u64>,
}

impl WorkloadConfig {
    /// Configuration with the given counts and delay, everything else
    /// defaulted. The remove timeout is the delay's value taken as seconds,
    /// which keeps consumers alive across any producer pause.
    #[must_use]
    pub fn new(producers: usize, consumers: usize, initial_capacity: usize, delay_ms: u64) -> Self {
        Self {
            producers,
            consumers,
            initial_capacity,
            items_per_producer: ITEMS_PER_PRODUCER_DEFAULT,
            insert_delay: Duration::from_millis(delay_ms),
            remove_timeout: Duration::from_secs(delay_ms),
            consume_pause: Duration::from_millis(CONSUME_PAUSE_MS_DEFAULT),
            log_file: PathBuf::from(LOG_FILE_DEFAULT),
            seed: None,
        }
    }

    /// Reject zero-valued parameters. The consume pause may be zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producers == 0 {
            return Err(ConfigError::ZeroProducers);
        }
        if self.consumers == 0 {
            return Err(ConfigError::ZeroConsumers);
        }
        if self.initial_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.items_per_producer == 0 {
            return Err(ConfigError::ZeroItems);
        }
        if self.insert_delay.is_zero() {
            return Err(ConfigError::ZeroDelay);
        }
        if self.remove_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkloadConfig::new(2, 3, 4, 5);
        assert_eq!(config.items_per_producer, 20);
        assert_eq!(config.insert_delay, Duration::from_millis(5));
        assert_eq!(config.remove_timeout, Duration::from_secs(5));
        assert_eq!(config.consume_pause, Duration::from_millis(10));
        assert_eq!(config.log_file, PathBuf::from("log.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_each_zero_rejected() {
        let base = WorkloadConfig::new(1, 1, 1, 1);
        let cases = [
            (WorkloadConfig { producers: 0, ..base.clone() }, ConfigError::ZeroProducers),
            (WorkloadConfig { consumers: 0, ..base.clone() }, ConfigError::ZeroConsumers),
            (WorkloadConfig { initial_capacity: 0, ..base.clone() }, ConfigError::ZeroCapacity),
            (WorkloadConfig { items_per_producer: 0, ..base.clone() }, ConfigError::ZeroItems),
            (WorkloadConfig { insert_delay: Duration::ZERO, ..base.clone() }, ConfigError::ZeroDelay),
            (WorkloadConfig { remove_timeout: Duration::ZERO, ..base.clone() }, ConfigError::ZeroTimeout),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_zero_delay_zero_timeout() {
        // A zero delay also yields a zero default timeout; the delay is reported first.
        let config = WorkloadConfig::new(1, 1, 1, 0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDelay));
    }

    #[test]
    fn test_zero_pause_allowed() {
        let config = WorkloadConfig {
            consume_pause: Duration::ZERO,
            ..WorkloadConfig::new(1, 1, 1, 1)
        };
        assert!(config.validate().is_ok());
    }
}
