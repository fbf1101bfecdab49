//! # aq-driver
//!
//! Producer/consumer workload over the adaptive queue, and the `aq-driver`
//! binary that runs it from the command line.
//!
//! ## Usage
//!
//! ```bash
//! aq-driver -p 4 -c 2 -s 8 -t 5 --log-file log.txt
//! RUST_LOG=aq_queue::events=trace aq-driver -p 1 -c 1 -s 1 -t 1
//! ```

pub mod config;
pub mod workload;

pub use config::{ConfigError, WorkloadConfig};
pub use workload::{build_queue, run_workload, DriverError, DriverQueue, WorkloadReport};
