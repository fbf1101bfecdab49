//! aq-driver — run a producer/consumer workload over the adaptive queue.
//!
//! # Usage
//!
//! ```bash
//! aq-driver -p 3 -c 2 -s 4 -t 50
//! ```
//!
//! Every queue operation is written to the log file (`log.txt` by default).
//! A JSON report is printed to stdout when all threads have finished.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aq_driver::config::{CONSUME_PAUSE_MS_DEFAULT, ITEMS_PER_PRODUCER_DEFAULT, LOG_FILE_DEFAULT};
use aq_driver::{build_queue, run_workload, DriverError, WorkloadConfig};

/// Run producers and consumers against one adaptive queue.
#[derive(Parser, Debug)]
#[command(name = "aq-driver")]
#[command(about = "Producer/consumer workload over the adaptive queue")]
struct Cli {
    /// Number of producer threads.
    #[arg(short = 'p', long)]
    producers: usize,

    /// Number of consumer threads.
    #[arg(short = 'c', long)]
    consumers: usize,

    /// Initial queue capacity.
    #[arg(short = 's', long)]
    initial_capacity: usize,

    /// Producer sleep after each insert, in milliseconds.
    #[arg(short = 't', long)]
    delay_ms: u64,

    /// Items inserted by each producer.
    #[arg(long, default_value_t = ITEMS_PER_PRODUCER_DEFAULT)]
    items: u64,

    /// Consumer remove timeout in milliseconds (defaults to the delay value in seconds).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Consumer pause after each successful remove, in milliseconds.
    #[arg(long, default_value_t = CONSUME_PAUSE_MS_DEFAULT)]
    pause_ms: u64,

    /// Operation log path (truncated on start).
    #[arg(long, default_value = LOG_FILE_DEFAULT)]
    log_file: PathBuf,

    /// Seed for inserted values (random if not set).
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn into_config(self) -> WorkloadConfig {
        let mut config = WorkloadConfig::new(self.producers, self.consumers, self.initial_capacity, self.delay_ms);
        config.items_per_producer = self.items;
        if let Some(timeout_ms) = self.timeout_ms {
            config.remove_timeout = Duration::from_millis(timeout_ms);
        }
        config.consume_pause = Duration::from_millis(self.pause_ms);
        config.log_file = self.log_file;
        config.seed = self.seed;
        config
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Cli::parse().into_config();

    let result = build_queue(&config).and_then(|queue| run_workload(&config, Arc::new(queue)));
    match result {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: cannot serialize report: {e}");
                process::exit(1);
            }
        },
        Err(DriverError::Config(e)) => {
            eprintln!("Error: {e}");
            eprintln!("{}", Cli::command().render_usage());
            process::exit(1);
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
