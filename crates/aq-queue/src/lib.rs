//! # aq-queue
//!
//! A bounded, adaptively resizing multi-producer multi-consumer queue.
//!
//! - `insert` waits while the queue is full (a completed insert that fills
//!   it doubles capacity)
//! - `remove` waits up to a timeout for an element and returns `None` on
//!   timeout (a completed remove that leaves it under a quarter full halves
//!   capacity)
//! - every insert, remove and resize is reported to an `EventSink` from
//!   inside the critical section
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! use aq_queue::AdaptiveQueue;
//!
//! let (queue, history) = AdaptiveQueue::recorded(2).unwrap();
//! let queue = Arc::new(queue);
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || (1..=4).for_each(|v| queue.insert(v)))
//! };
//! producer.join().unwrap();
//!
//! let mut drained = Vec::new();
//! while let Some(v) = queue.remove(Duration::from_millis(10)) {
//!     drained.push(v);
//! }
//! assert_eq!(drained, vec![1, 2, 3, 4]);
//! assert_eq!(history.history().inserted(), vec![1, 2, 3, 4]);
//! ```
//!
//! ## Loom
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test -p aq-queue --release
//! ```

pub mod error;
pub mod queue;
pub mod sink;

mod ring;
mod sync;

pub use aq_core::ResizeDirection;
pub use error::QueueError;
pub use queue::{AdaptiveQueue, QueueSnapshot};
pub use sink::{EventSink, FileSink, MemorySink, QueueEvent, TracingSink};
