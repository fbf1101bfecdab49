//! Observability sinks.
//!
//! Every event is recorded from inside the queue's critical section, so
//! the order a sink sees is the order the queue state was mutated in. A
//! resize is recorded before the insert or remove that triggered it; that
//! insert/remove then reports the post-resize capacity.
//!
//! | Sink | Output |
//! |------|--------|
//! | `FileSink` | One text line per event in a log file |
//! | `TracingSink` | Structured `tracing` events under target `aq_queue::events` |
//! | `MemorySink` | An `aq_core::QueueHistory` for property checking |
//! | `(A, B)` | Both `A` and `B` |

use std::fmt;
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use aq_core::{QueueHistory, ResizeDirection};

use crate::error::QueueError;

/// Something that happened to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent<'a, T> {
    /// The queue was constructed.
    Started { capacity: usize },
    /// An element was inserted; `count` and `capacity` are post-resize.
    Inserted {
        value: &'a T,
        count: usize,
        capacity: usize,
    },
    /// An element was removed; `count` and `capacity` are post-resize.
    Removed {
        value: &'a T,
        count: usize,
        capacity: usize,
    },
    /// Capacity changed.
    Resized {
        direction: ResizeDirection,
        capacity: usize,
    },
}

impl<T: fmt::Display> fmt::Display for QueueEvent<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueEvent::Started { capacity } => {
                write!(f, "operation log started | capacity: {}", capacity)
            }
            QueueEvent::Inserted {
                value,
                count,
                capacity,
            } => write!(
                f,
                "inserted: {} | count: {} | capacity: {}",
                value, count, capacity
            ),
            QueueEvent::Removed {
                value,
                count,
                capacity,
            } => write!(
                f,
                "removed: {} | count: {} | capacity: {}",
                value, count, capacity
            ),
            QueueEvent::Resized {
                direction: ResizeDirection::Grew,
                capacity,
            } => write!(f, "capacity doubled to: {}", capacity),
            QueueEvent::Resized {
                direction: ResizeDirection::Shrank,
                capacity,
            } => write!(f, "capacity halved to: {}", capacity),
        }
    }
}

/// Receives queue events.
///
/// `record` runs while the queue lock is held: keep it short and never
/// call back into the queue.
pub trait EventSink<T>: Send {
    fn record(&mut self, event: &QueueEvent<'_, T>);
}

impl<T, A, B> EventSink<T> for (A, B)
where
    A: EventSink<T>,
    B: EventSink<T>,
{
    fn record(&mut self, event: &QueueEvent<'_, T>) {
        self.0.record(event);
        self.1.record(event);
    }
}

/// Line-oriented log file.
///
/// The file is truncated on creation. A write error is reported once via
/// `tracing::warn!`; later events are dropped since the queue operation
/// that produced them cannot fail.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: LineWriter<File>,
    failed: bool,
}

impl FileSink {
    /// Open (create or truncate) the log file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| QueueError::LoggerUnavailable {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            writer: LineWriter::new(file),
            failed: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: fmt::Display> EventSink<T> for FileSink {
    fn record(&mut self, event: &QueueEvent<'_, T>) {
        if self.failed {
            return;
        }
        if let Err(error) = writeln!(self.writer, "{}", event) {
            self.failed = true;
            tracing::warn!(
                path = %self.path.display(),
                %error,
                "queue log write failed, dropping further events"
            );
        }
    }
}

/// Emits events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl<T: fmt::Debug> EventSink<T> for TracingSink {
    fn record(&mut self, event: &QueueEvent<'_, T>) {
        match *event {
            QueueEvent::Started { capacity } => {
                tracing::info!(target: "aq_queue::events", capacity, "queue started");
            }
            QueueEvent::Inserted {
                value,
                count,
                capacity,
            } => {
                tracing::trace!(target: "aq_queue::events", ?value, count, capacity, "inserted");
            }
            QueueEvent::Removed {
                value,
                count,
                capacity,
            } => {
                tracing::trace!(target: "aq_queue::events", ?value, count, capacity, "removed");
            }
            QueueEvent::Resized {
                direction,
                capacity,
            } => {
                tracing::debug!(target: "aq_queue::events", %direction, capacity, "resized");
            }
        }
    }
}

/// Records a `QueueHistory`. Clones share the same history, so keep one
/// handle and give the other to the queue.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    history: Arc<Mutex<QueueHistory>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the history recorded so far.
    #[must_use]
    pub fn history(&self) -> QueueHistory {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueHistory> {
        // Only the queue's own critical section writes here.
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EventSink<u64> for MemorySink {
    fn record(&mut self, event: &QueueEvent<'_, u64>) {
        let mut history = self.lock();
        match *event {
            QueueEvent::Started { capacity } => history.record_start(capacity),
            QueueEvent::Inserted {
                value,
                count,
                capacity,
            } => history.record_insert(*value, count, capacity),
            QueueEvent::Removed {
                value,
                count,
                capacity,
            } => history.record_remove(*value, count, capacity),
            QueueEvent::Resized {
                direction,
                capacity,
            } => history.record_resize(direction, capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lines() {
        let started: QueueEvent<'_, u64> = QueueEvent::Started { capacity: 4 };
        assert_eq!(started.to_string(), "operation log started | capacity: 4");

        let inserted = QueueEvent::Inserted {
            value: &42u64,
            count: 3,
            capacity: 4,
        };
        assert_eq!(inserted.to_string(), "inserted: 42 | count: 3 | capacity: 4");

        let removed = QueueEvent::Removed {
            value: &7u64,
            count: 0,
            capacity: 2,
        };
        assert_eq!(removed.to_string(), "removed: 7 | count: 0 | capacity: 2");

        let grew: QueueEvent<'_, u64> = QueueEvent::Resized {
            direction: ResizeDirection::Grew,
            capacity: 8,
        };
        assert_eq!(grew.to_string(), "capacity doubled to: 8");

        let shrank: QueueEvent<'_, u64> = QueueEvent::Resized {
            direction: ResizeDirection::Shrank,
            capacity: 2,
        };
        assert_eq!(shrank.to_string(), "capacity halved to: 2");
    }

    #[test]
    fn test_memory_sink_shares_history() {
        let sink = MemorySink::new();
        let mut handle = sink.clone();

        handle.record(&QueueEvent::Started { capacity: 1 });
        handle.record(&QueueEvent::Resized {
            direction: ResizeDirection::Grew,
            capacity: 2,
        });
        handle.record(&QueueEvent::Inserted {
            value: &5,
            count: 1,
            capacity: 2,
        });

        let history = sink.history();
        assert_eq!(history.initial_capacity, Some(1));
        assert_eq!(history.inserted(), vec![5]);
        assert_eq!(history.resizes(), vec![(ResizeDirection::Grew, 2)]);
    }

    #[test]
    fn test_pair_fans_out() {
        let first = MemorySink::new();
        let second = MemorySink::new();
        let mut pair = (first.clone(), second.clone());

        pair.record(&QueueEvent::Started { capacity: 3 });
        pair.record(&QueueEvent::Inserted {
            value: &9,
            count: 1,
            capacity: 3,
        });

        assert_eq!(first.history(), second.history());
        assert_eq!(first.history().len(), 1);
    }

    #[test]
    fn test_file_sink_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("log.txt");

        let err = FileSink::create(&missing).unwrap_err();
        assert!(matches!(err, QueueError::LoggerUnavailable { .. }));
        assert!(err.to_string().contains("no-such-dir"));
    }

    #[test]
    fn test_file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");

        let mut sink = FileSink::create(&path).unwrap();
        EventSink::<u64>::record(&mut sink, &QueueEvent::Started { capacity: 2 });
        sink.record(&QueueEvent::Inserted {
            value: &1u64,
            count: 1,
            capacity: 2,
        });
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "operation log started | capacity: 2",
                "inserted: 1 | count: 1 | capacity: 2",
            ]
        );
    }
}
