//! Queue construction errors.
//!
//! Operations themselves do not fail: a remove that times out returns
//! `None`, and invariant violations panic.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("initial capacity must be at least 1, got {requested}")]
    InvalidCapacity { requested: usize },

    #[error("cannot open queue log {}: {source}", .path.display())]
    LoggerUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
