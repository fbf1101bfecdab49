//! # aq-core
//!
//! Implementation-independent types for checking the adaptive queue.
//!
//! This crate provides:
//! - `QueueHistory`: the linearized sequence of completed operations
//! - `QueueModel`: a sequential reference model of the capacity policy
//! - `QueueProperties` and `QueuePropertyChecker` for verifying invariants
//! - `Counterexample` for rendering failure paths
//!
//! Nothing here knows how the queue is synchronized. Implementations expose
//! their observable state through `QueueProperties`, and every check is
//! performed against the reference model.

pub mod counterexample;
pub mod history;
pub mod invariants;
pub mod model;
pub mod property;

pub use counterexample::{Counterexample, StateSnapshot};
pub use history::{QueueHistory, QueueOpKind, QueueOperation, ResizeDirection};
pub use invariants::{QueueProperties, QueuePropertyChecker};
pub use model::{grows_after_insert, shrinks_after_remove, ModelStep, QueueModel};
pub use property::{PropertyChecker, PropertyResult};
