//! Counterexample representation and rendering.
//!
//! When a property violation is detected, a counterexample shows the
//! operations that led up to it, with the queue state after each one.

use crate::history::{QueueHistory, QueueOpKind};

/// Number of history steps shown before the failing one.
const CONTEXT_STEPS: usize = 8;

/// A counterexample showing the failure path.
#[derive(Debug, Clone, Default)]
pub struct Counterexample {
    /// Sequence of state snapshots
    pub states: Vec<StateSnapshot>,
    /// DST seed for reproduction (if applicable)
    pub dst_seed: Option<u64>,
    /// What went wrong
    pub description: Option<String>,
}

/// Snapshot of queue state after one step.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Step number in the execution
    pub step: u64,
    /// The operation performed at this step
    pub description: String,
    /// Variable values at this point
    pub variables: Vec<(String, String)>,
}

impl Counterexample {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counterexample with DST seed for reproduction.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        Self {
            dst_seed: Some(seed),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build a counterexample from the history steps leading up to
    /// (and including) `failing_step`.
    #[must_use]
    pub fn from_history(history: &QueueHistory, failing_step: u64, seed: Option<u64>) -> Self {
        let mut ce = match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        };

        let end = (failing_step as usize).min(history.operations.len());
        let start = end.saturating_sub(CONTEXT_STEPS + 1);
        for op in &history.operations[start..end] {
            let variables = match op.kind {
                QueueOpKind::Insert {
                    count, capacity, ..
                }
                | QueueOpKind::Remove {
                    count, capacity, ..
                } => vec![
                    ("count".to_string(), count.to_string()),
                    ("capacity".to_string(), capacity.to_string()),
                ],
                QueueOpKind::Resize { capacity, .. } => {
                    vec![("capacity".to_string(), capacity.to_string())]
                }
            };
            ce.add_state(StateSnapshot {
                step: op.step,
                description: op.kind.to_string(),
                variables,
            });
        }
        ce
    }

    /// Add a state snapshot.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(
            self.states.last().map_or(true, |last| state.step > last.step),
            "States must be added in order"
        );
        self.states.push(state);
    }

    /// Render as a step table.
    ///
    /// ```text
    /// DST_SEED=12345
    ///
    /// Failure: remove returned 2 but model expected 1
    ///
    /// Step | Operation            | State
    /// -----|----------------------|------
    ///    1 | insert(1)            | count=1 capacity=4
    ///    2 | remove() -> 2        | count=0 capacity=4
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();

        if let Some(seed) = self.dst_seed {
            output.push_str(&format!("DST_SEED={}\n\n", seed));
        }

        if let Some(ref desc) = self.description {
            output.push_str("Failure: ");
            output.push_str(desc);
            output.push_str("\n\n");
        }

        if self.states.is_empty() {
            output.push_str("(no steps recorded)\n");
            return output;
        }

        output.push_str("Step | Operation            | State\n");
        output.push_str("-----|----------------------|------\n");
        for state in &self.states {
            let vars: Vec<String> = state
                .variables
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(
                "{:4} | {:<20} | {}\n",
                state.step,
                state.description,
                vars.join(" ")
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ResizeDirection;

    #[test]
    fn test_counterexample_with_seed() {
        let ce = Counterexample::with_seed(12345);
        assert_eq!(ce.dst_seed, Some(12345));
        assert!(ce.states.is_empty());
    }

    #[test]
    fn test_from_history_keeps_tail() {
        let mut history = QueueHistory::with_initial_capacity(64);
        for v in 0..20 {
            history.record_insert(v, v as usize + 1, 64);
        }

        let ce = Counterexample::from_history(&history, 20, Some(7));
        assert_eq!(ce.states.len(), CONTEXT_STEPS + 1);
        assert_eq!(ce.states.last().unwrap().step, 20);
        assert_eq!(ce.states.first().unwrap().step, 20 - CONTEXT_STEPS as u64);
    }

    #[test]
    fn test_render() {
        let mut history = QueueHistory::with_initial_capacity(1);
        history.record_resize(ResizeDirection::Grew, 2);
        history.record_insert(5, 1, 2);

        let rendered = Counterexample::from_history(&history, 2, Some(42))
            .with_description("broken")
            .render();
        assert!(rendered.contains("DST_SEED=42"));
        assert!(rendered.contains("Failure: broken"));
        assert!(rendered.contains("grew to 2"));
        assert!(rendered.contains("insert(5)"));
        assert!(rendered.contains("count=1 capacity=2"));
    }
}
