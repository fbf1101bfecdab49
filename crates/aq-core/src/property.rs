//! Property results and the checker trait.

use std::fmt;

use crate::counterexample::Counterexample;

/// Outcome of checking a single named property.
#[derive(Debug, Clone)]
pub struct PropertyResult {
    /// Property name (e.g. "NoLostElements")
    pub name: &'static str,
    /// Whether the property held
    pub holds: bool,
    /// Human-readable violation message
    pub violation: Option<String>,
    /// Failure path, when one could be reconstructed
    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    /// A property that held.
    #[must_use]
    pub fn pass(name: &'static str) -> Self {
        Self {
            name,
            holds: true,
            violation: None,
            counterexample: None,
        }
    }

    /// A property that was violated.
    #[must_use]
    pub fn fail(
        name: &'static str,
        violation: impl Into<String>,
        counterexample: Option<Counterexample>,
    ) -> Self {
        Self {
            name,
            holds: false,
            violation: Some(violation.into()),
            counterexample,
        }
    }
}

impl fmt::Display for PropertyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.holds {
            return write!(f, "[PASS] {}", self.name);
        }
        write!(
            f,
            "[FAIL] {}: {}",
            self.name,
            self.violation.as_deref().unwrap_or("no message")
        )?;
        if let Some(ref ce) = self.counterexample {
            write!(f, "\n{}", ce.render())?;
        }
        Ok(())
    }
}

/// Something that can check a set of properties.
pub trait PropertyChecker {
    /// Check every property and return one result per property.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// True when every property holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// Only the violated properties.
    fn failures(&self) -> Vec<PropertyResult> {
        self.check_all().into_iter().filter(|r| !r.holds).collect()
    }

    /// Panic with every violation rendered, if any property failed.
    fn assert_all_hold(&self) {
        let failures = self.failures();
        if !failures.is_empty() {
            let rendered: Vec<String> = failures.iter().map(ToString::to_string).collect();
            panic!("{} property violation(s):\n{}", failures.len(), rendered.join("\n"));
        }
    }
}
