//! Probing results reported per phase

use std::fmt;

/// Outcome of probing one phase.
///
/// An empty result means the phase is available. Results are recomputed on
/// every pass and never persisted as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbingResult {
    /// Name of the phase the failures belong to
    pub phase_name: String,
    /// Human-readable reasons the phase is not available
    pub failed_probes: Vec<String>,
}

impl ProbingResult {
    /// Create a result for a phase with the given failure reasons
    pub fn failed(phase_name: impl Into<String>, failed_probes: Vec<String>) -> Self {
        Self {
            phase_name: phase_name.into(),
            failed_probes,
        }
    }

    /// True when no probe failed
    pub fn is_empty(&self) -> bool {
        self.failed_probes.is_empty()
    }
}

impl fmt::Display for ProbingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(
            f,
            "Phase {:?} failed: {}",
            self.phase_name,
            self.failed_probes.join(", ")
        )
    }
}
