//! Host-facing configuration and stepping outcome types.

use crate::{DEFAULT_DIAGNOSTIC_HISTORY, TEXT_START};

/// What the simulator does when a fetched word matches no dispatch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum UnsupportedPolicy {
    /// Stop the core and surface [`SimError`](crate::SimError) to the caller.
    #[default]
    Fatal,
    /// Stop the core, record a diagnostic, and report a normal outcome.
    Halt,
}

/// Top-level immutable configuration for a simulator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SimConfig {
    /// Initial program counter.
    pub entry_pc: u64,
    /// Handling of unclassifiable instruction words.
    pub unsupported_policy: UnsupportedPolicy,
    /// Number of recent diagnostics retained.
    pub diagnostic_history: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            entry_pc: TEXT_START,
            unsupported_policy: UnsupportedPolicy::Fatal,
            diagnostic_history: DEFAULT_DIAGNOSTIC_HISTORY,
        }
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// An instruction retired.
    Retired {
        /// Whether the instruction redirected the program counter.
        branch_taken: bool,
    },
    /// `HLT` retired and the core stopped.
    Halted,
    /// The core stopped on an unclassifiable word under [`UnsupportedPolicy::Halt`].
    Unsupported {
        /// Offending instruction word.
        word: u32,
    },
    /// The core was already stopped; nothing happened.
    Idle,
}

impl StepOutcome {
    /// Returns `true` when the core is stopped after this step.
    #[must_use]
    pub const fn is_stopped(self) -> bool {
        !matches!(self, Self::Retired { .. })
    }
}

/// Result of a bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Instructions that retired during the run, `HLT` included.
    pub steps: u64,
    /// Outcome of the last step taken, or [`StepOutcome::Idle`] if none ran.
    pub final_step: StepOutcome,
}

#[cfg(test)]
mod tests {
    use super::{SimConfig, StepOutcome, UnsupportedPolicy};
    use crate::TEXT_START;

    #[test]
    fn default_config_starts_at_text_and_is_fatal() {
        let config = SimConfig::default();
        assert_eq!(config.entry_pc, TEXT_START);
        assert_eq!(config.unsupported_policy, UnsupportedPolicy::Fatal);
        assert_eq!(config.diagnostic_history, 64);
    }

    #[test]
    fn stopped_outcomes() {
        assert!(!StepOutcome::Retired { branch_taken: true }.is_stopped());
        assert!(StepOutcome::Halted.is_stopped());
        assert!(StepOutcome::Unsupported { word: 0 }.is_stopped());
        assert!(StepOutcome::Idle.is_stopped());
    }
}
