//! Condition-flag updates produced by flag-setting instructions.

use crate::ArchitecturalState;

/// Describes how `Z`/`N` change after an instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagsUpdate {
    /// Flags are carried over unchanged.
    #[default]
    None,
    /// Flags are replaced.
    UpdateNZ {
        /// Zero flag.
        zero: bool,
        /// Negative flag.
        negative: bool,
    },
}

impl FlagsUpdate {
    /// Derives `Z` and `N` from a 64-bit result.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn from_result(result: u64) -> Self {
        Self::UpdateNZ {
            zero: result == 0,
            negative: (result as i64) < 0,
        }
    }

    /// Writes the update into `state`.
    pub const fn apply(self, state: &mut ArchitecturalState) {
        if let Self::UpdateNZ { zero, negative } = self {
            state.set_flags(zero, negative);
        }
    }
}
