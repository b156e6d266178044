//! Simulator instance owning state, memory, dispatch table, and diagnostics.

use crate::execute::step_one;
use crate::{
    disasm, ArchitecturalState, DiagnosticLog, DispatchTable, RegionMemory, RunOutcome,
    SimConfig, SimError, StepOutcome, WordMemory,
};

/// One independent simulated core.
///
/// Instances share nothing, so several may run side by side for
/// differential testing.
#[derive(Debug, Clone)]
pub struct Simulator<M: WordMemory = RegionMemory> {
    state: ArchitecturalState,
    memory: M,
    dispatch: DispatchTable,
    config: SimConfig,
    diagnostics: DiagnosticLog,
    instruction_count: u64,
}

impl Simulator<RegionMemory> {
    /// Creates a simulator over fresh region-backed memory.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self::with_memory(RegionMemory::new(), config)
    }
}

impl Default for Simulator<RegionMemory> {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl<M: WordMemory> Simulator<M> {
    /// Creates a simulator over caller-supplied memory.
    pub fn with_memory(memory: M, config: SimConfig) -> Self {
        Self {
            state: ArchitecturalState::with_entry(config.entry_pc),
            memory,
            dispatch: DispatchTable::new(),
            diagnostics: DiagnosticLog::with_capacity(config.diagnostic_history),
            config,
            instruction_count: 0,
        }
    }

    /// Executes one instruction.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnsupportedInstruction`] under the fatal policy when
    /// the word at `pc` matches no supported instruction.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        let outcome = step_one(
            &mut self.state,
            &mut self.memory,
            &self.dispatch,
            &mut self.diagnostics,
            &self.config,
        )?;
        if matches!(outcome, StepOutcome::Retired { .. } | StepOutcome::Halted) {
            self.instruction_count = self.instruction_count.wrapping_add(1);
        }
        if outcome == StepOutcome::Halted {
            log::info!(
                "halted at 0x{:016X} after {} instructions",
                self.state.pc(),
                self.instruction_count
            );
        }
        Ok(outcome)
    }

    /// Executes up to `max_steps` instructions, stopping early once the core stops.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`step`](Self::step).
    pub fn run(&mut self, max_steps: u64) -> Result<RunOutcome, SimError> {
        let mut run = RunOutcome {
            steps: 0,
            final_step: StepOutcome::Idle,
        };
        while run.steps < max_steps {
            let outcome = self.step()?;
            run.final_step = outcome;
            if matches!(outcome, StepOutcome::Retired { .. } | StepOutcome::Halted) {
                run.steps += 1;
            }
            if outcome.is_stopped() {
                break;
            }
        }
        Ok(run)
    }

    /// Executes until the core stops.
    ///
    /// Loops forever on a program that never halts; use [`run`](Self::run) to bound it.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`step`](Self::step).
    pub fn run_to_halt(&mut self) -> Result<RunOutcome, SimError> {
        self.run(u64::MAX)
    }

    /// Committed architectural state.
    #[must_use]
    pub const fn state(&self) -> &ArchitecturalState {
        &self.state
    }

    /// Mutable access to the committed state, for loaders and shells.
    pub const fn state_mut(&mut self) -> &mut ArchitecturalState {
        &mut self.state
    }

    /// Memory image.
    #[must_use]
    pub const fn memory(&self) -> &M {
        &self.memory
    }

    /// Mutable access to the memory image.
    pub const fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Diagnostics recorded so far.
    #[must_use]
    pub const fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Configuration this instance was built with.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Instructions retired since construction or the last [`reset`](Self::reset).
    #[must_use]
    pub const fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    /// Restores registers, flags, `pc`, and counters; memory is kept.
    pub fn reset(&mut self) {
        self.state = ArchitecturalState::with_entry(self.config.entry_pc);
        self.diagnostics.clear();
        self.instruction_count = 0;
    }

    /// Disassembles the word at `addr`.
    #[must_use]
    pub fn disassemble_at(&self, addr: u64) -> String {
        disasm::disassemble(&self.dispatch, self.memory.read_word(addr & !3))
    }
}
