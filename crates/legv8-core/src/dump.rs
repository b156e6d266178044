//! Text dumps of registers and memory in the format consumed by the
//! differential comparison tooling.

use std::fmt;

use crate::{ArchitecturalState, WordMemory, REGION_SIZE};

/// Widest span, in bytes, a single [`MemoryDump`] lists.
pub const MAX_MEMORY_DUMP_SPAN: u64 = REGION_SIZE;

/// Register dump: instruction count, `PC`, `X0..X31`, and the flags.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDump<'a> {
    state: &'a ArchitecturalState,
    instruction_count: u64,
}

impl<'a> RegisterDump<'a> {
    /// Wraps `state` for display.
    #[must_use]
    pub const fn new(state: &'a ArchitecturalState, instruction_count: u64) -> Self {
        Self {
            state,
            instruction_count,
        }
    }
}

impl fmt::Display for RegisterDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current register/bus values :")?;
        writeln!(f, "-------------------------------------")?;
        writeln!(f, "Instruction Count : {}", self.instruction_count)?;
        writeln!(f, "PC                : 0x{:x}", self.state.pc())?;
        writeln!(f, "Registers:")?;
        for (index, value) in self.state.regs().iter().enumerate() {
            writeln!(f, "X{index}: 0x{value:x}")?;
        }
        writeln!(f, "FLAG_N: {}", u8::from(self.state.flag_negative()))?;
        writeln!(f, "FLAG_Z: {}", u8::from(self.state.flag_zero()))
    }
}

/// Word-by-word dump of an inclusive address range.
pub struct MemoryDump<'a> {
    memory: &'a dyn WordMemory,
    start: u64,
    stop: u64,
}

impl<'a> MemoryDump<'a> {
    /// Dumps the aligned words from `start` through `stop`.
    ///
    /// `stop` is clamped so the listing covers at most
    /// [`MAX_MEMORY_DUMP_SPAN`] bytes.
    #[must_use]
    pub fn new(memory: &'a dyn WordMemory, start: u64, stop: u64) -> Self {
        let start = start & !3;
        let last = start.saturating_add(MAX_MEMORY_DUMP_SPAN - 4);
        Self {
            memory,
            start,
            stop: stop.min(last),
        }
    }
}

impl fmt::Display for MemoryDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory content [0x{:08x}..0x{:08x}] :", self.start, self.stop)?;
        writeln!(f, "-------------------------------------")?;
        let mut addr = self.start;
        while addr <= self.stop {
            writeln!(f, "  0x{addr:08x} ({addr}) : 0x{:x}", self.memory.read_word(addr))?;
            match addr.checked_add(4) {
                Some(next) => addr = next,
                None => break,
            }
        }
        Ok(())
    }
}
