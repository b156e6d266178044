//! Instruction-set simulator core for the LEGv8 subset of ARMv8.

/// Word-granular memory interface, region map, and narrow accessors.
pub mod memory;
pub use memory::{
    decode_memory_region, read_byte, read_doubleword, read_halfword, write_byte,
    write_doubleword, write_halfword, MemoryRegion, RegionDescriptor, RegionMemory, WordMemory,
    DATA_START, KERNEL_DATA_START, KERNEL_TEXT_START, MEMORY_REGIONS, REGION_SIZE, STACK_START,
    TEXT_START,
};

/// Diagnostic side channel.
pub mod diag;
pub use diag::{DiagnosticLog, DEFAULT_DIAGNOSTIC_HISTORY};

/// Host-facing configuration and outcome types.
pub mod api;
pub use api::{RunOutcome, SimConfig, StepOutcome, UnsupportedPolicy};

/// Architectural state model.
pub mod state;
pub use state::{ArchitecturalState, Register, REGISTER_COUNT, ZERO_REGISTER_INDEX};

/// Opcode patterns and dispatch table.
pub mod encoding;
pub use encoding::{
    prefix, DecodedInstruction, DispatchTable, InstructionFormat, Opcode, OPCODE_PATTERN_TABLE,
    PROBE_WIDTHS,
};

/// Per-format operand decoders and arithmetic primitives.
pub mod decoder;
pub use decoder::{extend_register, sign_extend, Condition, ExtendOption, ShiftType};

/// Fatal errors and non-fatal diagnostics.
pub mod fault;
pub use fault::{
    AccessKind, AccessWidth, Diagnostic, DiagnosticClass, ReservedField, SimError,
};

/// Instruction handlers and the per-cycle driver.
pub mod execute;
pub use execute::{
    commit_cycle, execute_instruction, step_one, ExecuteContext, ExecuteOutcome, FlagsUpdate,
};

/// Simulator instance.
pub mod simulator;
pub use simulator::Simulator;

/// Program loading from `.x` files.
pub mod loader;
pub use loader::{load_program, load_program_file, parse_program, LoadError};

/// Register and memory dumps.
pub mod dump;
pub use dump::{MemoryDump, RegisterDump, MAX_MEMORY_DUMP_SPAN};

/// Disassembler.
pub mod disasm;
pub use disasm::{disassemble, disassemble_range, DisassemblyRow};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
