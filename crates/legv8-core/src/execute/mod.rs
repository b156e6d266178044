//! Instruction handlers and the per-cycle driver.
//!
//! Each cycle copies the committed state into a scratch copy whose `pc` is
//! already advanced by four. Handlers read operands and flags from the
//! committed copy and write results, flags, and branch targets into the
//! scratch copy, which then replaces the committed one with `X31` cleared.

#![allow(clippy::cast_possible_truncation, clippy::needless_pass_by_ref_mut)]

mod flags;
mod helpers;

pub use flags::FlagsUpdate;
pub use helpers::{
    compute_branch_target, compute_effective_address, immediate_operand, ArithOp, LogicOp,
};

use crate::decoder::{
    decode_bitfield, decode_branch_offset, decode_branch_register, decode_conditional_branch,
    decode_extended_register, decode_immediate, decode_memory, decode_move_wide,
    decode_multiply, decode_shifted_register, extend_register, is_extended_register_form,
    Condition, ImmediateShift, ShiftType,
};
use crate::memory::access::{
    read_byte, read_doubleword, read_halfword, word_base, write_byte, write_doubleword,
    write_halfword,
};
use crate::{
    disasm, AccessKind, AccessWidth, ArchitecturalState, DecodedInstruction, Diagnostic,
    DiagnosticLog, DispatchTable, Opcode, Register, ReservedField, SimConfig, SimError,
    StepOutcome, UnsupportedPolicy, WordMemory,
};

/// Result of a single handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Execution continues at `pc + 4`.
    Sequential,
    /// A branch replaced the next `pc`.
    BranchTaken,
    /// `HLT` cleared the run flag.
    Halted,
}

/// Everything a handler may read or write during one cycle.
pub struct ExecuteContext<'a> {
    /// Committed state; operands and flags are read from here.
    pub current: &'a ArchitecturalState,
    /// Scratch state; results are written here.
    pub next: &'a mut ArchitecturalState,
    /// Data memory.
    pub memory: &'a mut dyn WordMemory,
    /// Diagnostic sink.
    pub diagnostics: &'a mut DiagnosticLog,
}

impl ExecuteContext<'_> {
    const fn reg(&self, reg: Register) -> u64 {
        if reg.is_zero_register() {
            0
        } else {
            self.current.reg(reg)
        }
    }

    fn reserved(&mut self, word: u32, field: ReservedField) {
        self.diagnostics.record(Diagnostic::ReservedEncoding {
            word,
            pc: self.current.pc(),
            field,
        });
    }

    fn branch_to(&mut self, target: u64) -> ExecuteOutcome {
        self.next.set_pc(target);
        ExecuteOutcome::BranchTaken
    }

    fn write_result(&mut self, rd: Register, result: u64, set_flags: bool) {
        if set_flags {
            FlagsUpdate::from_result(result).apply(self.next);
            if !rd.is_zero_register() {
                self.next.set_reg(rd, result);
            }
        } else {
            self.next.set_reg(rd, result);
        }
    }
}

/// Runs the handler for an already classified instruction.
pub fn execute_instruction(
    instr: DecodedInstruction,
    ctx: &mut ExecuteContext<'_>,
) -> ExecuteOutcome {
    let word = instr.word;
    match instr.opcode {
        Opcode::Hlt => execute_halt(ctx),
        Opcode::B => execute_branch(word, ctx),
        Opcode::Br => execute_branch_register(word, ctx),
        Opcode::BCond => execute_branch_conditional(word, ctx),
        Opcode::Cbz => execute_compare_branch(word, ctx, false),
        Opcode::Cbnz => execute_compare_branch(word, ctx, true),
        Opcode::AddImm => execute_add_sub_immediate(word, ctx, ArithOp::Add, false),
        Opcode::AddsImm => execute_add_sub_immediate(word, ctx, ArithOp::Add, true),
        Opcode::SubImm => execute_add_sub_immediate(word, ctx, ArithOp::Sub, false),
        Opcode::SubsImm => execute_add_sub_immediate(word, ctx, ArithOp::Sub, true),
        Opcode::AddReg => execute_add_sub_register(word, ctx, ArithOp::Add, false),
        Opcode::AddsReg => execute_add_sub_register(word, ctx, ArithOp::Add, true),
        Opcode::SubReg => execute_add_sub_register(word, ctx, ArithOp::Sub, false),
        Opcode::SubsReg => execute_add_sub_register(word, ctx, ArithOp::Sub, true),
        Opcode::And => execute_logical(word, ctx, LogicOp::And, false),
        Opcode::Ands => execute_logical(word, ctx, LogicOp::And, true),
        Opcode::Eor => execute_logical(word, ctx, LogicOp::Eor, false),
        Opcode::Orr => execute_logical(word, ctx, LogicOp::Orr, false),
        Opcode::Movz => execute_movz(word, ctx),
        Opcode::ShiftImm => execute_shift_immediate(word, ctx),
        Opcode::Stur => execute_store(word, ctx, AccessWidth::Doubleword),
        Opcode::Sturb => execute_store(word, ctx, AccessWidth::Byte),
        Opcode::Sturh => execute_store(word, ctx, AccessWidth::Halfword),
        Opcode::Ldur => execute_load(word, ctx, AccessWidth::Doubleword),
        Opcode::Ldurb => execute_load(word, ctx, AccessWidth::Byte),
        Opcode::Ldurh => execute_load(word, ctx, AccessWidth::Halfword),
        Opcode::Mul => execute_multiply(word, ctx),
    }
}

fn execute_halt(ctx: &mut ExecuteContext<'_>) -> ExecuteOutcome {
    ctx.next.set_running(false);
    ctx.next.set_pc(ctx.current.pc());
    ExecuteOutcome::Halted
}

fn execute_branch(word: u32, ctx: &mut ExecuteContext<'_>) -> ExecuteOutcome {
    let target = compute_branch_target(ctx.current.pc(), decode_branch_offset(word));
    ctx.branch_to(target)
}

fn execute_branch_register(word: u32, ctx: &mut ExecuteContext<'_>) -> ExecuteOutcome {
    let target = ctx.reg(decode_branch_register(word));
    ctx.branch_to(target)
}

fn execute_branch_conditional(word: u32, ctx: &mut ExecuteContext<'_>) -> ExecuteOutcome {
    let ops = decode_conditional_branch(word);
    let Some(condition) = Condition::from_u4(u32::from(ops.cond)) else {
        ctx.reserved(word, ReservedField::ConditionCode(ops.cond));
        return ExecuteOutcome::Sequential;
    };
    if condition.holds(ctx.current.flag_zero(), ctx.current.flag_negative()) {
        let target = compute_branch_target(ctx.current.pc(), ops.offset);
        ctx.branch_to(target)
    } else {
        ExecuteOutcome::Sequential
    }
}

fn execute_compare_branch(
    word: u32,
    ctx: &mut ExecuteContext<'_>,
    branch_if_nonzero: bool,
) -> ExecuteOutcome {
    let ops = decode_conditional_branch(word);
    if (ctx.reg(ops.rt) != 0) == branch_if_nonzero {
        let target = compute_branch_target(ctx.current.pc(), ops.offset);
        ctx.branch_to(target)
    } else {
        ExecuteOutcome::Sequential
    }
}

fn execute_add_sub_immediate(
    word: u32,
    ctx: &mut ExecuteContext<'_>,
    op: ArithOp,
    set_flags: bool,
) -> ExecuteOutcome {
    let ops = decode_immediate(word);
    let operand = immediate_operand(ops.imm12, ops.shift).unwrap_or_else(|| {
        ctx.reserved(word, ReservedField::ImmediateShift(ops.shift));
        ops.imm12
    });
    let result = op.apply(ctx.reg(ops.rn), operand);
    ctx.write_result(ops.rd, result, set_flags);
    ExecuteOutcome::Sequential
}

fn execute_add_sub_register(
    word: u32,
    ctx: &mut ExecuteContext<'_>,
    op: ArithOp,
    set_flags: bool,
) -> ExecuteOutcome {
    let (rd, rn, operand) = if is_extended_register_form(word) {
        let ops = decode_extended_register(word);
        let operand = extend_register(ctx.reg(ops.rm), ops.option, ops.amount);
        (ops.rd, ops.rn, operand)
    } else {
        let ops = decode_shifted_register(word);
        let operand = if ops.shift == ShiftType::Ror {
            ctx.reserved(word, ReservedField::RegisterShift);
            ctx.reg(ops.rm)
        } else {
            ops.shift.apply(ctx.reg(ops.rm), ops.amount)
        };
        (ops.rd, ops.rn, operand)
    };
    let result = op.apply(ctx.reg(rn), operand);
    ctx.write_result(rd, result, set_flags);
    ExecuteOutcome::Sequential
}

fn execute_logical(
    word: u32,
    ctx: &mut ExecuteContext<'_>,
    op: LogicOp,
    set_flags: bool,
) -> ExecuteOutcome {
    let ops = decode_shifted_register(word);
    let mut operand = ops.shift.apply(ctx.reg(ops.rm), ops.amount);
    if ops.invert {
        operand = !operand;
    }
    let result = op.apply(ctx.reg(ops.rn), operand);
    ctx.write_result(ops.rd, result, set_flags);
    ExecuteOutcome::Sequential
}

fn execute_movz(word: u32, ctx: &mut ExecuteContext<'_>) -> ExecuteOutcome {
    let ops = decode_move_wide(word);
    if ops.hw == 0 {
        ctx.next.set_reg(ops.rd, ops.imm16);
    } else {
        ctx.reserved(word, ReservedField::MoveWideShift(ops.hw));
    }
    ExecuteOutcome::Sequential
}

fn execute_shift_immediate(word: u32, ctx: &mut ExecuteContext<'_>) -> ExecuteOutcome {
    let ops = decode_bitfield(word);
    let source = ctx.reg(ops.rn);
    match ops.shift() {
        Some(ImmediateShift::Left(amount)) => ctx.next.set_reg(ops.rd, source << amount),
        Some(ImmediateShift::Right(amount)) => ctx.next.set_reg(ops.rd, source >> amount),
        None => ctx.reserved(
            word,
            ReservedField::BitfieldMove {
                immr: ops.immr,
                imms: ops.imms,
            },
        ),
    }
    ExecuteOutcome::Sequential
}

fn execute_store(word: u32, ctx: &mut ExecuteContext<'_>, width: AccessWidth) -> ExecuteOutcome {
    let ops = decode_memory(word);
    if ops.index_mode != 0 {
        ctx.reserved(word, ReservedField::IndexedAddressing(ops.index_mode));
    }
    let addr = compute_effective_address(ctx.reg(ops.rn), ops.offset);
    let value = ctx.reg(ops.rt);
    match width {
        AccessWidth::Byte => write_byte(ctx.memory, addr, value as u8),
        AccessWidth::Halfword => write_halfword(ctx.memory, addr, value as u16, ctx.diagnostics),
        AccessWidth::Word => ctx.memory.write_word(addr, value as u32),
        AccessWidth::Doubleword => write_doubleword(ctx.memory, addr, value, ctx.diagnostics),
    }
    ExecuteOutcome::Sequential
}

fn execute_load(word: u32, ctx: &mut ExecuteContext<'_>, width: AccessWidth) -> ExecuteOutcome {
    let ops = decode_memory(word);
    if ops.index_mode != 0 {
        ctx.reserved(word, ReservedField::IndexedAddressing(ops.index_mode));
    }
    let addr = compute_effective_address(ctx.reg(ops.rn), ops.offset);
    let value = match width {
        AccessWidth::Byte => u64::from(read_byte(ctx.memory, addr)),
        AccessWidth::Halfword => u64::from(read_halfword(ctx.memory, addr, ctx.diagnostics)),
        AccessWidth::Word => u64::from(ctx.memory.read_word(addr)),
        AccessWidth::Doubleword => read_doubleword(ctx.memory, addr, ctx.diagnostics),
    };
    ctx.next.set_reg(ops.rt, value);
    ExecuteOutcome::Sequential
}

fn execute_multiply(word: u32, ctx: &mut ExecuteContext<'_>) -> ExecuteOutcome {
    let ops = decode_multiply(word);
    let product = ctx.reg(ops.rn).wrapping_mul(ctx.reg(ops.rm));
    let accumulator = ctx.reg(ops.ra);
    let result = if ops.subtract {
        accumulator.wrapping_sub(product)
    } else {
        accumulator.wrapping_add(product)
    };
    ctx.next.set_reg(ops.rd, result);
    ExecuteOutcome::Sequential
}

/// Replaces the committed state with the scratch state, forcing `X31` to zero.
pub fn commit_cycle(state: &mut ArchitecturalState, mut next: ArchitecturalState) {
    next.clear_zero_register();
    *state = next;
}

fn fetch(pc: u64, memory: &dyn WordMemory, diagnostics: &mut DiagnosticLog) -> u32 {
    if !AccessWidth::Word.is_aligned(pc) {
        diagnostics.record(Diagnostic::UnalignedAccess {
            addr: pc,
            width: AccessWidth::Word,
            kind: AccessKind::Fetch,
        });
    }
    memory.read_word(word_base(pc))
}

/// Executes one fetch/classify/execute/commit cycle.
///
/// A stopped core is left untouched and reports [`StepOutcome::Idle`].
///
/// # Errors
///
/// Returns [`SimError::UnsupportedInstruction`] when the fetched word matches
/// no dispatch entry and `config.unsupported_policy` is
/// [`UnsupportedPolicy::Fatal`]. The core is stopped in that case.
pub fn step_one(
    state: &mut ArchitecturalState,
    memory: &mut dyn WordMemory,
    dispatch: &DispatchTable,
    diagnostics: &mut DiagnosticLog,
    config: &SimConfig,
) -> Result<StepOutcome, SimError> {
    if !state.running() {
        return Ok(StepOutcome::Idle);
    }
    // Hosts may have poked X31 between cycles.
    state.clear_zero_register();

    let pc = state.pc();
    let word = fetch(pc, memory, diagnostics);
    let Some(instr) = dispatch.decode(word) else {
        return handle_unsupported(state, word, diagnostics, config);
    };
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("{pc:#010x}: {word:08x}  {}", disasm::render(instr));
    }

    let mut next = state.successor();
    let outcome = execute_instruction(
        instr,
        &mut ExecuteContext {
            current: state,
            next: &mut next,
            memory,
            diagnostics,
        },
    );
    commit_cycle(state, next);

    Ok(match outcome {
        ExecuteOutcome::Sequential => StepOutcome::Retired {
            branch_taken: false,
        },
        ExecuteOutcome::BranchTaken => StepOutcome::Retired { branch_taken: true },
        ExecuteOutcome::Halted => StepOutcome::Halted,
    })
}

fn handle_unsupported(
    state: &mut ArchitecturalState,
    word: u32,
    diagnostics: &mut DiagnosticLog,
    config: &SimConfig,
) -> Result<StepOutcome, SimError> {
    let pc = state.pc();
    state.set_running(false);
    match config.unsupported_policy {
        UnsupportedPolicy::Fatal => {
            log::error!("unsupported instruction 0x{word:08X} at 0x{pc:016X}");
            Err(SimError::UnsupportedInstruction { word, pc })
        }
        UnsupportedPolicy::Halt => {
            diagnostics.record(Diagnostic::UnsupportedInstruction { word, pc });
            Ok(StepOutcome::Unsupported { word })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{execute_instruction, step_one, ExecuteContext, ExecuteOutcome};
    use crate::{
        ArchitecturalState, DiagnosticClass, DiagnosticLog, DispatchTable, Register,
        RegionMemory, SimConfig, SimError, StepOutcome, UnsupportedPolicy, WordMemory,
        DATA_START, TEXT_START,
    };
    use rstest::rstest;

    struct Fixture {
        current: ArchitecturalState,
        next: ArchitecturalState,
        memory: RegionMemory,
        diagnostics: DiagnosticLog,
        dispatch: DispatchTable,
    }

    impl Fixture {
        fn new() -> Self {
            let current = ArchitecturalState::with_entry(TEXT_START);
            Self {
                next: current.successor(),
                current,
                memory: RegionMemory::new(),
                diagnostics: DiagnosticLog::default(),
                dispatch: DispatchTable::new(),
            }
        }

        fn set(&mut self, index: u32, value: u64) {
            self.current.set_reg(Register::from_u5(index), value);
            self.next = self.current.successor();
        }

        fn exec(&mut self, word: u32) -> ExecuteOutcome {
            let instr = self.dispatch.decode(word).expect("word should classify");
            execute_instruction(
                instr,
                &mut ExecuteContext {
                    current: &self.current,
                    next: &mut self.next,
                    memory: &mut self.memory,
                    diagnostics: &mut self.diagnostics,
                },
            )
        }

        fn next_reg(&self, index: u32) -> u64 {
            self.next.reg(Register::from_u5(index))
        }
    }

    #[test]
    fn add_immediate_writes_next_only() {
        let mut fx = Fixture::new();
        fx.set(1, 5);
        // ADD X3, X1, #10
        assert_eq!(fx.exec(0x9100_2823), ExecuteOutcome::Sequential);
        assert_eq!(fx.next_reg(3), 15);
        assert_eq!(fx.current.reg(Register::from_u5(3)), 0);
        assert_eq!(fx.next.pc(), TEXT_START + 4);
    }

    #[test]
    fn reserved_immediate_shift_is_treated_as_unshifted() {
        let mut fx = Fixture::new();
        // ADD X0, X0, #1 with shift selector 2
        fx.exec(0x9180_0400);
        assert_eq!(fx.next_reg(0), 1);
        assert_eq!(fx.diagnostics.count(DiagnosticClass::Decode), 1);
    }

    #[test]
    fn subs_to_xzr_only_sets_flags() {
        let mut fx = Fixture::new();
        fx.set(1, 7);
        fx.set(2, 7);
        // CMP X1, X2 == SUBS XZR, X1, X2
        fx.exec(0xEB02_003F);
        assert!(fx.next.flag_zero());
        assert!(!fx.next.flag_negative());
        assert_eq!(fx.next_reg(31), 0);
    }

    #[test]
    fn subs_negative_result_sets_n() {
        let mut fx = Fixture::new();
        fx.set(1, 1);
        // SUBS X0, X1, #2
        fx.exec(0xF100_0820);
        assert_eq!(fx.next_reg(0), u64::MAX);
        assert!(fx.next.flag_negative());
        assert!(!fx.next.flag_zero());
    }

    #[test]
    fn extended_register_sign_extends_word() {
        let mut fx = Fixture::new();
        fx.set(0, 100);
        fx.set(1, 0xFFFF_FFFF);
        // ADD X2, X0, W1, SXTW #2
        fx.exec(0x8B21_C802);
        assert_eq!(fx.next_reg(2), 96);
    }

    #[test]
    fn orn_inverts_shifted_operand() {
        let mut fx = Fixture::new();
        fx.set(1, 0);
        fx.set(2, 0xF0);
        // ORR X0, X1, X2, LSR #4 with N set
        fx.exec(0xAA62_1020);
        assert_eq!(fx.next_reg(0), !0xF);
    }

    #[test]
    fn eor_and_orr_leave_flags_alone() {
        let mut fx = Fixture::new();
        fx.current.set_flags(true, true);
        fx.next = fx.current.successor();
        // EOR X0, X0, X0
        fx.exec(0xCA00_0000);
        assert!(fx.next.flag_zero() && fx.next.flag_negative());

        // ANDS X0, X1, X2 with X1 = X2 = 0
        fx.exec(0xEA02_0020);
        assert!(fx.next.flag_zero());
        assert!(!fx.next.flag_negative());
    }

    #[test]
    fn movz_with_shift_leaves_destination() {
        let mut fx = Fixture::new();
        fx.set(0, 9);
        // MOVZ X0, #1, LSL #16
        fx.exec(0xD2A0_0020);
        assert_eq!(fx.next_reg(0), 9);
        assert_eq!(fx.diagnostics.count(DiagnosticClass::Decode), 1);
    }

    #[test]
    fn shift_immediate_aliases() {
        let mut fx = Fixture::new();
        fx.set(1, 0x10);
        // LSL X0, X1, #4
        fx.exec(0xD37C_EC20);
        assert_eq!(fx.next_reg(0), 0x100);
        // LSR X2, X1, #4
        fx.exec(0xD344_FC22);
        assert_eq!(fx.next_reg(2), 0x1);
        // UBFX X3, X1, #4, #8 is outside the subset
        fx.exec(0xD344_2C23);
        assert_eq!(fx.next_reg(3), 0);
        assert_eq!(fx.diagnostics.count(DiagnosticClass::Decode), 1);
    }

    #[test]
    fn store_then_load_narrow_widths() {
        let mut fx = Fixture::new();
        fx.set(1, 0x1234_5678_9ABC_DEF0);
        fx.set(2, DATA_START);
        // STUR X1, [X2]
        fx.exec(0xF800_0041);
        // STURB W1, [X2, #8]
        fx.exec(0x3800_8041);
        // STURH W1, [X2, #16]
        fx.exec(0x7801_0041);
        assert_eq!(fx.memory.read_word(DATA_START), 0x9ABC_DEF0);
        assert_eq!(fx.memory.read_word(DATA_START + 4), 0x1234_5678);
        assert_eq!(fx.memory.read_word(DATA_START + 8), 0xF0);
        assert_eq!(fx.memory.read_word(DATA_START + 16), 0xDEF0);

        // LDURH X3, [X2, #16]
        fx.exec(0x7841_0043);
        assert_eq!(fx.next_reg(3), 0xDEF0);
        // LDURB X4, [X2, #8]
        fx.exec(0x3840_8044);
        assert_eq!(fx.next_reg(4), 0xF0);
        // LDUR X5, [X2]
        fx.exec(0xF840_0045);
        assert_eq!(fx.next_reg(5), 0x1234_5678_9ABC_DEF0);
        assert!(fx.diagnostics.is_empty());
    }

    #[test]
    fn conditional_branch_reads_committed_flags() {
        let mut fx = Fixture::new();
        fx.current.set_flags(true, false);
        fx.next = fx.current.successor();
        fx.next.set_flags(false, false);
        // B.EQ +8
        assert_eq!(fx.exec(0x5400_0040), ExecuteOutcome::BranchTaken);
        assert_eq!(fx.next.pc(), TEXT_START + 8);
    }

    #[test]
    fn unmodelled_condition_falls_through() {
        let mut fx = Fixture::new();
        // B.CS +8
        assert_eq!(fx.exec(0x5400_0042), ExecuteOutcome::Sequential);
        assert_eq!(fx.next.pc(), TEXT_START + 4);
        assert_eq!(fx.diagnostics.count(DiagnosticClass::Decode), 1);
    }

    #[rstest]
    #[case::al(0x5400_004E, false)]
    #[case::nv(0x5400_004F, false)]
    #[case::mi(0x5400_0044, true)]
    #[case::pl(0x5400_0045, false)]
    fn n_only_and_always_conditions_branch(#[case] word: u32, #[case] negative: bool) {
        let mut fx = Fixture::new();
        fx.current.set_flags(false, negative);
        fx.next = fx.current.successor();
        assert_eq!(fx.exec(word), ExecuteOutcome::BranchTaken);
        assert_eq!(fx.next.pc(), TEXT_START + 8);
        assert!(fx.diagnostics.is_empty());
    }

    #[test]
    fn minus_not_taken_when_n_clear() {
        let mut fx = Fixture::new();
        // B.MI +8
        assert_eq!(fx.exec(0x5400_0044), ExecuteOutcome::Sequential);
        assert_eq!(fx.next.pc(), TEXT_START + 4);
    }

    #[test]
    fn stale_x31_reads_as_zero() {
        let mut fx = Fixture::new();
        fx.set(31, 0x55);
        // ADD X0, XZR, #0
        fx.exec(0x9100_03E0);
        assert_eq!(fx.next_reg(0), 0);
    }

    #[test]
    fn step_clears_x31_poked_between_cycles() {
        let mut state = ArchitecturalState::with_entry(TEXT_START);
        let mut memory = RegionMemory::new();
        let mut diagnostics = DiagnosticLog::default();
        // ORR X1, XZR, XZR
        memory.write_word(TEXT_START, 0xAA1F_03E1);
        state.set_reg(Register::XZR, 0x55);

        step_one(
            &mut state,
            &mut memory,
            &DispatchTable::new(),
            &mut diagnostics,
            &SimConfig::default(),
        )
        .expect("ORR is supported");

        assert_eq!(state.reg(Register::from_u5(1)), 0);
        assert_eq!(state.reg(Register::XZR), 0);
    }

    #[test]
    fn indexed_addressing_is_flagged_without_writeback() {
        let mut fx = Fixture::new();
        fx.set(1, 0xAB);
        fx.set(2, DATA_START);
        // STR X1, [X2, #8]!
        fx.exec(0xF800_8C41);
        // LDR X3, [X2], #8
        fx.exec(0xF840_8443);
        assert_eq!(fx.memory.read_word(DATA_START + 8), 0xAB);
        assert_eq!(fx.next_reg(2), DATA_START);
        assert_eq!(fx.next_reg(3), 0xAB);
        assert_eq!(fx.diagnostics.count(DiagnosticClass::Decode), 2);
    }

    #[test]
    fn compare_branches() {
        let mut fx = Fixture::new();
        // CBZ X5, +16
        assert_eq!(fx.exec(0xB400_0085), ExecuteOutcome::BranchTaken);
        assert_eq!(fx.next.pc(), TEXT_START + 16);

        let mut fx = Fixture::new();
        // CBNZ X5, +16
        assert_eq!(fx.exec(0xB500_0085), ExecuteOutcome::Sequential);
        assert_eq!(fx.next.pc(), TEXT_START + 4);
    }

    #[test]
    fn register_branch_and_backward_branch() {
        let mut fx = Fixture::new();
        fx.set(30, 0x0040_0100);
        // BR X30
        fx.exec(0xD61F_03C0);
        assert_eq!(fx.next.pc(), 0x0040_0100);

        let mut fx = Fixture::new();
        fx.current.set_pc(TEXT_START + 8);
        fx.next = fx.current.successor();
        // B -8
        fx.exec(0x17FF_FFFE);
        assert_eq!(fx.next.pc(), TEXT_START);
    }

    #[test]
    fn multiply_accumulate_and_subtract() {
        let mut fx = Fixture::new();
        fx.set(1, 6);
        fx.set(2, 7);
        fx.set(4, 100);
        // MUL X3, X1, X2
        fx.exec(0x9B02_7C23);
        assert_eq!(fx.next_reg(3), 42);
        // MSUB X3, X1, X2, X4
        fx.exec(0x9B02_9023);
        assert_eq!(fx.next_reg(3), 58);
    }

    #[test]
    fn halt_keeps_pc_and_stops() {
        let mut fx = Fixture::new();
        assert_eq!(fx.exec(0xD440_0000), ExecuteOutcome::Halted);
        assert_eq!(fx.next.pc(), TEXT_START);
        assert!(!fx.next.running());
    }

    #[test]
    fn step_one_clears_x31_and_advances() {
        let mut fx = Fixture::new();
        // ADD XZR, XZR, #5
        fx.memory.write_word(TEXT_START, 0x9100_17FF);
        let outcome = step_one(
            &mut fx.current,
            &mut fx.memory,
            &fx.dispatch,
            &mut fx.diagnostics,
            &SimConfig::default(),
        );
        assert_eq!(
            outcome,
            Ok(StepOutcome::Retired {
                branch_taken: false
            })
        );
        assert_eq!(fx.current.reg(Register::XZR), 0);
        assert_eq!(fx.current.pc(), TEXT_START + 4);
    }

    #[test]
    fn unsupported_word_policies() {
        let mut fx = Fixture::new();
        let fatal = step_one(
            &mut fx.current,
            &mut fx.memory,
            &fx.dispatch,
            &mut fx.diagnostics,
            &SimConfig::default(),
        );
        assert_eq!(
            fatal,
            Err(SimError::UnsupportedInstruction {
                word: 0,
                pc: TEXT_START
            })
        );
        assert!(!fx.current.running());

        let mut fx = Fixture::new();
        let config = SimConfig {
            unsupported_policy: UnsupportedPolicy::Halt,
            ..SimConfig::default()
        };
        let halted = step_one(
            &mut fx.current,
            &mut fx.memory,
            &fx.dispatch,
            &mut fx.diagnostics,
            &config,
        );
        assert_eq!(halted, Ok(StepOutcome::Unsupported { word: 0 }));
        assert_eq!(fx.diagnostics.count(DiagnosticClass::Dispatch), 1);
        assert_eq!(fx.current.pc(), TEXT_START);

        let idle = step_one(
            &mut fx.current,
            &mut fx.memory,
            &fx.dispatch,
            &mut fx.diagnostics,
            &config,
        );
        assert_eq!(idle, Ok(StepOutcome::Idle));
    }
}
