//! Instruction disassembly for step traces and the shell.

use std::fmt;

use crate::decoder::{
    decode_bitfield, decode_branch_offset, decode_branch_register, decode_conditional_branch,
    decode_extended_register, decode_immediate, decode_memory, decode_move_wide,
    decode_multiply, decode_shifted_register, field, is_extended_register_form, ImmediateShift,
    ShiftType, CONDITION_NAMES,
};
use crate::{DecodedInstruction, DispatchTable, Opcode, Register, WordMemory};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the instruction.
    pub addr: u64,
    /// Raw instruction word.
    pub word: u32,
    /// Mnemonic, e.g. `ADDS` or `B.NE`.
    pub mnemonic: String,
    /// Formatted operands, possibly empty.
    pub operands: String,
    /// Whether the word matched no supported instruction.
    pub is_unsupported: bool,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            f.write_str(&self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, self.operands)
        }
    }
}

/// Disassembles `count` consecutive words starting at `start`.
#[must_use]
pub fn disassemble_range(
    dispatch: &DispatchTable,
    memory: &dyn WordMemory,
    start: u64,
    count: usize,
) -> Vec<DisassemblyRow> {
    (0..count as u64)
        .map(|index| {
            let addr = (start & !3).wrapping_add(index * 4);
            disassemble_row(dispatch, addr, memory.read_word(addr))
        })
        .collect()
}

/// Disassembles `word` as if it sat at `addr`.
#[must_use]
pub fn disassemble_row(dispatch: &DispatchTable, addr: u64, word: u32) -> DisassemblyRow {
    match dispatch.decode(word) {
        Some(instr) => {
            let (mnemonic, operands) = format_parts(instr);
            DisassemblyRow {
                addr,
                word,
                mnemonic,
                operands,
                is_unsupported: false,
            }
        }
        None => DisassemblyRow {
            addr,
            word,
            mnemonic: ".word".to_string(),
            operands: format!("0x{word:08x}"),
            is_unsupported: true,
        },
    }
}

/// Disassembles a single word to text.
#[must_use]
pub fn disassemble(dispatch: &DispatchTable, word: u32) -> String {
    disassemble_row(dispatch, 0, word).to_string()
}

/// Renders an already classified instruction.
#[must_use]
pub fn render(instr: DecodedInstruction) -> String {
    let (mnemonic, operands) = format_parts(instr);
    if operands.is_empty() {
        mnemonic
    } else {
        format!("{mnemonic} {operands}")
    }
}

fn format_parts(instr: DecodedInstruction) -> (String, String) {
    let word = instr.word;
    match instr.opcode {
        Opcode::Hlt => ("HLT".into(), format!("#{}", field(word, 5, 16))),
        Opcode::B => ("B".into(), relative(decode_branch_offset(word))),
        Opcode::Br => ("BR".into(), decode_branch_register(word).to_string()),
        Opcode::BCond => {
            let ops = decode_conditional_branch(word);
            (
                format!("B.{}", CONDITION_NAMES[usize::from(ops.cond)]),
                relative(ops.offset),
            )
        }
        Opcode::Cbz | Opcode::Cbnz => {
            let ops = decode_conditional_branch(word);
            (
                instr.opcode.mnemonic().into(),
                format!("{}, {}", ops.rt, relative(ops.offset)),
            )
        }
        Opcode::AddImm | Opcode::AddsImm | Opcode::SubImm | Opcode::SubsImm => {
            let ops = decode_immediate(word);
            let mut operands = format!("{}, {}, #{}", ops.rd, ops.rn, ops.imm12);
            if ops.shift != 0 {
                operands.push_str(&format!(", LSL #{}", u32::from(ops.shift) * 12));
            }
            (instr.opcode.mnemonic().into(), operands)
        }
        Opcode::AddReg | Opcode::AddsReg | Opcode::SubReg | Opcode::SubsReg => {
            (instr.opcode.mnemonic().into(), format_add_sub_register(word))
        }
        Opcode::And | Opcode::Ands | Opcode::Eor | Opcode::Orr => {
            let ops = decode_shifted_register(word);
            let mnemonic = match (instr.opcode, ops.invert) {
                (Opcode::And, true) => "BIC",
                (Opcode::Ands, true) => "BICS",
                (Opcode::Eor, true) => "EON",
                (Opcode::Orr, true) => "ORN",
                (opcode, false) => opcode.mnemonic(),
                _ => "?",
            };
            let mut operands = format!("{}, {}, {}", ops.rd, ops.rn, ops.rm);
            push_shift(&mut operands, ops.shift, ops.amount);
            (mnemonic.into(), operands)
        }
        Opcode::Movz => {
            let ops = decode_move_wide(word);
            let mut operands = format!("{}, #{}", ops.rd, ops.imm16);
            if ops.hw != 0 {
                operands.push_str(&format!(", LSL #{}", u32::from(ops.hw) * 16));
            }
            ("MOVZ".into(), operands)
        }
        Opcode::ShiftImm => {
            let ops = decode_bitfield(word);
            match ops.shift() {
                Some(ImmediateShift::Left(amount)) => {
                    ("LSL".into(), format!("{}, {}, #{amount}", ops.rd, ops.rn))
                }
                Some(ImmediateShift::Right(amount)) => {
                    ("LSR".into(), format!("{}, {}, #{amount}", ops.rd, ops.rn))
                }
                None => (
                    "UBFM".into(),
                    format!("{}, {}, #{}, #{}", ops.rd, ops.rn, ops.immr, ops.imms),
                ),
            }
        }
        Opcode::Stur | Opcode::Ldur | Opcode::Sturb | Opcode::Ldurb | Opcode::Sturh
        | Opcode::Ldurh => {
            let ops = decode_memory(word);
            let rt = if matches!(instr.opcode, Opcode::Stur | Opcode::Ldur) {
                ops.rt.to_string()
            } else {
                w_register(ops.rt)
            };
            let address = if ops.offset == 0 {
                format!("[{}]", ops.rn)
            } else {
                format!("[{}, #{}]", ops.rn, ops.offset)
            };
            (instr.opcode.mnemonic().into(), format!("{rt}, {address}"))
        }
        Opcode::Mul => {
            let ops = decode_multiply(word);
            if ops.ra.is_zero_register() && !ops.subtract {
                ("MUL".into(), format!("{}, {}, {}", ops.rd, ops.rn, ops.rm))
            } else {
                (
                    if ops.subtract { "MSUB" } else { "MADD" }.into(),
                    format!("{}, {}, {}, {}", ops.rd, ops.rn, ops.rm, ops.ra),
                )
            }
        }
    }
}

fn format_add_sub_register(word: u32) -> String {
    if is_extended_register_form(word) {
        let ops = decode_extended_register(word);
        let mut operands = format!("{}, {}, {}, {}", ops.rd, ops.rn, ops.rm, ops.option.name());
        if ops.amount != 0 {
            operands.push_str(&format!(" #{}", ops.amount));
        }
        operands
    } else {
        let ops = decode_shifted_register(word);
        let mut operands = format!("{}, {}, {}", ops.rd, ops.rn, ops.rm);
        push_shift(&mut operands, ops.shift, ops.amount);
        operands
    }
}

fn push_shift(operands: &mut String, shift: ShiftType, amount: u32) {
    if amount != 0 || shift != ShiftType::Lsl {
        operands.push_str(&format!(", {} #{amount}", shift.name()));
    }
}

fn relative(offset: i64) -> String {
    if offset < 0 {
        format!(".-{}", offset.unsigned_abs())
    } else {
        format!(".+{offset}")
    }
}

fn w_register(reg: Register) -> String {
    if reg.is_zero_register() {
        "WZR".into()
    } else {
        format!("W{}", reg.index())
    }
}
