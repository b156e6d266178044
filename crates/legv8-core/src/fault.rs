use std::fmt;

use thiserror::Error;

/// Diagnostic classes used for aggregation in the diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DiagnosticClass {
    /// Encoding accepted by the classifier but with a reserved or unimplemented field.
    Decode,
    /// Data or fetch access that violated natural alignment.
    Memory,
    /// Instruction word that matched no dispatch table entry.
    Dispatch,
}

/// Width of a memory access, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum AccessWidth {
    /// 8-bit access.
    Byte = 1,
    /// 16-bit access.
    Halfword = 2,
    /// 32-bit access.
    Word = 4,
    /// 64-bit access.
    Doubleword = 8,
}

impl AccessWidth {
    /// Number of bytes moved by an access of this width.
    #[must_use]
    pub const fn bytes(self) -> u64 {
        self as u64
    }

    /// Returns `true` when `addr` is naturally aligned for this width.
    #[must_use]
    pub const fn is_aligned(self, addr: u64) -> bool {
        addr & (self.bytes() - 1) == 0
    }
}

impl fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bytes() * 8)
    }
}

/// Direction of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessKind {
    /// Instruction fetch.
    Fetch,
    /// Data read.
    Read,
    /// Data write.
    Write,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// Field of an otherwise supported instruction that holds a reserved or unimplemented value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ReservedField {
    /// ADD/SUB immediate shift selector other than 0 or 1.
    ImmediateShift(u8),
    /// ADD/SUB shifted-register form using the reserved `ROR` shift type.
    RegisterShift,
    /// MOVZ shift-word selector other than 0.
    MoveWideShift(u8),
    /// B.cond condition code that depends on the unmodelled C/V flags.
    ConditionCode(u8),
    /// Load/store with pre- or post-index addressing bits set; no writeback is modelled.
    IndexedAddressing(u8),
    /// Bitfield move that is neither an LSL nor an LSR alias.
    BitfieldMove {
        /// Rotate field.
        immr: u8,
        /// Width field.
        imms: u8,
    },
}

impl fmt::Display for ReservedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImmediateShift(sh) => write!(f, "immediate shift selector {sh} is reserved"),
            Self::RegisterShift => f.write_str("ROR shift is reserved for ADD/SUB"),
            Self::MoveWideShift(hw) => write!(f, "MOVZ with hw={hw} is not implemented"),
            Self::ConditionCode(cond) => {
                write!(f, "condition code {cond:#x} needs carry/overflow flags")
            }
            Self::IndexedAddressing(mode) => {
                write!(f, "indexed addressing mode {mode:#04b} runs as unscaled offset")
            }
            Self::BitfieldMove { immr, imms } => {
                write!(f, "bitfield move immr={immr} imms={imms} is not LSL/LSR")
            }
        }
    }
}

/// Non-fatal condition observed while executing an instruction.
///
/// Simulation continues after a diagnostic; the instruction's effects may be
/// replaced by a safe default (see [`ReservedField`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Diagnostic {
    /// Access that is not naturally aligned for its width.
    #[error("unaligned {width} {kind} at 0x{addr:016X}")]
    UnalignedAccess {
        /// Effective address.
        addr: u64,
        /// Access width.
        width: AccessWidth,
        /// Access direction.
        kind: AccessKind,
    },
    /// Instruction with a reserved or unimplemented field value.
    #[error("instruction 0x{word:08X} at 0x{pc:016X}: {field}")]
    ReservedEncoding {
        /// Raw instruction word.
        word: u32,
        /// Address of the instruction.
        pc: u64,
        /// Offending field.
        field: ReservedField,
    },
    /// Classification miss handled under the halting policy.
    #[error("unsupported instruction 0x{word:08X} at 0x{pc:016X}")]
    UnsupportedInstruction {
        /// Raw instruction word.
        word: u32,
        /// Address of the instruction.
        pc: u64,
    },
}

impl Diagnostic {
    /// Returns the aggregation class for this diagnostic.
    #[must_use]
    pub const fn class(self) -> DiagnosticClass {
        match self {
            Self::UnalignedAccess { .. } => DiagnosticClass::Memory,
            Self::ReservedEncoding { .. } => DiagnosticClass::Decode,
            Self::UnsupportedInstruction { .. } => DiagnosticClass::Dispatch,
        }
    }
}

/// Fatal error raised by a simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SimError {
    /// The fetched word matched no dispatch table entry.
    #[error("unsupported instruction 0x{word:08X} at 0x{pc:016X}")]
    UnsupportedInstruction {
        /// Raw instruction word.
        word: u32,
        /// Address of the instruction.
        pc: u64,
    },
}
