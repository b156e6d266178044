//! Opcode patterns and the prefix-keyed dispatch table.
//!
//! Every supported instruction is identified by its top `width` bits. The
//! classifier probes the distinct widths longest first, so a longer pattern
//! always shadows a shorter one that shares its leading bits.

use std::collections::HashMap;

/// Supported instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Hlt,
    B,
    BCond,
    Br,
    Cbz,
    Cbnz,
    AddImm,
    AddsImm,
    SubImm,
    SubsImm,
    AddReg,
    AddsReg,
    SubReg,
    SubsReg,
    And,
    Ands,
    Eor,
    Orr,
    Movz,
    ShiftImm,
    Stur,
    Sturb,
    Sturh,
    Ldur,
    Ldurb,
    Ldurh,
    Mul,
}

/// Operand layout families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum InstructionFormat {
    Exception,
    UnconditionalBranch,
    RegisterBranch,
    ConditionalBranch,
    CompareBranch,
    AddSubImmediate,
    AddSubRegister,
    LogicalRegister,
    MoveWide,
    Bitfield,
    LoadStore,
    Multiply,
}

impl Opcode {
    /// Base assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Hlt => "HLT",
            Self::B => "B",
            Self::BCond => "B.cond",
            Self::Br => "BR",
            Self::Cbz => "CBZ",
            Self::Cbnz => "CBNZ",
            Self::AddImm | Self::AddReg => "ADD",
            Self::AddsImm | Self::AddsReg => "ADDS",
            Self::SubImm | Self::SubReg => "SUB",
            Self::SubsImm | Self::SubsReg => "SUBS",
            Self::And => "AND",
            Self::Ands => "ANDS",
            Self::Eor => "EOR",
            Self::Orr => "ORR",
            Self::Movz => "MOVZ",
            Self::ShiftImm => "UBFM",
            Self::Stur => "STUR",
            Self::Sturb => "STURB",
            Self::Sturh => "STURH",
            Self::Ldur => "LDUR",
            Self::Ldurb => "LDURB",
            Self::Ldurh => "LDURH",
            Self::Mul => "MADD",
        }
    }

    /// Operand layout used by this opcode.
    #[must_use]
    pub const fn format(self) -> InstructionFormat {
        match self {
            Self::Hlt => InstructionFormat::Exception,
            Self::B => InstructionFormat::UnconditionalBranch,
            Self::Br => InstructionFormat::RegisterBranch,
            Self::BCond => InstructionFormat::ConditionalBranch,
            Self::Cbz | Self::Cbnz => InstructionFormat::CompareBranch,
            Self::AddImm | Self::AddsImm | Self::SubImm | Self::SubsImm => {
                InstructionFormat::AddSubImmediate
            }
            Self::AddReg | Self::AddsReg | Self::SubReg | Self::SubsReg => {
                InstructionFormat::AddSubRegister
            }
            Self::And | Self::Ands | Self::Eor | Self::Orr => InstructionFormat::LogicalRegister,
            Self::Movz => InstructionFormat::MoveWide,
            Self::ShiftImm => InstructionFormat::Bitfield,
            Self::Stur | Self::Sturb | Self::Sturh | Self::Ldur | Self::Ldurb | Self::Ldurh => {
                InstructionFormat::LoadStore
            }
            Self::Mul => InstructionFormat::Multiply,
        }
    }
}

/// Prefix widths probed by the default table, longest first.
pub const PROBE_WIDTHS: [u8; 5] = [22, 11, 9, 8, 6];

/// Canonical `(pattern, width, opcode)` entries.
///
/// `pattern` holds the identifying bits in place with every operand bit
/// cleared, so `prefix(pattern, width)` is the dispatch key.
pub const OPCODE_PATTERN_TABLE: &[(u32, u8, Opcode)] = &[
    (0xD440_0000, 11, Opcode::Hlt),
    (0x1400_0000, 6, Opcode::B),
    (0x5400_0000, 8, Opcode::BCond),
    (0xD61F_0000, 22, Opcode::Br),
    (0xB400_0000, 8, Opcode::Cbz),
    (0xB500_0000, 8, Opcode::Cbnz),
    (0x9100_0000, 8, Opcode::AddImm),
    (0xB100_0000, 8, Opcode::AddsImm),
    (0xD100_0000, 8, Opcode::SubImm),
    (0xF100_0000, 8, Opcode::SubsImm),
    (0x8B00_0000, 8, Opcode::AddReg),
    (0xAB00_0000, 8, Opcode::AddsReg),
    (0xCB00_0000, 8, Opcode::SubReg),
    (0xEB00_0000, 8, Opcode::SubsReg),
    (0x8A00_0000, 8, Opcode::And),
    (0xEA00_0000, 8, Opcode::Ands),
    (0xCA00_0000, 8, Opcode::Eor),
    (0xAA00_0000, 8, Opcode::Orr),
    (0xD280_0000, 9, Opcode::Movz),
    (0xD340_0000, 9, Opcode::ShiftImm),
    (0xF800_0000, 11, Opcode::Stur),
    (0x3800_0000, 11, Opcode::Sturb),
    (0x7800_0000, 11, Opcode::Sturh),
    (0xF840_0000, 11, Opcode::Ldur),
    (0x3840_0000, 11, Opcode::Ldurb),
    (0x7840_0000, 11, Opcode::Ldurh),
    (0x9B00_0000, 11, Opcode::Mul),
];

/// Returns the top `width` bits of `word` (`1..=32`).
#[must_use]
pub const fn prefix(word: u32, width: u8) -> u32 {
    if width >= 32 {
        word
    } else {
        word >> (32 - width as u32)
    }
}

/// Instruction word paired with its classified opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedInstruction {
    /// Raw 32-bit word.
    pub word: u32,
    /// Classified opcode.
    pub opcode: Opcode,
}

/// Immutable mapping from `(width, prefix)` keys to opcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    entries: HashMap<(u8, u32), Opcode>,
    widths: Vec<u8>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    /// Builds the table for every supported instruction.
    #[must_use]
    pub fn new() -> Self {
        Self::from_entries(OPCODE_PATTERN_TABLE)
    }

    /// Builds a table from arbitrary `(pattern, width, opcode)` entries.
    ///
    /// When two entries share a key the first one wins. Widths outside
    /// `1..=32` are ignored.
    #[must_use]
    pub fn from_entries(table: &[(u32, u8, Opcode)]) -> Self {
        let mut entries = HashMap::with_capacity(table.len());
        let mut widths = Vec::new();
        for &(pattern, width, opcode) in table {
            if !(1..=32).contains(&width) {
                log::warn!("ignoring {opcode:?} pattern with invalid width {width}");
                continue;
            }
            let key = (width, prefix(pattern, width));
            if let Some(existing) = entries.get(&key) {
                log::warn!("{opcode:?} shares dispatch key {key:?} with {existing:?}");
                continue;
            }
            entries.insert(key, opcode);
            if !widths.contains(&width) {
                widths.push(width);
            }
        }
        widths.sort_unstable_by(|a, b| b.cmp(a));
        Self { entries, widths }
    }

    /// Returns the opcode whose pattern matches `word`, longest width first.
    #[must_use]
    pub fn classify(&self, word: u32) -> Option<Opcode> {
        self.widths
            .iter()
            .find_map(|&width| self.entries.get(&(width, prefix(word, width))).copied())
    }

    /// Classifies `word`, pairing it with the matched opcode.
    #[must_use]
    pub fn decode(&self, word: u32) -> Option<DecodedInstruction> {
        self.classify(word)
            .map(|opcode| DecodedInstruction { word, opcode })
    }

    /// Distinct probe widths, longest first.
    #[must_use]
    pub fn widths(&self) -> &[u8] {
        &self.widths
    }

    /// Number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no pattern is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
