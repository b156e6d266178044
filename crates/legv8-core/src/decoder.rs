//! Operand field extraction for every instruction format.
//!
//! Decoders are total: they never fail and never inspect state. Reserved
//! field values are reported by the executing handler, which knows the
//! instruction's address.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::fmt;

use crate::Register;

/// Extracts `width` bits of `word` starting at bit `lsb`.
#[must_use]
pub const fn field(word: u32, lsb: u32, width: u32) -> u32 {
    (word >> lsb) & ((1 << width) - 1)
}

/// Sign-extends the low `bits` bits of `value` (`1..=64`).
#[must_use]
pub const fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Source-operand extension applied by the extended-register forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ExtendOption {
    Uxtb,
    Uxth,
    Uxtw,
    Uxtx,
    Sxtb,
    Sxth,
    Sxtw,
    Sxtx,
}

impl ExtendOption {
    /// Decodes the 3-bit `option` field.
    #[must_use]
    pub const fn from_u3(bits: u32) -> Self {
        match bits & 0b111 {
            0 => Self::Uxtb,
            1 => Self::Uxth,
            2 => Self::Uxtw,
            3 => Self::Uxtx,
            4 => Self::Sxtb,
            5 => Self::Sxth,
            6 => Self::Sxtw,
            _ => Self::Sxtx,
        }
    }

    /// Assembler spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uxtb => "UXTB",
            Self::Uxth => "UXTH",
            Self::Uxtw => "UXTW",
            Self::Uxtx => "UXTX",
            Self::Sxtb => "SXTB",
            Self::Sxth => "SXTH",
            Self::Sxtw => "SXTW",
            Self::Sxtx => "SXTX",
        }
    }
}

/// Extends `value` per `option`, then shifts it left by `shift`.
#[must_use]
pub const fn extend_register(value: u64, option: ExtendOption, shift: u32) -> u64 {
    let extended = match option {
        ExtendOption::Uxtb => value & 0xFF,
        ExtendOption::Uxth => value & 0xFFFF,
        ExtendOption::Uxtw => value & 0xFFFF_FFFF,
        ExtendOption::Uxtx | ExtendOption::Sxtx => value,
        ExtendOption::Sxtb => sign_extend(value, 8) as u64,
        ExtendOption::Sxth => sign_extend(value, 16) as u64,
        ExtendOption::Sxtw => sign_extend(value, 32) as u64,
    };
    extended.wrapping_shl(shift)
}

/// Shift applied to the second operand of shifted-register forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ShiftType {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftType {
    /// Decodes the 2-bit `shift` field.
    #[must_use]
    pub const fn from_u2(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            _ => Self::Ror,
        }
    }

    /// Applies the shift; `amount` is taken modulo 64.
    #[must_use]
    pub const fn apply(self, value: u64, amount: u32) -> u64 {
        let amount = amount % 64;
        match self {
            Self::Lsl => value << amount,
            Self::Lsr => value >> amount,
            Self::Asr => ((value as i64) >> amount) as u64,
            Self::Ror => value.rotate_right(amount),
        }
    }

    /// Assembler spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
        }
    }
}

/// Branch condition over the modelled `Z` and `N` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Condition {
    Eq,
    Ne,
    Mi,
    Pl,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
}

/// Assembler names of all sixteen condition codes, indexed by encoding.
pub const CONDITION_NAMES: [&str; 16] = [
    "EQ", "NE", "CS", "CC", "MI", "PL", "VS", "VC", "HI", "LS", "GE", "LT", "GT", "LE", "AL",
    "NV",
];

impl Condition {
    /// Decodes a 4-bit condition code; codes that need `C` or `V` yield `None`.
    ///
    /// `NV` (0xF) behaves as `AL`.
    #[must_use]
    pub const fn from_u4(bits: u32) -> Option<Self> {
        match bits & 0xF {
            0x0 => Some(Self::Eq),
            0x1 => Some(Self::Ne),
            0x4 => Some(Self::Mi),
            0x5 => Some(Self::Pl),
            0xA => Some(Self::Ge),
            0xB => Some(Self::Lt),
            0xC => Some(Self::Gt),
            0xD => Some(Self::Le),
            0xE | 0xF => Some(Self::Al),
            _ => None,
        }
    }

    /// Evaluates the condition against `Z` and `N`.
    #[must_use]
    pub const fn holds(self, zero: bool, negative: bool) -> bool {
        match self {
            Self::Eq => zero,
            Self::Ne => !zero,
            Self::Mi => negative,
            Self::Pl => !negative,
            Self::Ge => !negative,
            Self::Lt => negative,
            Self::Gt => !zero && !negative,
            Self::Le => zero || negative,
            Self::Al => true,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Mi => "MI",
            Self::Pl => "PL",
            Self::Ge => "GE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Al => "AL",
        })
    }
}

/// ADD/SUB immediate operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmediateOperands {
    /// Destination.
    pub rd: Register,
    /// First source.
    pub rn: Register,
    /// Unsigned 12-bit immediate.
    pub imm12: u64,
    /// Shift selector; 0 is unshifted, 1 is `LSL #12`, others are reserved.
    pub shift: u8,
}

/// Decodes `rd[4:0] rn[9:5] imm12[21:10] shift[23:22]`.
#[must_use]
pub const fn decode_immediate(word: u32) -> ImmediateOperands {
    ImmediateOperands {
        rd: Register::from_u5(field(word, 0, 5)),
        rn: Register::from_u5(field(word, 5, 5)),
        imm12: field(word, 10, 12) as u64,
        shift: field(word, 22, 2) as u8,
    }
}

/// Returns `true` when bit 21 selects the extended-register form of ADD/SUB.
#[must_use]
pub const fn is_extended_register_form(word: u32) -> bool {
    field(word, 21, 1) == 1
}

/// Extended-register operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedRegisterOperands {
    /// Destination.
    pub rd: Register,
    /// First source.
    pub rn: Register,
    /// Second source, before extension.
    pub rm: Register,
    /// Extension applied to `rm`.
    pub option: ExtendOption,
    /// Left shift after extension (`0..=7`).
    pub amount: u32,
}

/// Decodes `rd rn imm3[12:10] option[15:13] rm[20:16]`.
#[must_use]
pub const fn decode_extended_register(word: u32) -> ExtendedRegisterOperands {
    ExtendedRegisterOperands {
        rd: Register::from_u5(field(word, 0, 5)),
        rn: Register::from_u5(field(word, 5, 5)),
        rm: Register::from_u5(field(word, 16, 5)),
        option: ExtendOption::from_u3(field(word, 13, 3)),
        amount: field(word, 10, 3),
    }
}

/// Shifted-register operands, shared by ADD/SUB and the logical group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftedRegisterOperands {
    /// Destination.
    pub rd: Register,
    /// First source.
    pub rn: Register,
    /// Second source, before shifting.
    pub rm: Register,
    /// Shift type.
    pub shift: ShiftType,
    /// Shift amount (`0..=63`).
    pub amount: u32,
    /// Bit 21; for logical instructions it inverts the shifted operand.
    pub invert: bool,
}

/// Decodes `rd rn imm6[15:10] rm[20:16] N[21] shift[23:22]`.
#[must_use]
pub const fn decode_shifted_register(word: u32) -> ShiftedRegisterOperands {
    ShiftedRegisterOperands {
        rd: Register::from_u5(field(word, 0, 5)),
        rn: Register::from_u5(field(word, 5, 5)),
        rm: Register::from_u5(field(word, 16, 5)),
        shift: ShiftType::from_u2(field(word, 22, 2)),
        amount: field(word, 10, 6),
        invert: field(word, 21, 1) == 1,
    }
}

/// Load/store unscaled-offset operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOperands {
    /// Data register.
    pub rt: Register,
    /// Base register.
    pub rn: Register,
    /// Signed byte offset (`-256..=255`).
    pub offset: i64,
    /// Addressing-mode bits `[11:10]`; zero for the unscaled form.
    pub index_mode: u8,
}

/// Decodes `rt[4:0] rn[9:5] mode[11:10] imm9[20:12]`.
#[must_use]
pub const fn decode_memory(word: u32) -> MemoryOperands {
    MemoryOperands {
        rt: Register::from_u5(field(word, 0, 5)),
        rn: Register::from_u5(field(word, 5, 5)),
        offset: sign_extend(field(word, 12, 9) as u64, 9),
        index_mode: field(word, 10, 2) as u8,
    }
}

/// Decodes the `imm26` word offset of `B` into a byte offset.
#[must_use]
pub const fn decode_branch_offset(word: u32) -> i64 {
    sign_extend(field(word, 0, 26) as u64, 26) << 2
}

/// Decodes the target register of `BR`.
#[must_use]
pub const fn decode_branch_register(word: u32) -> Register {
    Register::from_u5(field(word, 5, 5))
}

/// Conditional and compare-and-branch operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalBranchOperands {
    /// Register tested by CBZ/CBNZ.
    pub rt: Register,
    /// Raw condition code used by B.cond (bits 3:0).
    pub cond: u8,
    /// Signed byte offset from the branch.
    pub offset: i64,
}

/// Decodes `rt|cond[4:0] imm19[23:5]`.
#[must_use]
pub const fn decode_conditional_branch(word: u32) -> ConditionalBranchOperands {
    ConditionalBranchOperands {
        rt: Register::from_u5(field(word, 0, 5)),
        cond: field(word, 0, 4) as u8,
        offset: sign_extend(field(word, 5, 19) as u64, 19) << 2,
    }
}

/// MOVZ operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveWideOperands {
    /// Destination.
    pub rd: Register,
    /// 16-bit immediate.
    pub imm16: u64,
    /// Halfword selector; only 0 is implemented.
    pub hw: u8,
}

/// Decodes `rd[4:0] imm16[20:5] hw[22:21]`.
#[must_use]
pub const fn decode_move_wide(word: u32) -> MoveWideOperands {
    MoveWideOperands {
        rd: Register::from_u5(field(word, 0, 5)),
        imm16: field(word, 5, 16) as u64,
        hw: field(word, 21, 2) as u8,
    }
}

/// Immediate shift recognised from a bitfield-move encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateShift {
    /// `LSL #amount`.
    Left(u32),
    /// `LSR #amount`.
    Right(u32),
}

/// UBFM operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldOperands {
    /// Destination.
    pub rd: Register,
    /// Source.
    pub rn: Register,
    /// Rotate amount.
    pub immr: u8,
    /// Top source bit.
    pub imms: u8,
}

impl BitfieldOperands {
    /// Interprets the encoding as an LSL or LSR alias.
    ///
    /// `imms == 63` is `LSR #immr`; `immr == (imms + 1) % 64` is
    /// `LSL #(63 - imms)`. Anything else is outside the supported subset.
    #[must_use]
    pub const fn shift(self) -> Option<ImmediateShift> {
        if self.imms == 63 {
            Some(ImmediateShift::Right(self.immr as u32))
        } else if self.immr == (self.imms + 1) % 64 {
            Some(ImmediateShift::Left(63 - self.imms as u32))
        } else {
            None
        }
    }
}

/// Decodes `rd rn imms[15:10] immr[21:16]`.
#[must_use]
pub const fn decode_bitfield(word: u32) -> BitfieldOperands {
    BitfieldOperands {
        rd: Register::from_u5(field(word, 0, 5)),
        rn: Register::from_u5(field(word, 5, 5)),
        immr: field(word, 16, 6) as u8,
        imms: field(word, 10, 6) as u8,
    }
}

/// Multiply-accumulate operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplyOperands {
    /// Destination.
    pub rd: Register,
    /// Multiplicand.
    pub rn: Register,
    /// Multiplier.
    pub rm: Register,
    /// Addend; `XZR` gives a plain `MUL`.
    pub ra: Register,
    /// Bit 15; subtracts the product from `ra` when set.
    pub subtract: bool,
}

/// Decodes `rd rn ra[14:10] o0[15] rm[20:16]`.
#[must_use]
pub const fn decode_multiply(word: u32) -> MultiplyOperands {
    MultiplyOperands {
        rd: Register::from_u5(field(word, 0, 5)),
        rn: Register::from_u5(field(word, 5, 5)),
        rm: Register::from_u5(field(word, 16, 5)),
        ra: Register::from_u5(field(word, 10, 5)),
        subtract: field(word, 15, 1) == 1,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        decode_bitfield, decode_branch_offset, decode_branch_register, decode_conditional_branch,
        decode_extended_register, decode_immediate, decode_memory, decode_move_wide,
        decode_multiply, decode_shifted_register, extend_register, field,
        is_extended_register_form, sign_extend, Condition, ExtendOption, ImmediateShift,
        ShiftType,
    };
    use crate::Register;

    fn reg(index: u32) -> Register {
        Register::from_u5(index)
    }

    #[test]
    fn field_extracts_bit_ranges() {
        assert_eq!(field(0xF000_0000, 28, 4), 0xF);
        assert_eq!(field(0x0000_03E0, 5, 5), 31);
    }

    #[rstest]
    #[case(0x1FF, 9, -1)]
    #[case(0x100, 9, -256)]
    #[case(0x0FF, 9, 255)]
    #[case(0x3FF_FFFF, 26, -1)]
    #[case(0x200_0000, 26, -(1 << 25))]
    #[case(0x7, 64, 7)]
    fn sign_extend_matches_twos_complement(
        #[case] value: u64,
        #[case] bits: u32,
        #[case] expected: i64,
    ) {
        assert_eq!(sign_extend(value, bits), expected);
    }

    #[rstest]
    #[case(ExtendOption::Uxtb, 0xFFFF_FFFF_FFFF_FF80, 0, 0x80)]
    #[case(ExtendOption::Sxtb, 0x80, 0, 0xFFFF_FFFF_FFFF_FF80)]
    #[case(ExtendOption::Uxth, 0x1_8000, 1, 0x1_0000)]
    #[case(ExtendOption::Sxth, 0x8000, 0, 0xFFFF_FFFF_FFFF_8000)]
    #[case(ExtendOption::Uxtw, 0xFFFF_FFFF_8000_0000, 0, 0x8000_0000)]
    #[case(ExtendOption::Sxtw, 0x8000_0000, 0, 0xFFFF_FFFF_8000_0000)]
    #[case(ExtendOption::Uxtx, 0x1234, 4, 0x1_2340)]
    #[case(ExtendOption::Sxtx, 0x1234, 3, 0x91A0)]
    fn extend_then_shift(
        #[case] option: ExtendOption,
        #[case] value: u64,
        #[case] shift: u32,
        #[case] expected: u64,
    ) {
        assert_eq!(extend_register(value, option, shift), expected);
    }

    #[test]
    fn shift_types_cover_rotate() {
        assert_eq!(ShiftType::Lsl.apply(1, 63), 1 << 63);
        assert_eq!(ShiftType::Lsr.apply(1 << 63, 63), 1);
        assert_eq!(ShiftType::Asr.apply(1 << 63, 63), u64::MAX);
        assert_eq!(ShiftType::Ror.apply(1, 1), 1 << 63);
    }

    #[test]
    fn condition_evaluation_truth_table() {
        assert!(Condition::Eq.holds(true, false));
        assert!(Condition::Ne.holds(false, true));
        assert!(Condition::Ge.holds(true, false));
        assert!(!Condition::Ge.holds(false, true));
        assert!(Condition::Lt.holds(false, true));
        assert!(Condition::Gt.holds(false, false));
        assert!(!Condition::Gt.holds(true, false));
        assert!(Condition::Le.holds(true, false));
        assert!(Condition::Le.holds(false, true));
        assert!(!Condition::Le.holds(false, false));
        assert!(Condition::Mi.holds(false, true));
        assert!(!Condition::Mi.holds(true, false));
        assert!(Condition::Pl.holds(true, false));
        assert!(!Condition::Pl.holds(false, true));
        for (zero, negative) in [(false, false), (false, true), (true, false)] {
            assert!(Condition::Al.holds(zero, negative));
        }
    }

    #[test]
    fn unmodelled_conditions_are_rejected() {
        for code in [0x2, 0x3, 0x6, 0x7, 0x8, 0x9] {
            assert_eq!(Condition::from_u4(code), None);
        }
        assert_eq!(Condition::from_u4(0xC), Some(Condition::Gt));
        assert_eq!(Condition::from_u4(0x4), Some(Condition::Mi));
        assert_eq!(Condition::from_u4(0x5), Some(Condition::Pl));
        assert_eq!(Condition::from_u4(0xE), Some(Condition::Al));
        assert_eq!(Condition::from_u4(0xF), Some(Condition::Al));
    }

    #[test]
    fn immediate_fields() {
        // ADD X3, X1, #10
        let ops = decode_immediate(0x9100_2823);
        assert_eq!((ops.rd, ops.rn, ops.imm12, ops.shift), (reg(3), reg(1), 10, 0));
        // ADD X0, X0, #1, LSL #12
        assert_eq!(decode_immediate(0x9140_0400).shift, 1);
    }

    #[test]
    fn register_forms_split_on_bit_21() {
        // ADD X2, X0, X1
        let word = 0x8B01_0002;
        assert!(!is_extended_register_form(word));
        let shifted = decode_shifted_register(word);
        assert_eq!((shifted.rd, shifted.rn, shifted.rm), (reg(2), reg(0), reg(1)));
        assert_eq!((shifted.shift, shifted.amount), (ShiftType::Lsl, 0));

        // ADD X2, X0, W1, SXTW #2
        let word = 0x8B21_C802;
        assert!(is_extended_register_form(word));
        let extended = decode_extended_register(word);
        assert_eq!(extended.option, ExtendOption::Sxtw);
        assert_eq!(extended.amount, 2);
        assert_eq!(extended.rm, reg(1));
    }

    #[test]
    fn logical_invert_bit() {
        // ORN X0, X1, X2, LSR #4 uses the ORR opcode with N set
        let ops = decode_shifted_register(0xAA62_1020);
        assert!(ops.invert);
        assert_eq!(ops.shift, ShiftType::Lsr);
        assert_eq!(ops.amount, 4);
    }

    #[test]
    fn memory_offset_is_signed_nine_bits() {
        // LDUR X1, [X2, #-8]
        let ops = decode_memory(0xF85F_8041);
        assert_eq!((ops.rt, ops.rn, ops.offset), (reg(1), reg(2), -8));
        // STUR X1, [X2, #255]
        assert_eq!(decode_memory(0xF80F_F041).offset, 255);
        assert_eq!(decode_memory(0xF80F_F041).index_mode, 0);
        // STR X1, [X2, #8]! (pre-index)
        assert_eq!(decode_memory(0xF800_8C41).index_mode, 0b11);
    }

    #[test]
    fn branch_offsets_scale_by_four() {
        assert_eq!(decode_branch_offset(0x1400_0003), 12);
        assert_eq!(decode_branch_offset(0x17FF_FFFF), -4);
        assert_eq!(decode_branch_register(0xD61F_03C0), reg(30));

        // B.NE -8
        let ops = decode_conditional_branch(0x54FF_FFC1);
        assert_eq!((ops.cond, ops.offset), (1, -8));
        // CBZ X5, +16
        let ops = decode_conditional_branch(0xB400_0085);
        assert_eq!((ops.rt, ops.offset), (reg(5), 16));
    }

    #[test]
    fn move_wide_fields() {
        let ops = decode_move_wide(0xD280_0021);
        assert_eq!((ops.rd, ops.imm16, ops.hw), (reg(1), 1, 0));
        assert_eq!(decode_move_wide(0xD2A0_0020).hw, 1);
    }

    #[rstest]
    // LSL X0, X1, #4 == UBFM X0, X1, #60, #59
    #[case(0xD37C_EC20, Some(ImmediateShift::Left(4)))]
    // LSR X0, X1, #4 == UBFM X0, X1, #4, #63
    #[case(0xD344_FC20, Some(ImmediateShift::Right(4)))]
    // LSL X0, X1, #0 == UBFM X0, X1, #0, #63, reads as LSR #0
    #[case(0xD340_FC20, Some(ImmediateShift::Right(0)))]
    // UBFX X0, X1, #4, #8 == UBFM X0, X1, #4, #11
    #[case(0xD344_2C20, None)]
    fn bitfield_aliases(#[case] word: u32, #[case] expected: Option<ImmediateShift>) {
        assert_eq!(decode_bitfield(word).shift(), expected);
    }

    #[test]
    fn multiply_fields() {
        // MUL X3, X1, X2 == MADD X3, X1, X2, XZR
        let ops = decode_multiply(0x9B02_7C23);
        assert_eq!((ops.rd, ops.rn, ops.rm, ops.ra), (reg(3), reg(1), reg(2), Register::XZR));
        assert!(!ops.subtract);
        // MSUB X3, X1, X2, X4
        assert!(decode_multiply(0x9B02_9023).subtract);
    }
}
