//! Address and operand arithmetic shared by the handlers.

/// Arithmetic operation of the ADD/SUB families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
}

impl ArithOp {
    /// Applies the operation with 64-bit wraparound.
    #[must_use]
    pub const fn apply(self, lhs: u64, rhs: u64) -> u64 {
        match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
        }
    }
}

/// Bitwise operation of the logical family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// Bitwise AND.
    And,
    /// Bitwise exclusive OR.
    Eor,
    /// Bitwise inclusive OR.
    Orr,
}

impl LogicOp {
    /// Applies the operation.
    #[must_use]
    pub const fn apply(self, lhs: u64, rhs: u64) -> u64 {
        match self {
            Self::And => lhs & rhs,
            Self::Eor => lhs ^ rhs,
            Self::Orr => lhs | rhs,
        }
    }
}

/// Computes `base + offset` with 64-bit wraparound.
#[must_use]
pub const fn compute_effective_address(base: u64, offset: i64) -> u64 {
    base.wrapping_add_signed(offset)
}

/// Computes a PC-relative branch target.
#[must_use]
pub const fn compute_branch_target(pc: u64, offset: i64) -> u64 {
    pc.wrapping_add_signed(offset)
}

/// Resolves the ADD/SUB immediate operand, or `None` for a reserved shift selector.
#[must_use]
pub const fn immediate_operand(imm12: u64, shift: u8) -> Option<u64> {
    match shift {
        0 => Some(imm12),
        1 => Some(imm12 << 12),
        _ => None,
    }
}
