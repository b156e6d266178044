use std::fmt;

/// Number of architecturally visible general-purpose registers (`X0..X31`).
pub const REGISTER_COUNT: usize = 32;
/// Index of the register that always reads as zero after a cycle commits.
pub const ZERO_REGISTER_INDEX: u8 = 31;

/// Five-bit general-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Register(u8);

impl Register {
    /// The zero register `XZR` (`X31`).
    pub const XZR: Self = Self(ZERO_REGISTER_INDEX);

    /// Builds a register from the low five bits of an instruction field.
    #[must_use]
    pub const fn from_u5(bits: u32) -> Self {
        Self((bits & 0x1F) as u8)
    }

    /// Builds a register from an index, rejecting values above 31.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < REGISTER_COUNT as u8 {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Returns the array index for this register (`0..=31`).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for `X31`.
    #[must_use]
    pub const fn is_zero_register(self) -> bool {
        self.0 == ZERO_REGISTER_INDEX
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero_register() {
            f.write_str("XZR")
        } else {
            write!(f, "X{}", self.0)
        }
    }
}

/// Full architectural state of the simulated core.
///
/// The simulator keeps one committed copy and derives a scratch copy per
/// cycle; handlers read the committed copy and write the scratch copy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    regs: [u64; REGISTER_COUNT],
    pc: u64,
    flag_zero: bool,
    flag_negative: bool,
    running: bool,
}

impl Default for ArchitecturalState {
    fn default() -> Self {
        Self::with_entry(0)
    }
}

impl ArchitecturalState {
    /// Returns a running state with cleared registers and `pc = entry`.
    #[must_use]
    pub const fn with_entry(entry: u64) -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
            pc: entry,
            flag_zero: false,
            flag_negative: false,
            running: true,
        }
    }

    /// Returns the value of `reg`.
    #[must_use]
    pub const fn reg(&self, reg: Register) -> u64 {
        self.regs[reg.index()]
    }

    /// Writes `value` into `reg`.
    ///
    /// Writes to `X31` land in the register file and are discarded when the
    /// cycle commits.
    pub const fn set_reg(&mut self, reg: Register, value: u64) {
        self.regs[reg.index()] = value;
    }

    /// Returns the full register file.
    #[must_use]
    pub const fn regs(&self) -> &[u64; REGISTER_COUNT] {
        &self.regs
    }

    /// Returns the program counter.
    #[must_use]
    pub const fn pc(&self) -> u64 {
        self.pc
    }

    /// Sets the program counter.
    pub const fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    /// Zero flag.
    #[must_use]
    pub const fn flag_zero(&self) -> bool {
        self.flag_zero
    }

    /// Negative flag.
    #[must_use]
    pub const fn flag_negative(&self) -> bool {
        self.flag_negative
    }

    /// Sets both condition flags at once.
    pub const fn set_flags(&mut self, zero: bool, negative: bool) {
        self.flag_zero = zero;
        self.flag_negative = negative;
    }

    /// Returns `true` until a halt has committed.
    #[must_use]
    pub const fn running(&self) -> bool {
        self.running
    }

    /// Sets the run flag.
    pub const fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Derives the scratch copy for the next cycle: identical except `pc + 4`.
    #[must_use]
    pub fn successor(&self) -> Self {
        let mut next = self.clone();
        next.pc = self.pc.wrapping_add(4);
        next
    }

    /// Forces `X31` back to zero.
    pub const fn clear_zero_register(&mut self) {
        self.regs[ZERO_REGISTER_INDEX as usize] = 0;
    }
}
